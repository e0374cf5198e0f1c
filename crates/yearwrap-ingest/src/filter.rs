//! Stream filter selecting the posts that count towards a year's stats.

use chrono::{Datelike, NaiveDate};
use futures::{Stream, StreamExt, TryStreamExt};
use yearwrap_core::RawPost;

/// First day counted for `year` (Jan 1, 00:00 UTC).
#[must_use]
pub fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// `true` for original posts (not reposts, not replies) made during `year`,
/// judged by their UTC calendar date.
///
/// Posts without a timestamp never qualify.
#[must_use]
pub fn qualifies(post: &RawPost, year: i32) -> bool {
    !post.is_repost
        && !post.is_reply
        && post
            .posted_on()
            .is_some_and(|day| day.year() == year)
}

/// Keep qualifying posts from `posts`, stopping after `cap` of them.
///
/// The source is not polled again once `cap` posts have been accepted, so a
/// lazily-paged source stops fetching. Errors from the source pass through
/// unchanged and end the accepted prefix.
pub fn filter_posts<S, E>(posts: S, year: i32, cap: usize) -> impl Stream<Item = Result<RawPost, E>>
where
    S: Stream<Item = Result<RawPost, E>>,
{
    posts
        .try_filter(move |post| std::future::ready(qualifies(post, year)))
        .take(cap)
}
