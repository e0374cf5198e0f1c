//! Yearly totals, top post and the day-by-day activity histogram.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use yearwrap_core::{AggregateResult, DailyActivity, RawPost, TopPost};

use crate::filter::year_start;

/// Map a day's post count onto the `0..=4` heat-map scale relative to the
/// busiest day of the series.
///
/// Zero stays zero. When the busiest day has at most four posts the count is
/// used as-is; otherwise the range is split into four equal steps and each
/// count is rounded up to the next step.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn intensity(count: u32, max_count: u32) -> u8 {
    if count == 0 || max_count == 0 {
        return 0;
    }
    if max_count <= 4 {
        return count.min(4) as u8;
    }
    // ceil(count / (max / 4)) without floating point.
    (u64::from(count) * 4).div_ceil(u64::from(max_count)).min(4) as u8
}

/// Last day covered by the histogram: `today`, clamped into `year`.
fn histogram_end(year: i32, today: NaiveDate) -> NaiveDate {
    let dec_31 = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
    today.min(dec_31)
}

/// Build the dense, chronological histogram for `[Jan 1, min(today, Dec 31)]`.
///
/// Posts dated outside that range are ignored. If `today` is before Jan 1 of
/// `year` the histogram is empty.
#[must_use]
pub fn daily_activity(year: i32, posts: &[RawPost], today: NaiveDate) -> Vec<DailyActivity> {
    let start = year_start(year);
    let end = histogram_end(year, today);

    let mut buckets: BTreeMap<NaiveDate, u32> = start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| (day, 0))
        .collect();

    for day in posts.iter().filter_map(RawPost::posted_on) {
        if let Some(count) = buckets.get_mut(&day) {
            *count += 1;
        }
    }

    let max_count = buckets.values().copied().max().unwrap_or(0);

    buckets
        .into_iter()
        .map(|(date, count)| DailyActivity {
            date,
            count,
            intensity: intensity(count, max_count),
        })
        .collect()
}

/// First post with the highest like count, in input order.
fn top_post(subject: &str, posts: &[RawPost]) -> Option<TopPost> {
    let mut best: Option<&RawPost> = None;
    for post in posts {
        if best.is_none_or(|b| post.likes > b.likes) {
            best = Some(post);
        }
    }

    best.map(|post| TopPost {
        text: post.text.clone().unwrap_or_default(),
        url: post.permalink(subject),
        likes: post.likes,
        reposts: post.reposts,
        replies: post.replies,
    })
}

/// Counts come from the provider; totals stick at `u64::MAX` instead of
/// overflowing.
fn saturating_total(posts: &[RawPost], count: impl Fn(&RawPost) -> u64) -> u64 {
    posts.iter().map(count).fold(0, u64::saturating_add)
}

/// Aggregate already-filtered `posts` into the yearly result.
///
/// An empty slice is not an error: it yields zero totals, the placeholder
/// top post and an all-zero histogram.
#[must_use]
pub fn aggregate(subject: &str, year: i32, posts: &[RawPost], today: NaiveDate) -> AggregateResult {
    AggregateResult {
        subject: subject.to_string(),
        year,
        total_posts: posts.len() as u64,
        total_likes: saturating_total(posts, |p| p.likes),
        total_reposts: saturating_total(posts, |p| p.reposts),
        total_replies: saturating_total(posts, |p| p.replies),
        top_post: top_post(subject, posts).unwrap_or_else(|| TopPost::none_for(year)),
        daily_activity: daily_activity(year, posts, today),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn post_on(id: &str, date: NaiveDate, likes: u64) -> RawPost {
        let ts = Utc
            .from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .timestamp();
        RawPost {
            id: id.to_string(),
            text: Some(format!("text {id}")),
            timestamp: Some(ts),
            likes,
            reposts: 1,
            replies: 2,
            is_repost: false,
            is_reply: false,
        }
    }

    #[test]
    fn intensity_is_zero_when_nothing_was_posted() {
        assert_eq!(intensity(0, 0), 0);
        assert_eq!(intensity(0, 9), 0);
    }

    #[test]
    fn intensity_uses_raw_count_for_small_maxima() {
        assert_eq!(intensity(1, 4), 1);
        assert_eq!(intensity(3, 3), 3);
        assert_eq!(intensity(4, 4), 4);
    }

    #[test]
    fn intensity_scales_large_maxima_into_four_steps() {
        assert_eq!(intensity(5, 5), 4);
        assert_eq!(intensity(1, 5), 1);
        assert_eq!(intensity(1, 100), 1);
        assert_eq!(intensity(25, 100), 1);
        assert_eq!(intensity(26, 100), 2);
        assert_eq!(intensity(100, 100), 4);
    }

    #[test]
    fn intensity_is_bounded_and_monotonic() {
        for max in 0..=40u32 {
            let mut previous = 0;
            for count in 0..=max {
                let value = intensity(count, max);
                assert!(value <= 4, "intensity({count}, {max}) = {value}");
                assert!(value >= previous, "not monotonic at ({count}, {max})");
                previous = value;
            }
        }
    }

    #[test]
    fn histogram_example_jan_1_to_mar_2() {
        let mut posts: Vec<RawPost> = (0..5)
            .map(|i| post_on(&format!("a{i}"), day(2023, 1, 1), 0))
            .collect();
        posts.push(post_on("b", day(2023, 1, 2), 0));

        let histogram = daily_activity(2023, &posts, day(2023, 3, 2));
        assert_eq!(histogram.len(), 61);
        assert_eq!(histogram[0].date, day(2023, 1, 1));
        assert_eq!((histogram[0].count, histogram[0].intensity), (5, 4));
        assert_eq!((histogram[1].count, histogram[1].intensity), (1, 1));
        assert!(histogram[2..].iter().all(|d| d.count == 0 && d.intensity == 0));
        assert_eq!(histogram.last().unwrap().date, day(2023, 3, 2));
    }

    #[test]
    fn histogram_spans_whole_year_for_past_years() {
        let histogram = daily_activity(2023, &[], day(2025, 6, 1));
        assert_eq!(histogram.len(), 365);
        assert_eq!(histogram.last().unwrap().date, day(2023, 12, 31));
    }

    #[test]
    fn histogram_is_chronological_and_dense() {
        let histogram = daily_activity(2024, &[], day(2024, 2, 10));
        assert_eq!(histogram.len(), 41);
        assert!(histogram.windows(2).all(|w| w[0].date.succ_opt() == Some(w[1].date)));
    }

    #[test]
    fn posts_outside_range_are_ignored() {
        let posts = vec![
            post_on("old", day(2023, 12, 31), 0),
            post_on("future", day(2024, 5, 1), 0),
        ];
        let histogram = daily_activity(2024, &posts, day(2024, 3, 1));
        assert!(histogram.iter().all(|d| d.count == 0));
    }

    #[test]
    fn totals_are_sums() {
        let posts = vec![
            post_on("1", day(2024, 1, 3), 10),
            post_on("2", day(2024, 1, 4), 5),
        ];
        let result = aggregate("jack", 2024, &posts, day(2024, 1, 10));
        assert_eq!(result.total_posts, 2);
        assert_eq!(result.total_likes, 15);
        assert_eq!(result.total_reposts, 2);
        assert_eq!(result.total_replies, 4);
        assert_eq!(result.subject, "jack");
        assert_eq!(result.year, 2024);
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let today = day(2024, 3, 1);
        let mut posts = vec![
            post_on("a", day(2024, 1, 1), u64::MAX),
            post_on("b", day(2024, 1, 2), u64::MAX),
        ];
        posts[0].reposts = u64::MAX;
        let result = aggregate("jack", 2024, &posts, today);

        assert_eq!(result.total_likes, u64::MAX);
        assert_eq!(result.total_reposts, u64::MAX);
        assert_eq!(result.total_replies, 4);
        assert_eq!(result.top_post.likes, u64::MAX);
    }

    #[test]
    fn top_post_tie_goes_to_earlier_post() {
        let posts = vec![
            post_on("first", day(2024, 1, 3), 7),
            post_on("low", day(2024, 1, 3), 2),
            post_on("second", day(2024, 1, 4), 7),
        ];
        let result = aggregate("jack", 2024, &posts, day(2024, 1, 10));
        assert_eq!(result.top_post.text, "text first");
        assert_eq!(result.top_post.url, "https://x.com/jack/status/first");
        assert_eq!(result.top_post.likes, 7);
    }

    #[test]
    fn empty_input_yields_well_defined_result() {
        let result = aggregate("jack", 2024, &[], day(2024, 1, 5));
        assert!(result.is_empty());
        assert_eq!(result.total_likes, 0);
        assert_eq!(result.top_post, TopPost::none_for(2024));
        assert_eq!(result.daily_activity.len(), 5);
        assert!(result.daily_activity.iter().all(|d| d.intensity == 0));
    }
}
