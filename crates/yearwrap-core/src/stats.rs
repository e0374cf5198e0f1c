use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Posting activity for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub count: u32,
    /// Relative bucket in `0..=4`.
    pub intensity: u8,
}

/// The most-liked qualifying post of the year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPost {
    pub text: String,
    pub url: String,
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
}

impl TopPost {
    /// Placeholder used when no post qualified.
    #[must_use]
    pub fn none_for(year: i32) -> Self {
        Self {
            text: format!("No posts found in {year}"),
            url: String::new(),
            likes: 0,
            reposts: 0,
            replies: 0,
        }
    }
}

/// Yearly statistics for one subject, as persisted and served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Lower-cased account handle.
    pub subject: String,
    pub year: i32,
    pub total_posts: u64,
    pub total_likes: u64,
    pub total_reposts: u64,
    pub total_replies: u64,
    pub top_post: TopPost,
    /// Chronological, one entry per elapsed day of `year`.
    pub daily_activity: Vec<DailyActivity>,
}

impl AggregateResult {
    /// `true` when the subject exists but no post qualified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_posts == 0
    }
}
