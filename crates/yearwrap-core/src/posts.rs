use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A post as delivered by the provider.
///
/// Field names follow the provider's camelCase JSON. Counts that are missing
/// or `null` are read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPost {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub likes: u64,
    #[serde(default, rename = "retweets", deserialize_with = "zero_if_null")]
    pub reposts: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub replies: u64,
    #[serde(default, rename = "isRetweet")]
    pub is_repost: bool,
    #[serde(default)]
    pub is_reply: bool,
}

impl RawPost {
    /// Post time in UTC, or `None` when the provider sent no usable timestamp.
    #[must_use]
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// UTC calendar day the post was made on.
    #[must_use]
    pub fn posted_on(&self) -> Option<NaiveDate> {
        self.posted_at().map(|at| at.date_naive())
    }

    /// Public URL of the post under `subject`'s profile.
    #[must_use]
    pub fn permalink(&self, subject: &str) -> String {
        format!("https://x.com/{subject}/status/{}", self.id)
    }
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_provider_post() {
        let json = r#"{
            "id": "1740000000000000000",
            "text": "new year, new posts",
            "timestamp": 1704067200,
            "likes": 12,
            "retweets": 3,
            "replies": 1,
            "isRetweet": false,
            "isReply": false,
            "permanentUrl": "https://x.com/someone/status/1740000000000000000"
        }"#;
        let post: RawPost = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, "1740000000000000000");
        assert_eq!(post.likes, 12);
        assert_eq!(post.reposts, 3);
        assert_eq!(post.replies, 1);
        assert_eq!(
            post.posted_on(),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
    }

    #[test]
    fn missing_and_null_fields_default() {
        let json = r#"{ "id": "7", "likes": null, "isReply": true }"#;
        let post: RawPost = serde_json::from_str(json).unwrap();
        assert_eq!(post.likes, 0);
        assert_eq!(post.reposts, 0);
        assert!(post.text.is_none());
        assert!(post.timestamp.is_none());
        assert!(post.posted_at().is_none());
        assert!(post.is_reply);
        assert!(!post.is_repost);
    }

    #[test]
    fn permalink_uses_subject_and_id() {
        let post: RawPost = serde_json::from_str(r#"{ "id": "42" }"#).unwrap();
        assert_eq!(post.permalink("jack"), "https://x.com/jack/status/42");
    }
}
