use serde::{Deserialize, Serialize};

/// Wire value of [`Progress::Succeeded`].
pub const PROGRESS_DONE: i16 = 100;
/// Wire value of [`Progress::Failed`].
pub const PROGRESS_FAILED: i16 = -1;

/// State of a fetch as seen by observers.
///
/// On the wire this is a single integer: `0..=99` while running, `100` on
/// success and `-1` on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i16", into = "i16")]
pub enum Progress {
    Running(u8),
    Succeeded,
    Failed,
}

impl Progress {
    /// A running value, clamped to `0..=99` so it can never read as terminal.
    #[must_use]
    pub fn running(percent: u32) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Progress::Running(percent.min(99) as u8)
    }

    /// Map a loosely-typed percentage (as posted by external publishers).
    ///
    /// Negative values are failures, `>= 100` is success, fractions are
    /// truncated.
    #[must_use]
    pub fn from_percent(value: f64) -> Self {
        if value.is_nan() || value < 0.0 {
            Progress::Failed
        } else if value >= 100.0 {
            Progress::Succeeded
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Progress::Running(value as u8)
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Progress::Running(_))
    }

    #[must_use]
    pub fn value(self) -> i16 {
        match self {
            Progress::Running(pct) => i16::from(pct),
            Progress::Succeeded => PROGRESS_DONE,
            Progress::Failed => PROGRESS_FAILED,
        }
    }
}

impl From<i16> for Progress {
    fn from(value: i16) -> Self {
        if value < 0 {
            Progress::Failed
        } else if value >= PROGRESS_DONE {
            Progress::Succeeded
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Progress::Running(value as u8)
        }
    }
}

impl From<Progress> for i16 {
    fn from(progress: Progress) -> Self {
        progress.value()
    }
}

/// Latest progress published for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub subject: String,
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip() {
        for value in [0_i16, 1, 55, 99, 100, -1] {
            assert_eq!(Progress::from(value).value(), value);
        }
    }

    #[test]
    fn out_of_range_values_saturate() {
        assert_eq!(Progress::from(250), Progress::Succeeded);
        assert_eq!(Progress::from(-40), Progress::Failed);
        assert_eq!(Progress::running(180), Progress::Running(99));
    }

    #[test]
    fn from_percent_handles_fractions_and_sentinels() {
        assert_eq!(Progress::from_percent(30.5), Progress::Running(30));
        assert_eq!(Progress::from_percent(100.0), Progress::Succeeded);
        assert_eq!(Progress::from_percent(-1.0), Progress::Failed);
        assert_eq!(Progress::from_percent(f64::NAN), Progress::Failed);
    }

    #[test]
    fn record_serializes_progress_as_integer() {
        let record = ProgressRecord {
            subject: "jack".to_string(),
            progress: Progress::Failed,
            status: Some("User not found".to_string()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["progress"], -1);
        assert_eq!(json["status"], "User not found");

        let running = ProgressRecord {
            subject: "jack".to_string(),
            progress: Progress::Running(42),
            status: None,
        };
        let json = serde_json::to_value(&running).unwrap();
        assert_eq!(json["progress"], 42);
        assert!(json.get("status").is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(Progress::Succeeded.is_terminal());
        assert!(Progress::Failed.is_terminal());
        assert!(!Progress::Running(0).is_terminal());
    }
}
