//! Domain types and configuration shared by every yearwrap crate.

pub mod app_config;
pub mod config;
pub mod posts;
pub mod progress;
pub mod stats;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, QueryStrategy};
pub use config::{load_app_config, load_app_config_from_env};
pub use posts::RawPost;
pub use progress::{Progress, ProgressRecord};
pub use stats::{AggregateResult, DailyActivity, TopPost};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
