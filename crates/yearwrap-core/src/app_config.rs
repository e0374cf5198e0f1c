use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the gateway is asked for a subject's posts.
///
/// `Timeline` pages through the subject's own timeline; `Search` runs a
/// `from:{subject} since:{date}` query in latest-first mode, which lets the
/// provider pre-filter by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStrategy {
    #[default]
    Timeline,
    Search,
}

impl std::fmt::Display for QueryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryStrategy::Timeline => write!(f, "timeline"),
            QueryStrategy::Search => write!(f, "search"),
        }
    }
}

impl FromStr for QueryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timeline" => Ok(QueryStrategy::Timeline),
            "search" => Ok(QueryStrategy::Search),
            other => Err(format!(
                "unknown query strategy \"{other}\" (expected timeline or search)"
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub gateway_url: String,
    pub gateway_username: String,
    pub gateway_password: String,
    pub gateway_timeout_secs: u64,
    pub gateway_user_agent: String,
    pub gateway_max_retries: u32,
    pub gateway_retry_backoff_ms: u64,
    pub query_strategy: QueryStrategy,
    pub post_cap: usize,
    pub progress_grace_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("gateway_url", &self.gateway_url)
            .field("gateway_username", &self.gateway_username)
            .field("gateway_password", &"[redacted]")
            .field("gateway_timeout_secs", &self.gateway_timeout_secs)
            .field("gateway_user_agent", &self.gateway_user_agent)
            .field("gateway_max_retries", &self.gateway_max_retries)
            .field("gateway_retry_backoff_ms", &self.gateway_retry_backoff_ms)
            .field("query_strategy", &self.query_strategy)
            .field("post_cap", &self.post_cap)
            .field("progress_grace_ms", &self.progress_grace_ms)
            .finish()
    }
}
