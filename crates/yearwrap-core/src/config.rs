use crate::app_config::{AppConfig, Environment, QueryStrategy};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing is decoupled from the process environment so tests can drive
/// it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let gateway_url = require("YEARWRAP_GATEWAY_URL")?;
    let gateway_username = require("YEARWRAP_GATEWAY_USERNAME")?;
    let gateway_password = require("YEARWRAP_GATEWAY_PASSWORD")?;

    let env = parse_environment(&or_default("YEARWRAP_ENV", "development"));
    let bind_addr = parse_addr("YEARWRAP_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("YEARWRAP_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("YEARWRAP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("YEARWRAP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("YEARWRAP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let gateway_timeout_secs = parse_u64("YEARWRAP_GATEWAY_TIMEOUT_SECS", "30")?;
    let gateway_user_agent = or_default("YEARWRAP_GATEWAY_USER_AGENT", "yearwrap/0.1");
    let gateway_max_retries = parse_u32("YEARWRAP_GATEWAY_MAX_RETRIES", "3")?;
    let gateway_retry_backoff_ms = parse_u64("YEARWRAP_GATEWAY_RETRY_BACKOFF_MS", "1000")?;

    let query_strategy = or_default("YEARWRAP_QUERY_STRATEGY", "timeline")
        .parse::<QueryStrategy>()
        .map_err(|reason| invalid("YEARWRAP_QUERY_STRATEGY", reason))?;

    let post_cap = parse_usize("YEARWRAP_POST_CAP", "100")?;
    if post_cap == 0 {
        return Err(invalid("YEARWRAP_POST_CAP", "must be at least 1".to_string()));
    }
    let progress_grace_ms = parse_u64("YEARWRAP_PROGRESS_GRACE_MS", "2000")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        gateway_url,
        gateway_username,
        gateway_password,
        gateway_timeout_secs,
        gateway_user_agent,
        gateway_max_retries,
        gateway_retry_backoff_ms,
        query_strategy,
        post_cap,
        progress_grace_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
