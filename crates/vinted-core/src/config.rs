use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

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
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
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

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("VINTED_ENV", "development"))?;
    let bind_addr = parse("VINTED_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("VINTED_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("VINTED_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("VINTED_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "VINTED_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }
    let db_acquire_timeout_secs = parse_u64("VINTED_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let source_base_url = or_default("VINTED_BASE_URL", "https://www.vinted.co.uk")
        .trim_end_matches('/')
        .to_string();
    let source_currency = or_default("VINTED_CURRENCY", "GBP");
    let source_seed_cookie = lookup("VINTED_COOKIE").ok().filter(|c| !c.is_empty());
    let source_session_cookie_name = or_default("VINTED_SESSION_COOKIE", "_vinted_fr_session");
    let source_user_agent = or_default("VINTED_USER_AGENT", DEFAULT_USER_AGENT);
    let source_request_timeout_secs = parse_u64("VINTED_REQUEST_TIMEOUT_SECS", "30")?;

    let fetch_max_retries = parse_u32("VINTED_FETCH_MAX_RETRIES", "1")?;
    let fetch_backoff_base_secs = parse_u64("VINTED_FETCH_BACKOFF_BASE_SECS", "1")?;
    let persist_timeout_secs = parse_u64("VINTED_PERSIST_TIMEOUT_SECS", "15")?;
    let refresh_timeout_secs = parse_u64("VINTED_REFRESH_TIMEOUT_SECS", "60")?;
    let max_concurrent_refreshes = parse_usize("VINTED_MAX_CONCURRENT_REFRESHES", "4")?;
    if max_concurrent_refreshes == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "VINTED_MAX_CONCURRENT_REFRESHES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let shutdown_grace_secs = parse_u64("VINTED_SHUTDOWN_GRACE_SECS", "5")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        source_base_url,
        source_currency,
        source_seed_cookie,
        source_session_cookie_name,
        source_user_agent,
        source_request_timeout_secs,
        fetch_max_retries,
        fetch_backoff_base_secs,
        persist_timeout_secs,
        refresh_timeout_secs,
        max_concurrent_refreshes,
        shutdown_grace_secs,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VINTED_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
