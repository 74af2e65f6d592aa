use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const MAX_CONCURRENT_PLATFORMS_LIMIT: usize = 8;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Credentials are optional: a missing browser endpoint or collector key
/// leaves the affected platforms on synthetic data instead of failing startup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
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

    let env = parse_environment(&or_default("TRENDSCOUT_ENV", "development"))?;
    let bind_addr = parse_addr("TRENDSCOUT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("TRENDSCOUT_LOG_LEVEL", "info");
    let platforms_path = PathBuf::from(or_default(
        "TRENDSCOUT_PLATFORMS_PATH",
        "./config/platforms.yaml",
    ));

    let browser_endpoint = optional("TRENDSCOUT_BROWSER_ENDPOINT");
    let collector_api_key = optional("TRENDSCOUT_COLLECTOR_API_KEY");
    let collector_base_url = or_default(
        "TRENDSCOUT_COLLECTOR_BASE_URL",
        "https://api.brightdata.com/dca",
    );

    let max_concurrent_platforms = parse_usize("TRENDSCOUT_MAX_CONCURRENT_PLATFORMS", "3")?;
    if !(1..=MAX_CONCURRENT_PLATFORMS_LIMIT).contains(&max_concurrent_platforms) {
        return Err(invalid(
            "TRENDSCOUT_MAX_CONCURRENT_PLATFORMS",
            format!("must be between 1 and {MAX_CONCURRENT_PLATFORMS_LIMIT}"),
        ));
    }

    let request_timeout_secs = parse_u64("TRENDSCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let navigation_timeout_secs = parse_u64("TRENDSCOUT_NAVIGATION_TIMEOUT_SECS", "15")?;
    let ready_timeout_secs = parse_u64("TRENDSCOUT_READY_TIMEOUT_SECS", "10")?;
    let inter_request_delay_ms = parse_u64("TRENDSCOUT_INTER_REQUEST_DELAY_MS", "2500")?;
    let poll_interval_ms = parse_u64("TRENDSCOUT_POLL_INTERVAL_MS", "3000")?;
    let poll_max_attempts = parse_u32("TRENDSCOUT_POLL_MAX_ATTEMPTS", "20")?;
    if poll_max_attempts == 0 {
        return Err(invalid(
            "TRENDSCOUT_POLL_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let platform_timeout_secs = parse_u64("TRENDSCOUT_PLATFORM_TIMEOUT_SECS", "120")?;
    let connect_max_retries = parse_u32("TRENDSCOUT_CONNECT_MAX_RETRIES", "1")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        platforms_path,
        browser_endpoint,
        collector_api_key,
        collector_base_url,
        max_concurrent_platforms,
        request_timeout_secs,
        navigation_timeout_secs,
        ready_timeout_secs,
        inter_request_delay_ms,
        poll_interval_ms,
        poll_max_attempts,
        platform_timeout_secs,
        connect_max_retries,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TRENDSCOUT_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
