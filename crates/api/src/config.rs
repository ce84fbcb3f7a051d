//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — Postgres connection string (required to run)
/// - `KAFKA_ENABLED` — `"true"` enables the broker (default: disabled)
/// - `KAFKA_BROKERS` — comma-separated broker list
/// - `KAFKA_CLIENT_ID` — producer/consumer client id
/// - `KAFKA_GROUP_ID` — consumer group (default: `"billing-service"`)
/// - `REDIS_URL` — cache connection string (default: local Redis)
/// - `LAGO_URL` / `LAGO_API_KEY` — billing provider endpoint (required)
/// - `BILLING_PRODUCT_NAME` — sellable product name (default: `"barcode"`)
/// - `CACHE_TTL_SECS` — refresh-job entry TTL (default: 1200)
/// - `EXPIRY_JOB_INTERVAL_SECS` — termination job period (default: 60)
/// - `REFRESH_JOB_INTERVAL_SECS` — cache refresh period (default: 600)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub kafka_enabled: bool,
    pub kafka_brokers: Option<String>,
    pub kafka_client_id: String,
    pub kafka_group_id: String,
    pub redis_url: String,
    pub lago_url: Option<String>,
    pub lago_api_key: Option<String>,
    pub product_name: String,
    pub cache_ttl: Duration,
    pub expiry_job_interval: Duration,
    pub refresh_job_interval: Duration,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(
        env_var(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: env_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: env_var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            database_url: env_var("DATABASE_URL"),
            kafka_enabled: env_var("KAFKA_ENABLED").as_deref() == Some("true"),
            kafka_brokers: env_var("KAFKA_BROKERS"),
            kafka_client_id: env_var("KAFKA_CLIENT_ID")
                .unwrap_or_else(|| "billing-service".to_string()),
            kafka_group_id: env_var("KAFKA_GROUP_ID")
                .unwrap_or_else(|| "billing-service".to_string()),
            redis_url: env_var("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            lago_url: env_var("LAGO_URL"),
            lago_api_key: env_var("LAGO_API_KEY"),
            product_name: env_var("BILLING_PRODUCT_NAME")
                .unwrap_or_else(|| "barcode".to_string()),
            cache_ttl: env_secs("CACHE_TTL_SECS", 1200),
            expiry_job_interval: env_secs("EXPIRY_JOB_INTERVAL_SECS", 60),
            refresh_job_interval: env_secs("REFRESH_JOB_INTERVAL_SECS", 600),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            kafka_enabled: false,
            kafka_brokers: None,
            kafka_client_id: "billing-service".to_string(),
            kafka_group_id: "billing-service".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            lago_url: None,
            lago_api_key: None,
            product_name: "barcode".to_string(),
            cache_ttl: Duration::from_secs(1200),
            expiry_job_interval: Duration::from_secs(60),
            refresh_job_interval: Duration::from_secs(600),
        }
    }
}
