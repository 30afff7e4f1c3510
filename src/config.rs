use chrono::TimeDelta;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_PURGE_CONCURRENCY, DEFAULT_PURGE_INTERVAL_SECS, DEFAULT_RETENTION_DAYS,
    DEFAULT_STORE_TIMEOUT_MS,
};
use crate::services::PurgeConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub environment: String,
    /// Admin endpoints are disabled when unset
    pub admin_secret_key: Option<String>,
    pub retention_days: i64,
    /// `retention_days` as a duration, checked against `TimeDelta`'s range
    pub retention: TimeDelta,
    pub purge_interval_secs: u64,
    pub purge_concurrency: usize,
    pub store_timeout_ms: u64,
    pub log_requests: bool,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, String> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| format!("Invalid {}: {}", key, value)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (environment, test maps)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or(&lookup, "SERVER_PORT", 8080u16)?;

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| "./data/photo_vault.db".to_string());

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let admin_secret_key = lookup("ADMIN_SECRET_KEY").filter(|key| !key.is_empty());

        let retention_days = parse_or(&lookup, "RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?;
        if retention_days < 0 {
            return Err("RETENTION_DAYS must not be negative".to_string());
        }
        let retention = TimeDelta::try_days(retention_days)
            .ok_or_else(|| format!("Invalid RETENTION_DAYS: {} is out of range", retention_days))?;

        let purge_interval_secs =
            parse_or(&lookup, "PURGE_INTERVAL_SECS", DEFAULT_PURGE_INTERVAL_SECS)?;
        if purge_interval_secs == 0 {
            return Err("PURGE_INTERVAL_SECS must be at least 1".to_string());
        }

        let purge_concurrency = parse_or(&lookup, "PURGE_CONCURRENCY", DEFAULT_PURGE_CONCURRENCY)?;
        if purge_concurrency == 0 {
            return Err("PURGE_CONCURRENCY must be at least 1".to_string());
        }

        let store_timeout_ms = parse_or(&lookup, "STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)?;
        let log_requests = parse_or(&lookup, "LOG_REQUESTS", false)?;

        Ok(Config {
            server_host,
            server_port,
            database_path,
            environment,
            admin_secret_key,
            retention_days,
            retention,
            purge_interval_secs,
            purge_concurrency,
            store_timeout_ms,
            log_requests,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn purge_config(&self) -> PurgeConfig {
        PurgeConfig {
            retention: self.retention,
            interval: Duration::from_secs(self.purge_interval_secs),
            concurrency: self.purge_concurrency,
        }
    }
}
