use crate::error::{ReplayError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default window after which a failed analytics ping is abandoned.
pub const DEFAULT_ANALYTICS_RETENTION_HOURS: u64 = 24;

/// Largest accepted `REPLAYQ_ANALYTICS_RETENTION_HOURS` (ten years).
pub const MAX_ANALYTICS_RETENTION_HOURS: u64 = 24 * 365 * 10;

/// Which store backend queues are opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// JSON documents under `data_dir`, durable across restarts.
    File,
    /// Process-local maps; everything is lost on exit.
    Memory,
}

/// Runtime configuration, loaded from `REPLAYQ_*` environment variables.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Directory holding one JSON file per queue.
    pub data_dir: PathBuf,
    pub store: StoreKind,
    pub bind_addr: String,
    /// Base URL analytics pings are forwarded to.
    pub analytics_upstream: Url,
    /// Base URL schedule mutations are forwarded to.
    pub api_upstream: Url,
    /// Failed analytics pings older than this are dropped instead of retried.
    pub analytics_retention_hours: u64,
    pub request_timeout_secs: u64,
}

impl ReplayConfig {
    pub fn from_env() -> Result<Self> {
        let data_dir =
            std::env::var("REPLAYQ_DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let store = match std::env::var("REPLAYQ_STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("file") | Err(_) => StoreKind::File,
            Ok(other) => {
                return Err(ReplayError::Config(format!(
                    "REPLAYQ_STORE must be 'file' or 'memory', got: {}",
                    other
                )))
            }
        };

        let analytics_upstream = parse_upstream(
            "REPLAYQ_ANALYTICS_UPSTREAM",
            "https://www.google-analytics.com",
        )?;
        let api_upstream = parse_upstream("REPLAYQ_API_UPSTREAM", "http://127.0.0.1:8080")?;

        let analytics_retention_hours: u64 = std::env::var("REPLAYQ_ANALYTICS_RETENTION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ANALYTICS_RETENTION_HOURS);
        if analytics_retention_hours > MAX_ANALYTICS_RETENTION_HOURS {
            return Err(ReplayError::Config(format!(
                "REPLAYQ_ANALYTICS_RETENTION_HOURS must be at most {}, got: {}",
                MAX_ANALYTICS_RETENTION_HOURS, analytics_retention_hours
            )));
        }

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            store,
            bind_addr: std::env::var("REPLAYQ_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:7800".to_string()),
            analytics_upstream,
            api_upstream,
            analytics_retention_hours,
            request_timeout_secs: std::env::var("REPLAYQ_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }

    /// In-memory config pointed at the given upstreams (for tests).
    pub fn for_upstreams(analytics_upstream: Url, api_upstream: Url) -> Self {
        Self {
            data_dir: PathBuf::from("/tmp/replayq-memory"),
            store: StoreKind::Memory,
            bind_addr: "127.0.0.1:0".to_string(),
            analytics_upstream,
            api_upstream,
            analytics_retention_hours: DEFAULT_ANALYTICS_RETENTION_HOURS,
            request_timeout_secs: 5,
        }
    }

    pub fn analytics_retention(&self) -> Duration {
        Duration::from_secs(self.analytics_retention_hours.saturating_mul(3600))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_upstream(var: &str, default: &str) -> Result<Url> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    let url = Url::parse(&raw)
        .map_err(|e| ReplayError::Config(format!("Invalid {}: {} ({})", var, raw, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ReplayError::Config(format!(
            "{} must be an http(s) URL, got: {}",
            var, raw
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        for var in [
            "REPLAYQ_DATA_DIR",
            "REPLAYQ_STORE",
            "REPLAYQ_BIND_ADDR",
            "REPLAYQ_ANALYTICS_UPSTREAM",
            "REPLAYQ_API_UPSTREAM",
            "REPLAYQ_ANALYTICS_RETENTION_HOURS",
            "REPLAYQ_REQUEST_TIMEOUT_SECS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ReplayConfig::from_env().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.store, StoreKind::File);
        assert_eq!(config.analytics_retention_hours, 24);
        assert_eq!(config.analytics_retention(), Duration::from_secs(86_400));
        assert_eq!(config.analytics_upstream.host_str(), Some("www.google-analytics.com"));
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("REPLAYQ_STORE", "memory");
        env::set_var("REPLAYQ_ANALYTICS_RETENTION_HOURS", "48");
        env::set_var("REPLAYQ_API_UPSTREAM", "http://schedule.internal:9000");

        let config = ReplayConfig::from_env().unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.analytics_retention_hours, 48);
        assert_eq!(config.api_upstream.port(), Some(9000));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_bad_upstream() {
        clear_env();
        env::set_var("REPLAYQ_ANALYTICS_UPSTREAM", "ftp://example.com");

        let result = ReplayConfig::from_env();
        assert!(matches!(result, Err(ReplayError::Config(_))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_unknown_store() {
        clear_env();
        env::set_var("REPLAYQ_STORE", "redis");

        assert!(ReplayConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_oversized_retention() {
        clear_env();
        env::set_var("REPLAYQ_ANALYTICS_RETENTION_HOURS", u64::MAX.to_string());

        let err = ReplayConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("REPLAYQ_ANALYTICS_RETENTION_HOURS"));

        clear_env();
    }

    #[test]
    fn test_retention_saturates() {
        let mut config = ReplayConfig::for_upstreams(
            Url::parse("http://a.test").unwrap(),
            Url::parse("http://b.test").unwrap(),
        );
        config.analytics_retention_hours = u64::MAX;
        assert_eq!(config.analytics_retention(), Duration::from_secs(u64::MAX));
    }
}
