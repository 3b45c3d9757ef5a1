//! Client configuration

use std::time::Duration;

use super::error::{ClientError, Result};

/// Default explorer for proof transactions
pub const DEFAULT_EXPLORER_URL: &str = "https://devnet.aztecscan.xyz/tx-effects";

/// REST client and dashboard configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Path prefix in front of every endpoint, e.g. `/api/proxy`
    pub prefix: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Delay between polls while a proof is generating
    pub poll_interval: Duration,
    /// Polls before giving up on a generating proof
    pub poll_attempts: u32,
    /// Lifetime of cached views. Zero disables caching.
    pub cache_ttl: Duration,
    /// Base URL for transaction links
    pub explorer_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            prefix: String::new(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            poll_attempts: 20,
            cache_ttl: Duration::from_secs(30),
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            base_url: std::env::var("PROTECTORIUM_API_URL").unwrap_or(defaults.base_url),
            prefix: std::env::var("PROTECTORIUM_API_PREFIX").unwrap_or(defaults.prefix),
            timeout: env_secs("PROTECTORIUM_TIMEOUT_SECS")?.unwrap_or(defaults.timeout),
            poll_interval: env_u64("PROTECTORIUM_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            poll_attempts: env_u64("PROTECTORIUM_POLL_ATTEMPTS")?
                .map(|n| to_u32("PROTECTORIUM_POLL_ATTEMPTS", n))
                .transpose()?
                .unwrap_or(defaults.poll_attempts),
            cache_ttl: env_secs("PROTECTORIUM_CACHE_TTL_SECS")?.unwrap_or(defaults.cache_ttl),
            explorer_url: std::env::var("PROTECTORIUM_EXPLORER_URL")
                .unwrap_or(defaults.explorer_url),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::Configuration(format!("{name} must be an integer, got {v:?}"))),
        Err(_) => Ok(None),
    }
}

fn to_u32(name: &str, n: u64) -> Result<u32> {
    u32::try_from(n)
        .map_err(|_| ClientError::Configuration(format!("{name} is out of range, got {n}")))
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    Ok(env_u64(name)?.map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert!(config.prefix.is_empty());
        assert_eq!(config.poll_attempts, 20);
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_base_url("http://127.0.0.1:9000")
            .with_prefix("/api/proxy")
            .with_polling(Duration::from_millis(10), 3)
            .with_cache_ttl(Duration::ZERO);
        assert_eq!(config.prefix, "/api/proxy");
        assert_eq!(config.poll_attempts, 3);
        assert!(config.cache_ttl.is_zero());
    }

    #[test]
    fn test_out_of_range_count_is_rejected() {
        assert_eq!(to_u32("PROTECTORIUM_POLL_ATTEMPTS", 50).unwrap(), 50);
        assert_eq!(to_u32("N", u64::from(u32::MAX)).unwrap(), u32::MAX);

        let err = to_u32("PROTECTORIUM_POLL_ATTEMPTS", u64::from(u32::MAX) + 1).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Configuration(msg) if msg.contains("PROTECTORIUM_POLL_ATTEMPTS")
        ));
    }
}
