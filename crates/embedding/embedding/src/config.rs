//! Embedding configuration: trait and env-based implementation.

use anyhow::Result;
use std::env;
use std::time::Duration;

/// Where similarity scores are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMode {
    /// Cosine similarity computed in-process.
    Local,
    /// `POST /similarity` on the embedding service.
    Remote,
}

impl SimilarityMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Some(SimilarityMode::Local),
            "remote" => Some(SimilarityMode::Remote),
            _ => None,
        }
    }
}

/// Embedding service configuration interface.
pub trait EmbeddingConfig: Send + Sync {
    /// Base URL of the embedding/similarity service (no trailing slash).
    fn service_url(&self) -> &str;
    /// Per-request timeout.
    fn timeout(&self) -> Duration;
    /// Retries after the first attempt for transport failures and 5xx responses.
    fn max_retries(&self) -> u32;
    /// Backoff before the first retry; doubles on each further retry.
    fn retry_backoff(&self) -> Duration;
    fn similarity_mode(&self) -> SimilarityMode;
}

/// Embedding config loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvEmbeddingConfig {
    pub service_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub similarity_mode: SimilarityMode,
}

impl Default for EnvEmbeddingConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:4999".to_string(),
            timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 250,
            similarity_mode: SimilarityMode::Local,
        }
    }
}

impl EmbeddingConfig for EnvEmbeddingConfig {
    fn service_url(&self) -> &str {
        self.service_url.trim_end_matches('/')
    }
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    fn max_retries(&self) -> u32 {
        self.max_retries
    }
    fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
    fn similarity_mode(&self) -> SimilarityMode {
        self.similarity_mode
    }
}

impl EnvEmbeddingConfig {
    /// Load from environment variables; unset or unparsable values fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let service_url = env::var("EMBEDDING_SERVICE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.service_url);
        let timeout_secs = env::var("EMBEDDING_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout_secs);
        let max_retries = env::var("EMBEDDING_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_retries);
        let retry_backoff_ms = env::var("EMBEDDING_RETRY_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.retry_backoff_ms);
        let similarity_mode = match env::var("SIMILARITY_MODE") {
            Ok(raw) => SimilarityMode::parse(&raw).ok_or_else(|| {
                anyhow::anyhow!("SIMILARITY_MODE must be 'local' or 'remote', got '{}'", raw)
            })?,
            Err(_) => defaults.similarity_mode,
        };
        Ok(Self {
            service_url,
            timeout_secs,
            max_retries,
            retry_backoff_ms,
            similarity_mode,
        })
    }

    /// Validate config (service URL scheme, non-zero timeout).
    pub fn validate(&self) -> Result<()> {
        if !(self.service_url.starts_with("http://") || self.service_url.starts_with("https://")) {
            anyhow::bail!(
                "EMBEDDING_SERVICE_URL must start with http:// or https://, got '{}'",
                self.service_url
            );
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("EMBEDDING_TIMEOUT_SECS must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "EMBEDDING_SERVICE_URL",
            "EMBEDDING_TIMEOUT_SECS",
            "EMBEDDING_MAX_RETRIES",
            "EMBEDDING_RETRY_BACKOFF_MS",
            "SIMILARITY_MODE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = EnvEmbeddingConfig::from_env().unwrap();
        assert_eq!(config.service_url(), "http://localhost:4999");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_retries(), 2);
        assert_eq!(config.retry_backoff(), Duration::from_millis(250));
        assert_eq!(config.similarity_mode(), SimilarityMode::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_custom_values() {
        clear_env();
        env::set_var("EMBEDDING_SERVICE_URL", "http://embed.internal:8080/");
        env::set_var("EMBEDDING_TIMEOUT_SECS", "3");
        env::set_var("EMBEDDING_MAX_RETRIES", "0");
        env::set_var("EMBEDDING_RETRY_BACKOFF_MS", "10");
        env::set_var("SIMILARITY_MODE", "Remote");

        let config = EnvEmbeddingConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.service_url(), "http://embed.internal:8080");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.max_retries(), 0);
        assert_eq!(config.retry_backoff(), Duration::from_millis(10));
        assert_eq!(config.similarity_mode(), SimilarityMode::Remote);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unknown_similarity_mode() {
        clear_env();
        env::set_var("SIMILARITY_MODE", "quantum");
        let result = EnvEmbeddingConfig::from_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url_and_zero_timeout() {
        let mut config = EnvEmbeddingConfig {
            service_url: "localhost:4999".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.service_url = "https://embed.example".to_string();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
