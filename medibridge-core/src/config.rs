//! Centralized configuration for MediBridge.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all MediBridge components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct MedibridgeConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub import: ImportConfig,
    pub session: SessionConfig,
}

/// Remote API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the MediBridge API, without trailing slash
    pub base_url: String,
    /// Per-request timeout (None = whatever the HTTP stack does)
    pub request_timeout: Option<Duration>,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: None,
            user_agent: "medibridge/0.1.0",
        }
    }
}

/// Drug lookup behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Queries shorter than this never reach a provider
    pub min_query_chars: usize,
    /// Maximum number of records returned per lookup
    pub max_results: usize,
    /// Quiet period before a scheduled lookup runs
    pub debounce_delay: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_chars: 2,
            max_results: 10,
            debounce_delay: Duration::from_millis(300),
        }
    }
}

/// Delimited-text drug import settings.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Category assigned when a row has no `type` value
    pub default_category: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_category: "allopathy".to_string(),
        }
    }
}

/// Where the session file lives.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".medibridge").join("session.json"),
        }
    }
}

/// Errors raised by [`MedibridgeConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("max_results must be greater than zero")]
    ZeroMaxResults,
}

impl MedibridgeConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MEDIBRIDGE_API_URL") {
            config.api.base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(timeout) = std::env::var("MEDIBRIDGE_REQUEST_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.api.request_timeout = Some(Duration::from_secs(seconds));
            }
        }

        if let Ok(delay) = std::env::var("MEDIBRIDGE_DEBOUNCE_MS") {
            if let Ok(millis) = delay.parse::<u64>() {
                config.search.debounce_delay = Duration::from_millis(millis);
            }
        }

        if let Ok(max_results) = std::env::var("MEDIBRIDGE_MAX_RESULTS") {
            if let Ok(count) = max_results.parse::<usize>() {
                config.search.max_results = count;
            }
        }

        if let Ok(path) = std::env::var("MEDIBRIDGE_SESSION_FILE") {
            config.session.path = PathBuf::from(path);
        }

        config
    }

    /// Checks settings that would otherwise fail later at request time.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidBaseUrl` - If the API base URL does not parse
    /// - `ConfigError::ZeroMaxResults` - If lookups could never return anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.api.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.api.base_url.clone(),
            reason: e.to_string(),
        })?;

        if self.search.max_results == 0 {
            return Err(ConfigError::ZeroMaxResults);
        }

        Ok(())
    }

    /// Creates a configuration pointing at a local test server.
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                request_timeout: Some(Duration::from_secs(5)),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
