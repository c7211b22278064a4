//! Connection settings for the Grafana instance.

use std::time::Duration;

use crate::error::{InvestigatorError, Result};

/// Default Grafana URL (local development instance)
pub const DEFAULT_GRAFANA_URL: &str = "http://localhost:3000";

/// Model identifier understood by the Grafana LLM app
pub const DEFAULT_MODEL: &str = "base";

/// Default request timeout in seconds. LLM completions are slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ENV_GRAFANA_URL: &str = "GRAFANA_URL";
const ENV_GRAFANA_API_TOKEN: &str = "GRAFANA_API_TOKEN";
const ENV_GRAFANA_TIMEOUT_SECS: &str = "GRAFANA_TIMEOUT_SECS";
const ENV_GRAFANA_LLM_MODEL: &str = "GRAFANA_LLM_MODEL";

/// Configuration for the Grafana client
#[derive(Debug, Clone)]
pub struct GrafanaConfig {
    /// Base URL of the Grafana server
    pub base_url: String,
    /// Service account token, sent as a bearer token when present
    pub api_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Model identifier passed to the LLM proxy
    pub model: String,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var(ENV_GRAFANA_URL)
                .unwrap_or_else(|_| DEFAULT_GRAFANA_URL.to_string()),
            api_token: std::env::var(ENV_GRAFANA_API_TOKEN)
                .ok()
                .filter(|t| !t.is_empty()),
            timeout_secs: std::env::var(ENV_GRAFANA_TIMEOUT_SECS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            model: std::env::var(ENV_GRAFANA_LLM_MODEL)
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }
}

impl GrafanaConfig {
    /// Create a config for the given base URL with default settings otherwise.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the settings can produce a working client.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(InvestigatorError::Config(format!(
                "Grafana URL must start with http:// or https://, got '{url}'"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(InvestigatorError::Config(
                "timeout must be at least one second".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(InvestigatorError::Config("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Join an API path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
