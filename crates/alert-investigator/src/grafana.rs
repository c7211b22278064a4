//! HTTP client for the Grafana alerting API and the LLM app proxy.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GrafanaConfig;
use crate::error::{InvestigatorError, Result};
use crate::provider::{AlertSource, ChatMessage, ChatRequest, CompletionProvider};
use crate::types::{ActiveAlert, AlertRule};

/// Alertmanager v2 alert listing for Grafana-managed alerts
pub const ALERTS_PATH: &str = "/api/alertmanager/grafana/api/v2/alerts";

/// Provisioned alert rules
pub const RULES_PATH: &str = "/api/v1/provisioning/alert-rules";

/// OpenAI-compatible chat completions behind the Grafana LLM app
pub const CHAT_COMPLETIONS_PATH: &str =
    "/api/plugins/grafana-llm-app/resources/llm/v1/chat/completions";

/// Grafana client
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    config: GrafanaConfig,
    client: reqwest::Client,
}

impl GrafanaClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GrafanaConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| InvestigatorError::Config(format!("invalid API token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self { config, client })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GrafanaConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &GrafanaConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "GET");

        let response = self.client.get(&url).send().await?;
        let body = Self::check_status(path, response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_status(path: &str, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(path, status = status.as_u16(), "Grafana request failed");
            return Err(InvestigatorError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl AlertSource for GrafanaClient {
    async fn fetch_alerts(&self) -> Result<Vec<ActiveAlert>> {
        let alerts: Vec<ActiveAlert> = self.get_json(ALERTS_PATH).await?;
        debug!(count = alerts.len(), "Fetched alerts");
        Ok(alerts)
    }

    async fn fetch_rules(&self) -> Result<Vec<AlertRule>> {
        let rules: Vec<AlertRule> = self.get_json(RULES_PATH).await?;
        debug!(count = rules.len(), "Fetched alert rules");
        Ok(rules)
    }
}

#[async_trait]
impl CompletionProvider for GrafanaClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Value> {
        let url = self.config.endpoint(CHAT_COMPLETIONS_PATH);
        let request = ChatRequest {
            model: &self.config.model,
            messages,
        };

        debug!(url = %url, model = %self.config.model, messages = messages.len(), "POST chat completion");

        let response = self.client.post(&url).json(&request).send().await?;
        let body = Self::check_status(CHAT_COMPLETIONS_PATH, response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
