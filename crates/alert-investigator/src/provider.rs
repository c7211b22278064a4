//! Backend traits and chat message types.
//!
//! [`AlertSource`] and [`CompletionProvider`] are the two places the crate
//! reaches the network. [`crate::GrafanaClient`] implements both.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::{ActiveAlert, AlertRule};

/// Role of a message in a chat completion exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System message (sets context/behavior)
    System,
    /// User message (input)
    User,
    /// Assistant message (AI response)
    Assistant,
}

/// A message sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Body of a chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

/// Source of alert and rule snapshots.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Fetch every alert Alertmanager currently knows about.
    async fn fetch_alerts(&self) -> Result<Vec<ActiveAlert>>;

    /// Fetch all provisioned alert rules.
    async fn fetch_rules(&self) -> Result<Vec<AlertRule>>;
}

/// Chat completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send the messages and return the raw response body.
    ///
    /// The body is returned untyped because `choices[0].message.content`
    /// may be a string or an already-structured object.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Value>;
}
