//! LLM-backed alert investigation.
//!
//! [`Investigator::investigate`] is infallible by contract: transport errors,
//! empty completions, and unparseable content all come back as
//! [`InvestigationResult::Failed`] so callers only ever render a value.

use regex::Regex;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};
use tracing::{error, info};

use crate::correlate::{resolve_query, resolve_threshold, NOT_AVAILABLE};
use crate::error::{InvestigatorError, Result};
use crate::provider::{ChatMessage, CompletionProvider};
use crate::types::{ActiveAlert, AlertRule, Classification, InvestigationResult};

/// Persona for the system message.
pub const SYSTEM_PROMPT: &str = "You are a senior SRE.";

/// Fallback when the alert carries no summary annotation.
pub const NO_SUMMARY: &str = "No summary provided";

const INSTRUCTIONS: &str = "Please classify the severity (Warning or Critical), suggest root cause(s), and remediation steps. Return JSON with keys: category, root_cause[], remediation[].";

/// Markdown fence marker plus an optional language tag.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").unwrap());

/// Build the user prompt describing an alert.
#[must_use]
pub fn build_prompt(alert: &ActiveAlert, rules: &[AlertRule]) -> String {
    let mut prompt = String::from(
        "You are a senior SRE. An alert was triggered in Grafana with the following details:\n\n",
    );

    let _ = writeln!(prompt, "- Alert Name: {}", alert.name());
    let _ = writeln!(prompt, "- Status: {}", alert.state());
    let _ = writeln!(
        prompt,
        "- Value: {}",
        alert.value_string().unwrap_or(NOT_AVAILABLE)
    );
    let _ = writeln!(prompt, "- Threshold: {}", resolve_threshold(alert, rules));
    let _ = writeln!(prompt, "- PromQL Query: {}", resolve_query(alert, rules));
    let _ = writeln!(
        prompt,
        "- Description: {}",
        alert.summary().unwrap_or(NO_SUMMARY)
    );
    prompt.push('\n');
    prompt.push_str(INSTRUCTIONS);

    prompt
}

/// Remove Markdown code fence markers and surrounding whitespace.
#[must_use]
pub fn strip_code_fences(content: &str) -> String {
    CODE_FENCE.replace_all(content, "").trim().to_string()
}

/// Turn a chat completion response body into an investigation result.
///
/// `choices[0].message.content` may be a JSON string (optionally fenced) or
/// an object the proxy already decoded.
pub fn normalize_content(response: &Value) -> Result<InvestigationResult> {
    let content = response
        .pointer("/choices/0/message/content")
        .filter(|c| !is_blank(c))
        .ok_or(InvestigatorError::NoContent)?;

    match content {
        Value::String(text) => Ok(serde_json::from_str(&strip_code_fences(text))?),
        other => Ok(serde_json::from_value(other.clone())?),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Pair root causes with remediation steps, padding the shorter side with
/// empty cells.
#[must_use]
pub fn pair_rows(classification: &Classification) -> Vec<(String, String)> {
    let rows = classification
        .root_cause
        .len()
        .max(classification.remediation.len());

    (0..rows)
        .map(|i| {
            (
                classification.root_cause.get(i).cloned().unwrap_or_default(),
                classification.remediation.get(i).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

/// Sends alert prompts to a completion backend.
#[derive(Clone)]
pub struct Investigator {
    provider: Arc<dyn CompletionProvider>,
}

impl Investigator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Investigate one alert. Never fails; errors become
    /// [`InvestigationResult::Failed`].
    pub async fn investigate(&self, alert: &ActiveAlert, rules: &[AlertRule]) -> InvestigationResult {
        let prompt = build_prompt(alert, rules);
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        match self.request(&messages).await {
            Ok(result) => {
                info!(
                    alert = alert.name(),
                    model = self.provider.model(),
                    failed = result.is_error(),
                    "Investigation finished"
                );
                result
            }
            Err(e) => {
                error!(alert = alert.name(), error = %e, "LLM error");
                InvestigationResult::failed(&e.to_string())
            }
        }
    }

    async fn request(&self, messages: &[ChatMessage]) -> Result<InvestigationResult> {
        let response = self.provider.complete(messages).await?;
        normalize_content(&response)
    }
}
