//! Wire types for Grafana alerting and investigation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Label carrying the alert name.
pub const ALERT_NAME_LABEL: &str = "alertname";

/// Label Grafana attaches to alerts produced by a managed rule.
pub const RULE_UID_LABEL: &str = "__alert_rule_uid__";

/// Annotation holding the pre-rendered observed value.
pub const VALUE_STRING_ANNOTATION: &str = "__value_string__";

/// Annotation holding the human summary.
pub const SUMMARY_ANNOTATION: &str = "summary";

/// Alertmanager state for a firing, unsilenced alert.
pub const ACTIVE_STATE: &str = "active";

/// Alert as returned by the Alertmanager v2 `GET /alerts` API.
///
/// Reference: <https://github.com/prometheus/alertmanager/blob/main/api/v2/openapi.yaml>
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAlert {
    /// Alert labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Alert annotations
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Alertmanager status block
    #[serde(default)]
    pub status: AlertStatus,
    /// When the alert started firing
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// When the alert will be considered resolved
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Last time Alertmanager received the alert
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Unique fingerprint for this alert
    #[serde(default)]
    pub fingerprint: String,
    /// Link back to the rule that generated the alert
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
}

/// Alertmanager status of an alert.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatus {
    /// "active", "suppressed" or "unprocessed"
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub silenced_by: Vec<String>,
    #[serde(default)]
    pub inhibited_by: Vec<String>,
}

impl ActiveAlert {
    /// Get the alert name, empty when the label is missing.
    #[must_use]
    pub fn name(&self) -> &str {
        self.labels
            .get(ALERT_NAME_LABEL)
            .map_or("", String::as_str)
    }

    /// Get the uid of the rule that produced this alert.
    #[must_use]
    pub fn rule_uid(&self) -> Option<&str> {
        non_empty(self.labels.get(RULE_UID_LABEL))
    }

    /// Get the pre-rendered observed value.
    #[must_use]
    pub fn value_string(&self) -> Option<&str> {
        non_empty(self.annotations.get(VALUE_STRING_ANNOTATION))
    }

    /// Get the summary annotation.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        non_empty(self.annotations.get(SUMMARY_ANNOTATION))
    }

    /// Get the Alertmanager state.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.status.state
    }

    /// Check if this alert is currently firing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.state == ACTIVE_STATE
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Alert rule as returned by `GET /api/v1/provisioning/alert-rules`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    /// Stable rule identifier, joined against [`RULE_UID_LABEL`]
    pub uid: String,
    /// Display name
    #[serde(default)]
    pub title: String,
    /// refId of the data node that decides whether the rule fires
    #[serde(default)]
    pub condition: String,
    /// Ordered query and expression nodes
    #[serde(default)]
    pub data: Vec<RuleQuery>,
    #[serde(default, rename = "folderUID")]
    pub folder_uid: Option<String>,
    #[serde(default)]
    pub rule_group: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl AlertRule {
    /// First data node with the given refId.
    #[must_use]
    pub fn node(&self, ref_id: &str) -> Option<&RuleQuery> {
        self.data.iter().find(|d| d.ref_id == ref_id)
    }
}

/// One entry of a rule's `data` array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleQuery {
    pub ref_id: String,
    #[serde(default)]
    pub query_type: String,
    #[serde(default)]
    pub datasource_uid: String,
    #[serde(default)]
    pub model: RuleModel,
}

/// Payload of a rule data node.
///
/// Grafana stores these as loosely typed JSON, so the variant is decided from
/// the fields present rather than from an explicit tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum RuleModel {
    /// Datasource query carrying raw expression text (PromQL, LogQL, ...)
    Query {
        expr: String,
        expression: Option<String>,
    },
    /// Server-side expression (reduce, math, resample, classic conditions)
    Expression {
        kind: Option<String>,
        expression: Option<String>,
    },
    /// Threshold evaluation over another node
    Threshold {
        expression: Option<String>,
        expr: Option<String>,
        conditions: Vec<ThresholdCondition>,
    },
    /// Anything else, kept verbatim
    Unknown(Value),
}

impl Default for RuleModel {
    fn default() -> Self {
        Self::Unknown(Value::Null)
    }
}

impl From<Value> for RuleModel {
    fn from(value: Value) -> Self {
        let classified = value.as_object().and_then(Self::classify);
        classified.unwrap_or(Self::Unknown(value))
    }
}

impl RuleModel {
    fn classify(map: &Map<String, Value>) -> Option<Self> {
        let kind = map.get("type").and_then(Value::as_str);
        let expression = map
            .get("expression")
            .and_then(Value::as_str)
            .map(str::to_string);
        let expr = map
            .get("expr")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        if kind == Some("threshold") {
            let conditions = map
                .get("conditions")
                .cloned()
                .and_then(|c| serde_json::from_value(c).ok())
                .unwrap_or_default();
            return Some(Self::Threshold {
                expression,
                expr,
                conditions,
            });
        }

        if let Some(expr) = expr {
            return Some(Self::Query { expr, expression });
        }

        if kind.is_some() || expression.is_some() {
            return Some(Self::Expression {
                kind: kind.map(str::to_string),
                expression,
            });
        }

        None
    }

    /// refId this node points at, if it names one. Any node kind may carry
    /// an `expression` reference.
    #[must_use]
    pub fn expression_ref(&self) -> Option<&str> {
        match self {
            Self::Query { expression, .. }
            | Self::Expression { expression, .. }
            | Self::Threshold { expression, .. } => {
                expression.as_deref().filter(|e| !e.is_empty())
            }
            Self::Unknown(_) => None,
        }
    }

    /// Raw query text, for any node that carries a non-empty `expr`.
    #[must_use]
    pub fn query_expr(&self) -> Option<&str> {
        match self {
            Self::Query { expr, .. } => Some(expr.as_str()),
            Self::Threshold { expr, .. } => expr.as_deref(),
            Self::Expression { .. } | Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub fn is_threshold(&self) -> bool {
        matches!(self, Self::Threshold { .. })
    }

    /// First parameter of the first condition's evaluator, rendered as text.
    #[must_use]
    pub fn first_threshold_param(&self) -> Option<String> {
        let Self::Threshold { conditions, .. } = self else {
            return None;
        };
        conditions
            .first()?
            .evaluator
            .as_ref()?
            .params
            .first()
            .and_then(format_param)
    }
}

/// Condition entry of a threshold node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThresholdCondition {
    #[serde(default)]
    pub evaluator: Option<Evaluator>,
}

/// Comparison applied by a threshold condition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Evaluator {
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Render a threshold parameter the way a dashboard would show it.
///
/// Numbers follow JavaScript's number-to-string: integral values drop the
/// fractional part (`80.0` shows as `80`), and magnitudes below `1e-6` or
/// from `1e21` up use exponent notation (`1e-7`, `1e+21`).
#[must_use]
pub fn format_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(format_number(n)),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };
    if f == 0.0 {
        return "0".to_string();
    }
    if f.abs() >= 1e21 || f.abs() < 1e-6 {
        // `{:e}` gives the shortest mantissa but omits the `+` on positive exponents.
        let formatted = format!("{f:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    f.to_string()
}

/// Alerts and rules fetched together in one refresh.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub alerts: Vec<ActiveAlert>,
    pub rules: Vec<AlertRule>,
}

/// Outcome of one investigation.
///
/// Serialized without a tag: the presence of `error` tells the two shapes apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvestigationResult {
    Failed { error: String },
    Classified(Classification),
}

impl InvestigationResult {
    /// Build the failure shape from an error message.
    #[must_use]
    pub fn failed(message: &str) -> Self {
        let message = if message.is_empty() {
            "Unknown error"
        } else {
            message
        };
        Self::Failed {
            error: format!("Failed to get AI response: {message}"),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            Self::Classified(c) => Some(c),
            Self::Failed { .. } => None,
        }
    }
}

/// Severity, root causes, and remediation proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "string_list")]
    pub root_cause: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub remediation: Vec<String>,
}

impl Classification {
    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::from_category(&self.category)
    }
}

/// Severity buckets the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    /// Anything other than an exact "Critical" is treated as a warning.
    #[must_use]
    pub fn from_category(category: &str) -> Self {
        if category == "Critical" {
            Self::Critical
        } else {
            Self::Warning
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

/// Accept whatever the model put in a text field; non-strings keep their
/// JSON rendering.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Models sometimes answer with a bare string where a list was requested.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    })
}
