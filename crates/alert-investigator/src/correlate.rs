//! Joining active alerts to the rules that produced them.
//!
//! Every function here is a pure lookup over the alert and the current rule
//! list. Nothing is cached: rule lists are small and replaced wholesale on
//! each refresh, so rows are simply recomputed on every render.
//!
//! Duplicate refIds inside a rule, or several threshold nodes, resolve to the
//! first match in `data` order.

use serde::Serialize;
use tracing::debug;

use crate::types::{ActiveAlert, AlertRule};

/// Placeholder for a query that cannot be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a threshold that cannot be resolved.
pub const UNKNOWN_THRESHOLD: &str = "unknown";

/// Shown for datasource-error alerts whose rule is gone.
pub const UNKNOWN_RULE: &str = "Unknown Rule";

/// Generic name Grafana gives alerts raised when a datasource query fails.
pub const DATASOURCE_ERROR_ALERT: &str = "DatasourceError";

/// refId assumed when the condition node does not name an expression.
pub const DEFAULT_EXPRESSION_REF: &str = "A";

/// Correlated view of one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRow {
    pub display_name: String,
    pub state: String,
    pub query: String,
    pub threshold: String,
    pub rule_uid: Option<String>,
}

/// Find the rule whose uid matches the alert's rule label.
#[must_use]
pub fn resolve_rule<'a>(alert: &ActiveAlert, rules: &'a [AlertRule]) -> Option<&'a AlertRule> {
    let uid = alert.rule_uid()?;
    rules.iter().find(|r| r.uid == uid)
}

/// Resolve the query text behind the rule's firing condition.
///
/// The condition node names the expression it evaluates (falling back to
/// `"A"`), and that node must carry raw query text. Both hops are required;
/// reducer and threshold nodes sit between the condition and the query.
#[must_use]
pub fn resolve_query(alert: &ActiveAlert, rules: &[AlertRule]) -> String {
    let Some(rule) = resolve_rule(alert, rules) else {
        return NOT_AVAILABLE.to_string();
    };

    let expression_ref = rule
        .node(&rule.condition)
        .and_then(|node| node.model.expression_ref())
        .unwrap_or(DEFAULT_EXPRESSION_REF);

    let query = rule
        .data
        .iter()
        .filter(|d| d.ref_id == expression_ref)
        .find_map(|d| d.model.query_expr())
        .unwrap_or(NOT_AVAILABLE);

    debug!(
        alert = alert.name(),
        rule_uid = %rule.uid,
        query,
        "Resolved alert query"
    );

    query.to_string()
}

/// Resolve the first threshold parameter configured on the rule.
#[must_use]
pub fn resolve_threshold(alert: &ActiveAlert, rules: &[AlertRule]) -> String {
    resolve_rule(alert, rules)
        .and_then(|rule| rule.data.iter().find(|d| d.model.is_threshold()))
        .and_then(|node| node.model.first_threshold_param())
        .unwrap_or_else(|| UNKNOWN_THRESHOLD.to_string())
}

/// Name to show for an alert.
///
/// Datasource failures arrive named `DatasourceError`; for those the rule
/// title is more useful.
#[must_use]
pub fn display_name(alert: &ActiveAlert, rules: &[AlertRule]) -> String {
    let name = alert.name();
    if name != DATASOURCE_ERROR_ALERT {
        return name.to_string();
    }
    resolve_rule(alert, rules)
        .map(|r| r.title.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_RULE)
        .to_string()
}

/// Correlate one alert into a display row.
#[must_use]
pub fn correlate(alert: &ActiveAlert, rules: &[AlertRule]) -> AlertRow {
    AlertRow {
        display_name: display_name(alert, rules),
        state: alert.state().to_string(),
        query: resolve_query(alert, rules),
        threshold: resolve_threshold(alert, rules),
        rule_uid: alert.rule_uid().map(str::to_string),
    }
}
