//! Terminal rendering for alert rows and investigation results.

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::correlate::AlertRow;
use crate::investigate::pair_rows;
use crate::types::{Classification, InvestigationResult, Severity};

/// Shown instead of an empty table.
pub const NO_ACTIVE_ALERTS: &str = "No active alerts";

/// Table of correlated alerts, one row per alert, numbered for `investigate`.
pub fn alert_table(rows: &[AlertRow], loading_index: Option<usize>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Alert Name").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Query").fg(Color::Cyan),
        Cell::new("Threshold").fg(Color::Cyan),
        Cell::new("Action").fg(Color::Cyan),
    ]);

    for (idx, row) in rows.iter().enumerate() {
        let action = if loading_index == Some(idx) {
            Cell::new("Investigating...").fg(Color::Yellow)
        } else {
            Cell::new("Investigate")
        };

        table.add_row(vec![
            Cell::new(idx),
            Cell::new(&row.display_name),
            Cell::new(&row.state).fg(Color::Red),
            Cell::new(&row.query),
            Cell::new(&row.threshold),
            action,
        ]);
    }

    table
}

/// Two-column pairing of root causes and remediation steps.
pub fn classification_table(classification: &Classification) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Root Causes").fg(Color::Cyan),
        Cell::new("Remediation").fg(Color::Cyan),
    ]);

    for (cause, fix) in pair_rows(classification) {
        table.add_row(vec![Cell::new(cause), Cell::new(fix)]);
    }

    table
}

/// Category line, red for critical and yellow otherwise.
pub fn category_line(classification: &Classification) -> String {
    let label = format!("Category: {}", classification.category).bold();
    match classification.severity() {
        Severity::Critical => label.red().to_string(),
        Severity::Warning => label.yellow().to_string(),
    }
}

/// Full text rendering of an investigation result.
pub fn render_result(title: &str, result: &InvestigationResult) -> String {
    let mut out = format!("{}\n", format!("AI Classification: {title}").cyan().bold());
    match result {
        InvestigationResult::Failed { error } => {
            out.push_str(&error.red().to_string());
        }
        InvestigationResult::Classified(classification) => {
            out.push_str(&category_line(classification));
            out.push('\n');
            out.push_str(&classification_table(classification).to_string());
        }
    }
    out
}

/// Alert table, or the empty-state message.
pub fn render_alerts(rows: &[AlertRow], loading_index: Option<usize>) -> String {
    if rows.is_empty() {
        NO_ACTIVE_ALERTS.dimmed().to_string()
    } else {
        alert_table(rows, loading_index).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> AlertRow {
        AlertRow {
            display_name: name.to_string(),
            state: "active".to_string(),
            query: "up == 0".to_string(),
            threshold: "1".to_string(),
            rule_uid: None,
        }
    }

    #[test]
    fn test_empty_alerts_message() {
        colored::control::set_override(false);
        assert_eq!(render_alerts(&[], None), NO_ACTIVE_ALERTS);
    }

    #[test]
    fn test_alert_table_has_row_per_alert() {
        let table = alert_table(&[row("a"), row("b")], Some(1));
        assert_eq!(table.row_iter().count(), 2);
        let text = table.to_string();
        assert!(text.contains("Investigating..."));
        assert!(text.contains("up == 0"));
    }

    #[test]
    fn test_classification_table_pads_rows() {
        let c = Classification {
            category: "Critical".to_string(),
            root_cause: vec!["one".into(), "two".into(), "three".into()],
            remediation: vec!["fix".into()],
        };
        let table = classification_table(&c);
        assert_eq!(table.row_iter().count(), 3);
        assert!(!table.to_string().contains("undefined"));
    }

    #[test]
    fn test_render_error_result() {
        colored::control::set_override(false);
        let text = render_result("HighCPU", &InvestigationResult::failed("boom"));
        assert!(text.contains("Failed to get AI response: boom"));
    }
}
