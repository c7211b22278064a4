//! End-to-end tests: refresh, correlate, and investigate against a mock Grafana.

use std::sync::Arc;

use alert_investigator::grafana::{ALERTS_PATH, CHAT_COMPLETIONS_PATH, RULES_PATH};
use alert_investigator::{
    pair_rows, Dashboard, GrafanaClient, GrafanaConfig, InvestigationResult, InvestigatorError,
    Investigator,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Fixtures
// =============================================================================

fn alerts_body() -> Value {
    json!([
        {
            "labels": {"alertname": "HighCPU", "__alert_rule_uid__": "cpu"},
            "annotations": {"__value_string__": "[ var='B' value=97 ]", "summary": "CPU above 90%"},
            "status": {"state": "active"}
        },
        {
            "labels": {"alertname": "DatasourceError", "__alert_rule_uid__": "disk"},
            "annotations": {},
            "status": {"state": "active"}
        },
        {
            "labels": {"alertname": "Pending"},
            "annotations": {},
            "status": {"state": "unprocessed"}
        }
    ])
}

fn rules_body() -> Value {
    json!([
        {
            "uid": "cpu",
            "title": "CPU usage high",
            "condition": "C",
            "data": [
                {"refId": "A", "model": {"expr": "avg(rate(node_cpu_seconds_total[5m]))"}},
                {"refId": "B", "model": {"type": "reduce", "expression": "A"}},
                {"refId": "C", "model": {"type": "threshold", "expression": "B",
                    "conditions": [{"evaluator": {"params": [90]}}]}}
            ]
        },
        {
            "uid": "disk",
            "title": "Disk almost full",
            "condition": "B",
            "data": [
                {"refId": "A", "model": {"expr": "node_filesystem_avail_bytes"}},
                {"refId": "B", "model": {"type": "reduce", "expression": "A"}}
            ]
        }
    ])
}

fn completion(content: Value) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

async fn mock_grafana() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(alerts_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rules_body()))
        .mount(&server)
        .await;
    server
}

fn dashboard_for(server: &MockServer) -> Dashboard {
    let client = Arc::new(GrafanaClient::new(GrafanaConfig::new(server.uri())).unwrap());
    Dashboard::new(client.clone(), Investigator::new(client))
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_refresh_correlates_active_alerts() {
    let server = mock_grafana().await;
    let dashboard = dashboard_for(&server);

    assert!(dashboard.refresh().await);

    let rows = dashboard.rows().await;
    assert_eq!(rows.len(), 2);

    // C -> B is a reducer, so the two-hop lookup finds no query text.
    assert_eq!(rows[0].display_name, "HighCPU");
    assert_eq!(rows[0].query, "N/A");
    assert_eq!(rows[0].threshold, "90");

    assert_eq!(rows[1].display_name, "Disk almost full");
    assert_eq!(rows[1].query, "node_filesystem_avail_bytes");
    assert_eq!(rows[1].threshold, "unknown");
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_rows() {
    let server = mock_grafana().await;
    let dashboard = dashboard_for(&server);
    dashboard.refresh().await;

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is locked"))
        .mount(&server)
        .await;

    assert!(dashboard.refresh().await);
    let state = dashboard.snapshot().await;
    assert_eq!(state.rows().len(), 2);
    assert!(state.last_error().unwrap().contains("500"));
    assert!(!state.is_refreshing());
}

#[tokio::test]
async fn test_investigation_pairs_uneven_lists() {
    let server = mock_grafana().await;
    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .and(body_string_contains("Alert Name: HighCPU"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(
            "```json\n{\"category\": \"Critical\", \"root_cause\": [\"runaway batch job\", \"noisy neighbour\", \"missing CPU limit\"], \"remediation\": [\"throttle the batch job\"]}\n```"
        ))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .and(body_string_contains("Alert Name: DatasourceError"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "category": "Warning",
            "root_cause": ["datasource unreachable"],
            "remediation": ["check the datasource", "verify credentials"]
        }))))
        .mount(&server)
        .await;

    let dashboard = dashboard_for(&server);
    dashboard.refresh().await;

    let first = dashboard.investigate(0).await.unwrap();
    let classification = first.classification().unwrap();
    let rows = pair_rows(classification);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].1, "throttle the batch job");
    assert_eq!(rows[1].1, "");
    assert_eq!(rows[2].1, "");

    let second = dashboard.investigate(1).await.unwrap();
    assert_eq!(pair_rows(second.classification().unwrap()).len(), 2);

    let state = dashboard.snapshot().await;
    assert_eq!(state.result(), Some(&second));
    assert!(state.is_result_visible());
    assert_eq!(state.loading_index(), None);
}

#[tokio::test]
async fn test_llm_failure_becomes_error_result() {
    let server = mock_grafana().await;
    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let dashboard = dashboard_for(&server);
    dashboard.refresh().await;

    let result = dashboard.investigate(0).await.unwrap();
    assert_eq!(
        result,
        InvestigationResult::Failed {
            error: "Failed to get AI response: No content in LLM response".to_string()
        }
    );
    assert_eq!(dashboard.snapshot().await.loading_index(), None);
}

#[tokio::test]
async fn test_llm_http_error_clears_loading_marker() {
    let server = mock_grafana().await;
    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let dashboard = dashboard_for(&server);
    dashboard.refresh().await;

    let result = dashboard.investigate(1).await.unwrap();
    assert!(result.is_error());
    let state = dashboard.snapshot().await;
    assert_eq!(state.loading_index(), None);
    assert!(state.is_result_visible());
}

#[tokio::test]
async fn test_investigate_unknown_row() {
    let server = mock_grafana().await;
    let dashboard = dashboard_for(&server);
    dashboard.refresh().await;

    let err = dashboard.investigate(7).await.unwrap_err();
    assert!(matches!(err, InvestigatorError::InvalidIndex { index: 7, count: 2 }));
}
