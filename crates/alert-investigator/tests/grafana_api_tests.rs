//! Integration tests for the Grafana client against a mock server.

use alert_investigator::grafana::{ALERTS_PATH, CHAT_COMPLETIONS_PATH, RULES_PATH};
use alert_investigator::{
    AlertSource, ChatMessage, CompletionProvider, GrafanaClient, GrafanaConfig, InvestigatorError,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GrafanaClient {
    GrafanaClient::new(
        GrafanaConfig::new(server.uri())
            .with_token("glsa_test")
            .with_timeout_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_alerts_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALERTS_PATH))
        .and(header("authorization", "Bearer glsa_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "labels": {"alertname": "HighCPU", "__alert_rule_uid__": "cpu"},
                "annotations": {"summary": "CPU hot"},
                "status": {"state": "active", "silencedBy": [], "inhibitedBy": []},
                "receivers": [{"name": "grafana-default-email"}],
                "startsAt": "2024-05-01T10:00:00.000Z",
                "endsAt": "2024-05-01T10:04:00.000Z",
                "updatedAt": "2024-05-01T10:00:00.000Z",
                "fingerprint": "1a2b",
                "generatorURL": "http://localhost:3000/alerting/grafana/cpu/view"
            },
            {
                "labels": {"alertname": "Silenced"},
                "annotations": {},
                "status": {"state": "suppressed", "silencedBy": ["s1"], "inhibitedBy": []}
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = client_for(&server).fetch_alerts().await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].name(), "HighCPU");
    assert!(alerts[0].is_active());
    assert!(!alerts[1].is_active());
}

#[tokio::test]
async fn test_fetch_rules() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "uid": "cpu",
                "title": "CPU usage high",
                "condition": "B",
                "folderUID": "infra",
                "ruleGroup": "nodes",
                "data": [
                    {"refId": "A", "datasourceUid": "prom", "model": {"expr": "rate(cpu[5m])"}},
                    {"refId": "B", "datasourceUid": "__expr__",
                     "model": {"type": "threshold", "expression": "A",
                               "conditions": [{"evaluator": {"params": [85], "type": "gt"}}]}}
                ]
            }
        ])))
        .mount(&server)
        .await;

    let rules = client_for(&server).fetch_rules().await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].uid, "cpu");
    assert_eq!(rules[0].rule_group.as_deref(), Some("nodes"));
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("permissions denied"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_rules().await.unwrap_err();
    match err {
        InvestigatorError::Status { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "permissions denied");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_completion_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .and(body_json(json!({
            "model": "base",
            "messages": [
                {"role": "system", "content": "You are a senior SRE."},
                {"role": "user", "content": "prompt text"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let messages = [
        ChatMessage::system("You are a senior SRE."),
        ChatMessage::user("prompt text"),
    ];
    let body = client_for(&server).complete(&messages).await.unwrap();
    assert_eq!(body["choices"][0]["message"]["content"], "{}");
}
