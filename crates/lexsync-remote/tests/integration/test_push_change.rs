//! Integration tests for `POST /changes`

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use lexsync_core::ports::{IRemoteEndpoint, RemoteRejection};
use lexsync_remote::{HttpRemoteEndpoint, RemoteError};

use crate::common;

#[tokio::test]
async fn test_push_sends_change_json_with_token() {
    let (server, client) = common::setup_remote_mock().await;
    let change = common::sample_change();

    Mock::given(method("POST"))
        .and(path("/changes"))
        .and(header(
            "authorization",
            format!("Bearer {}", common::TEST_TOKEN).as_str(),
        ))
        .and(body_partial_json(serde_json::json!({
            "id": change.id().to_string(),
            "type": "case_update",
            "recordId": change.record_id().to_string(),
            "payload": {"status": "adjourned"},
            "retryCount": 0,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": change.id().to_string(),
            "acceptedAt": "2026-10-19T09:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client.push_change(&change).await.expect("push failed");

    assert_eq!(receipt.change_id, *change.id());
    assert_eq!(receipt.accepted_at.to_rfc3339(), "2026-10-19T09:00:00+00:00");
}

#[tokio::test]
async fn test_push_tolerates_empty_body() {
    let (server, client) = common::setup_remote_mock().await;
    let change = common::sample_change();

    Mock::given(method("POST"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let receipt = client.push_change(&change).await.expect("push failed");
    assert_eq!(receipt.change_id, *change.id());
}

#[tokio::test]
async fn test_push_tolerates_missing_fields() {
    let (server, client) = common::setup_remote_mock().await;
    let change = common::sample_change();

    Mock::given(method("POST"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let receipt = client.push_change(&change).await.expect("push failed");
    assert_eq!(receipt.change_id, *change.id());
}

#[tokio::test]
async fn test_push_maps_error_statuses() {
    let cases = [
        (401, "unauthorized"),
        (403, "forbidden"),
        (404, "not_found"),
        (409, "conflict"),
        (429, "too_many"),
        (500, "server"),
    ];

    for (status, label) in cases {
        let (server, client) = common::setup_remote_mock().await;
        Mock::given(method("POST"))
            .and(path("/changes"))
            .respond_with(ResponseTemplate::new(status).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let err = client.push_change(&common::sample_change()).await.unwrap_err();
        let matched = match label {
            "unauthorized" => matches!(err, RemoteError::Unauthorized(_)),
            "forbidden" => matches!(err, RemoteError::Forbidden(_)),
            "not_found" => matches!(err, RemoteError::NotFound(_)),
            "conflict" => matches!(err, RemoteError::Conflict(_)),
            "too_many" => matches!(
                err,
                RemoteError::TooManyRequests { retry_after } if retry_after.as_secs() == 7
            ),
            _ => matches!(err, RemoteError::ServerError { status: 500, .. }),
        };
        assert!(matched, "HTTP {} mapped to {:?}", status, err);
    }
}

#[tokio::test]
async fn test_endpoint_reports_failure_as_error() {
    let (server, client) = common::setup_remote_mock().await;
    Mock::given(method("POST"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(409).set_body_string("record changed upstream"))
        .mount(&server)
        .await;

    let endpoint = HttpRemoteEndpoint::new(client);
    let err = endpoint
        .push_change(&common::sample_change())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("record changed upstream"));
    assert!(RemoteRejection::is_rejection(&err));
}

#[tokio::test]
async fn test_endpoint_keeps_server_errors_retryable() {
    let (server, client) = common::setup_remote_mock().await;
    Mock::given(method("POST"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let endpoint = HttpRemoteEndpoint::new(client);
    let err = endpoint
        .push_change(&common::sample_change())
        .await
        .unwrap_err();

    assert!(!RemoteRejection::is_rejection(&err));
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::ServerError { status: 503, .. })
    ));
}
