//! Integration tests for the health probe

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use lexsync_core::ports::IRemoteEndpoint;
use lexsync_remote::{HttpRemoteEndpoint, RemoteClient, RemoteError};

use crate::common;

#[tokio::test]
async fn test_health_ok() {
    let (server, client) = common::setup_remote_mock().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.health().await.expect("health should succeed");
}

#[tokio::test]
async fn test_health_server_error() {
    let (server, client) = common::setup_remote_mock().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.health().await.unwrap_err();
    assert!(matches!(err, RemoteError::ServerError { status: 503, .. }));
}

#[tokio::test]
async fn test_probe_unreachable_host() {
    // Port 9 (discard) on localhost is almost never listening
    let client = RemoteClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let endpoint = HttpRemoteEndpoint::new(client);

    assert!(endpoint.probe().await.is_err());
}
