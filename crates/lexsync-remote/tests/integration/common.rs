//! Shared helpers for remote API integration tests

use std::time::Duration;

use wiremock::MockServer;

use lexsync_core::domain::{ChangeKind, PendingChange, RecordId};
use lexsync_remote::client::RemoteClient;

pub const TEST_TOKEN: &str = "test-api-token";

/// Starts a mock server and returns a client pointing at it
pub async fn setup_remote_mock() -> (MockServer, RemoteClient) {
    let server = MockServer::start().await;
    let client = RemoteClient::new(server.uri(), Duration::from_secs(2))
        .expect("build client")
        .with_token(TEST_TOKEN);
    (server, client)
}

pub fn sample_change() -> PendingChange {
    PendingChange::new(
        ChangeKind::CaseUpdate,
        RecordId::new(),
        serde_json::json!({"status": "adjourned"}),
    )
}
