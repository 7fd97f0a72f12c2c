//! `IRemoteEndpoint` implementation over [`RemoteClient`]
//!
//! Non-transient push failures are reported as [`RemoteRejection`] so the
//! engine stops retrying them.

use lexsync_core::domain::PendingChange;
use lexsync_core::ports::{IRemoteEndpoint, PushReceipt, RemoteRejection};

use crate::client::RemoteClient;

/// Remote endpoint backed by the HTTP API
pub struct HttpRemoteEndpoint {
    client: RemoteClient,
}

impl HttpRemoteEndpoint {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl IRemoteEndpoint for HttpRemoteEndpoint {
    async fn push_change(&self, change: &PendingChange) -> anyhow::Result<PushReceipt> {
        match self.client.push_change(change).await {
            Ok(receipt) => Ok(receipt),
            Err(e) if e.is_transient() => Err(e.into()),
            Err(e) => Err(RemoteRejection(e.to_string()).into()),
        }
    }

    async fn probe(&self) -> anyhow::Result<()> {
        Ok(self.client.health().await?)
    }
}
