//! Shared test helpers for Graph adapter integration tests
//!
//! Provides wiremock-based mock server setup and token sources with
//! observable behavior.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wiremock::MockServer;

use chansync_core::ports::token_source::StaticTokenSource;
use chansync_core::ports::TokenSource;
use chansync_graph::client::GraphClient;
use chansync_graph::gate::RetryPolicy;

/// Retry policy with millisecond backoff so failure-path tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    }
}

/// Starts a mock server and returns a client pointed at it.
pub async fn setup_client() -> (MockServer, Arc<GraphClient>) {
    let server = MockServer::start().await;
    let client = GraphClient::with_base_url(
        Arc::new(StaticTokenSource::new("test-access-token")),
        server.uri(),
    )
    .with_retry_policy(fast_retry());
    (server, Arc::new(client))
}

/// Token source that hands out `stale` until invalidated, then `fresh`,
/// counting renewals.
pub struct RotatingTokenSource {
    stale: String,
    fresh: String,
    renewals: AtomicU64,
}

impl RotatingTokenSource {
    pub fn new(stale: impl Into<String>, fresh: impl Into<String>) -> Self {
        Self {
            stale: stale.into(),
            fresh: fresh.into(),
            renewals: AtomicU64::new(0),
        }
    }

    pub fn renewals(&self) -> u64 {
        self.renewals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for RotatingTokenSource {
    async fn access_token(&self) -> anyhow::Result<String> {
        if self.renewals.load(Ordering::SeqCst) == 0 {
            Ok(self.stale.clone())
        } else {
            Ok(self.fresh.clone())
        }
    }

    async fn invalidate(&self, stale: &str) {
        if stale == self.stale {
            self.renewals.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// JSON body for a folder drive item.
pub fn folder_item_json(id: &str, name: &str, parent_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "folder": { "childCount": 0 },
        "parentReference": { "driveId": "drive-1", "id": parent_id }
    })
}

/// JSON body for a file drive item.
pub fn file_item_json(id: &str, name: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "size": size,
        "file": {},
        "parentReference": { "driveId": "drive-1", "id": "parent-1" }
    })
}

/// JSON body for a children listing page.
pub fn children_json(items: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "value": items })
}
