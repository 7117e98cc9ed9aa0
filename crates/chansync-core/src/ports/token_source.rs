//! Token source port
//!
//! The replication core never acquires credentials itself; it consumes a
//! currently-valid bearer token from whatever lease implementation is wired
//! in. The Graph adapter provides a client-credentials lease; tests provide
//! static or counting sources.

use async_trait::async_trait;

/// Supplies a currently-valid bearer token for outbound requests.
///
/// Implementations must refresh transparently before expiry so that no
/// remote call ever executes with an expired token. `invalidate` is called
/// by the request gate after a 401 so the next `access_token` call performs
/// a forced renewal; implementations must ignore it when `stale` is no
/// longer the current token (another caller already renewed).
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a bearer token valid for at least the safety margin.
    async fn access_token(&self) -> anyhow::Result<String>;

    /// Marks `stale` as rejected by the server.
    async fn invalidate(&self, stale: &str);
}

/// Fixed-token source for tests and mock servers.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> anyhow::Result<String> {
        Ok(self.token.clone())
    }

    async fn invalidate(&self, _stale: &str) {}
}
