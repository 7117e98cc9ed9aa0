//! Client-credentials credential lease for Microsoft Graph
//!
//! Daemon-style replication has no user at a keyboard, so authentication
//! uses the OAuth2 client-credentials grant against the tenant's token
//! endpoint with the `.default` Graph scope.
//!
//! The lease caches the access token with its expiry and renews it before
//! any caller would go out with a token inside the safety margin. Renewal
//! is single-flight: the lease mutex is held across the token request, so
//! concurrent callers block briefly on one renewal instead of stampeding
//! the identity provider.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oauth2::{
    basic::BasicClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, Scope,
    TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use chansync_core::ports::TokenSource;

/// Default Graph scope for the client-credentials grant
const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens within this margin of expiry are treated as already expired.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Configuration for the client-credentials lease
#[derive(Debug, Clone)]
pub struct LeaseConfig {
    /// Directory (tenant) id
    pub tenant_id: String,
    /// Application (client) id from the Azure AD app registration
    pub client_id: String,
    /// Client secret for the confidential application
    pub client_secret: String,
    /// Scope to request; defaults to the Graph `.default` scope
    pub scope: String,
    /// Token endpoint override, used by tests to point at a mock server
    pub token_url: Option<String>,
}

impl LeaseConfig {
    /// Creates a config with the default Graph scope and the tenant's
    /// production token endpoint.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: DEFAULT_SCOPE.to_string(),
            token_url: None,
        }
    }

    /// Points the lease at a custom token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    fn effective_token_url(&self) -> String {
        self.token_url.clone().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            )
        })
    }
}

/// A cached bearer token and its expiry.
#[derive(Debug, Clone)]
struct CachedLease {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedLease {
    /// True while the token is still outside the safety margin.
    fn is_fresh(&self) -> bool {
        Utc::now() + ChronoDuration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

type CredentialClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Token lease backed by the OAuth2 client-credentials grant.
pub struct ClientCredentialLease {
    oauth: CredentialClient,
    http: reqwest::Client,
    scope: String,
    lease: Mutex<Option<CachedLease>>,
}

impl ClientCredentialLease {
    /// Creates a lease for the given application credentials.
    pub fn new(config: LeaseConfig) -> Result<Self> {
        let token_url =
            TokenUrl::new(config.effective_token_url()).context("Invalid token URL")?;

        // Azure AD expects client id/secret in the request body.
        let oauth = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        Ok(Self {
            oauth,
            http: reqwest::Client::new(),
            scope: config.scope,
            lease: Mutex::new(None),
        })
    }

    /// Requests a fresh token from the identity provider.
    async fn renew(&self) -> Result<CachedLease> {
        info!("Renewing Graph access token via client credentials");

        let token_result = self
            .oauth
            .exchange_client_credentials()
            .add_scope(Scope::new(self.scope.clone()))
            .request_async(&self.http)
            .await
            .context("Failed to obtain access token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + ChronoDuration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + ChronoDuration::hours(1));

        debug!(%expires_at, "Access token renewed");
        Ok(CachedLease {
            token: token_result.access_token().secret().to_string(),
            expires_at,
        })
    }
}

#[async_trait]
impl TokenSource for ClientCredentialLease {
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.lease.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.token.clone());
            }
        }

        // Mutex held across the renewal: concurrent callers wait here and
        // then take the fast path above.
        let fresh = self.renew().await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    async fn invalidate(&self, stale: &str) {
        let mut guard = self.lease.lock().await;
        if guard.as_ref().is_some_and(|cached| cached.token == stale) {
            debug!("Dropping rejected access token from lease");
            *guard = None;
        }
    }
}
