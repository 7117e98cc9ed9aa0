//! Credential lease and 401 renewal behavior

use std::sync::Arc;

use reqwest::Client;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chansync_core::ports::TokenSource;
use chansync_graph::auth::{ClientCredentialLease, LeaseConfig};
use chansync_graph::client::GraphClient;
use chansync_graph::GraphError;

use crate::common::{fast_retry, RotatingTokenSource};

#[tokio::test]
async fn lease_fetches_token_once_and_caches_it() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "issued-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lease = ClientCredentialLease::new(
        LeaseConfig::new("tenant-1", "app-1", "secret")
            .with_token_url(format!("{}/token", server.uri())),
    )
    .unwrap();

    assert_eq!(lease.access_token().await.unwrap(), "issued-token");
    // Second call stays on the cached lease: the expect(1) above verifies
    // no second round-trip happens.
    assert_eq!(lease.access_token().await.unwrap(), "issued-token");
}

#[tokio::test]
async fn expired_lease_renews_before_use() {
    let server = MockServer::start().await;

    // expires_in of 0 puts the token inside the safety margin immediately,
    // so every access renews.
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "short-lived",
            "token_type": "Bearer",
            "expires_in": 0
        })))
        .expect(2)
        .mount(&server)
        .await;

    let lease = ClientCredentialLease::new(
        LeaseConfig::new("tenant-1", "app-1", "secret")
            .with_token_url(format!("{}/token", server.uri())),
    )
    .unwrap();

    lease.access_token().await.unwrap();
    lease.access_token().await.unwrap();
}

#[tokio::test]
async fn rejected_token_is_renewed_transparently_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/resource"))
        .and(header("Authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/resource"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let source = Arc::new(RotatingTokenSource::new("stale-token", "fresh-token"));
    let client = GraphClient::with_base_url(Arc::clone(&source) as Arc<dyn TokenSource>, server.uri())
        .with_retry_policy(fast_retry());

    let url = client.endpoint("/resource");
    let response = client
        .send_with_retry("resource", |http: &Client| http.get(&url))
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(source.renewals(), 1);
}

#[tokio::test]
async fn persistent_401_surfaces_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/resource"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let source = Arc::new(RotatingTokenSource::new("stale-token", "still-bad"));
    let client = GraphClient::with_base_url(Arc::clone(&source) as Arc<dyn TokenSource>, server.uri())
        .with_retry_policy(fast_retry());

    let url = client.endpoint("/resource");
    let err = client
        .send_with_retry("resource", |http: &Client| http.get(&url))
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::Unauthorized(_)));
}
