//! RemoteNamespace single-flight behavior against a mock server

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use chansync_core::domain::ErrorCategory;
use chansync_core::report::ErrorSink;
use chansync_graph::namespace::RemoteNamespace;

use crate::common::{children_json, folder_item_json, setup_client};

#[tokio::test]
async fn contended_key_issues_exactly_one_creation() {
    let (server, client) = setup_client().await;

    // Lookup inside the single-flight slot runs once.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_json(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    // Creation runs once, no matter how many tasks race.
    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(folder_item_json("folder-9", "Docs", "root-1")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(ErrorSink::new());
    let namespace = Arc::new(RemoteNamespace::new(client, sink));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let namespace = Arc::clone(&namespace);
        handles.push(tokio::spawn(async move {
            namespace
                .resolve_or_create("drive-1", "root-1", "Docs")
                .await
        }));
    }

    for handle in handles {
        let (item, _) = handle.await.unwrap().unwrap();
        assert_eq!(item.id, "folder-9");
    }

    // Mock expectations (one GET, one POST) are verified on server drop.
}

#[tokio::test]
async fn existing_folder_is_reused_without_creation() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_json(vec![
            folder_item_json("existing-1", "Docs", "root-1"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // No POST mock mounted: any creation attempt would 404 and fail the test.

    let sink = Arc::new(ErrorSink::new());
    let namespace = RemoteNamespace::new(client, sink);

    let (item, created) = namespace
        .resolve_or_create("drive-1", "root-1", "Docs")
        .await
        .unwrap();
    assert_eq!(item.id, "existing-1");
    assert!(!created);

    // Second resolution is a pure cache hit.
    let (again, created) = namespace
        .resolve_or_create("drive-1", "root-1", "Docs")
        .await
        .unwrap();
    assert_eq!(again.id, "existing-1");
    assert!(!created);
}

#[tokio::test]
async fn lookup_matches_names_case_insensitively() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_json(vec![
            folder_item_json("existing-2", "DOCS", "root-1"),
        ])))
        .mount(&server)
        .await;

    let sink = Arc::new(ErrorSink::new());
    let namespace = RemoteNamespace::new(client, sink);

    let (item, created) = namespace
        .resolve_or_create("drive-1", "root-1", "docs")
        .await
        .unwrap();
    assert_eq!(item.id, "existing-2");
    assert!(!created);
}

#[tokio::test]
async fn creation_conflict_falls_back_to_lookup() {
    let (server, client) = setup_client().await;

    // First listing: empty (folder appears between lookup and create).
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_json(vec![])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Second listing: the folder is there.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_json(vec![
            folder_item_json("winner-1", "Docs", "root-1"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": { "code": "nameAlreadyExists" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(ErrorSink::new());
    let namespace = RemoteNamespace::new(client, Arc::clone(&sink));

    let (item, created) = namespace
        .resolve_or_create("drive-1", "root-1", "Docs")
        .await
        .unwrap();
    assert_eq!(item.id, "winner-1");
    assert!(!created);
    assert_eq!(sink.failure_count(), 0);
}

#[tokio::test]
async fn terminal_failure_is_recorded_once_and_shared() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_json(vec![])))
        .mount(&server)
        .await;

    // Non-retryable: surfaced immediately, no backoff loop.
    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/root-1/children"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": "accessDenied" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(ErrorSink::new());
    let namespace = Arc::new(RemoteNamespace::new(client, Arc::clone(&sink)));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let namespace = Arc::clone(&namespace);
        handles.push(tokio::spawn(async move {
            namespace
                .resolve_or_create("drive-1", "root-1", "Blocked")
                .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }

    // One key, one record, regardless of waiter count.
    assert_eq!(sink.count(ErrorCategory::AccessRights), 1);
}
