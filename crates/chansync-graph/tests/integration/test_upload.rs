//! Upload paths against a mock server: single-shot, sessions, chunk retry

use std::io::Write;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use chansync_graph::upload::{upload_large, upload_small, UploadError};
use chansync_graph::GraphError;

use crate::common::{file_item_json, setup_client};

#[tokio::test]
async fn small_upload_puts_raw_bytes() {
    let (server, client) = setup_client().await;

    Mock::given(method("PUT"))
        .and(path("/drives/drive-1/items/parent-1:/hello.txt:/content"))
        .and(header("Content-Type", "application/octet-stream"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(file_item_json("file-1", "hello.txt", 11)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let item = upload_small(
        &client,
        "drive-1",
        "parent-1",
        "hello.txt",
        b"hello world".to_vec(),
    )
    .await
    .unwrap();

    assert_eq!(item.id, "file-1");
    assert_eq!(item.name, "hello.txt");
}

#[tokio::test]
async fn small_upload_encodes_item_name() {
    let (server, client) = setup_client().await;

    Mock::given(method("PUT"))
        .and(path("/drives/drive-1/items/parent-1:/report%202024.pdf:/content"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(file_item_json("file-2", "report 2024.pdf", 3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let item = upload_small(
        &client,
        "drive-1",
        "parent-1",
        "report 2024.pdf",
        vec![1, 2, 3],
    )
    .await
    .unwrap();
    assert_eq!(item.name, "report 2024.pdf");
}

/// Writes `size` deterministic bytes to a temp file and returns it.
fn temp_file_of(size: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    file.write_all(&data).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn chunked_upload_sends_every_range_once() {
    let (server, client) = setup_client().await;
    let upload_url = format!("{}/upload/session-1", server.uri());

    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/parent-1:/big.bin:/createUploadSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadUrl": upload_url,
            "expirationDateTime": "2026-08-07T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // 25 bytes in 10-byte chunks: two intermediate ranges, one final.
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 0-9/25"))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "nextExpectedRanges": ["10-"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 10-19/25"))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "nextExpectedRanges": ["20-"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 20-24/25"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(file_item_json("big-1", "big.bin", 25)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let file = temp_file_of(25);
    let item = upload_large(&client, "drive-1", "parent-1", "big.bin", file.path(), 25, 10)
        .await
        .unwrap();

    assert_eq!(item.id, "big-1");
}

#[tokio::test]
async fn failed_chunk_is_retried_without_restarting_the_transfer() {
    let (server, client) = setup_client().await;
    let upload_url = format!("{}/upload/session-2", server.uri());

    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/parent-1:/flaky.bin:/createUploadSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadUrl": upload_url
        })))
        .expect(1)
        .mount(&server)
        .await;

    // First range fails twice, then succeeds on the third transmission.
    Mock::given(method("PUT"))
        .and(path("/upload/session-2"))
        .and(header("Content-Range", "bytes 0-9/15"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-2"))
        .and(header("Content-Range", "bytes 0-9/15"))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "nextExpectedRanges": ["10-"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Final range goes through first try; a restarted transfer would hit
    // the 0-9 mocks again and overshoot their expectations.
    Mock::given(method("PUT"))
        .and(path("/upload/session-2"))
        .and(header("Content-Range", "bytes 10-14/15"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(file_item_json("flaky-1", "flaky.bin", 15)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let file = temp_file_of(15);
    let item = upload_large(
        &client,
        "drive-1",
        "parent-1",
        "flaky.bin",
        file.path(),
        15,
        10,
    )
    .await
    .unwrap();

    assert_eq!(item.id, "flaky-1");
}

#[tokio::test]
async fn exhausted_chunk_retries_abort_the_transfer() {
    let (server, client) = setup_client().await;
    let upload_url = format!("{}/upload/session-3", server.uri());

    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/parent-1:/doomed.bin:/createUploadSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadUrl": upload_url
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-3"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let file = temp_file_of(10);
    let err = upload_large(
        &client,
        "drive-1",
        "parent-1",
        "doomed.bin",
        file.path(),
        10,
        10,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        UploadError::Graph(GraphError::ServerError(_))
    ));
}

#[tokio::test]
async fn session_open_failure_is_terminal() {
    let (server, client) = setup_client().await;

    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/parent-1:/nosession.bin:/createUploadSession"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    // No session URL mock: any chunk PUT would 404 and fail expectations.

    let file = temp_file_of(10);
    let err = upload_large(
        &client,
        "drive-1",
        "parent-1",
        "nosession.bin",
        file.path(),
        10,
        10,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        UploadError::Graph(GraphError::ServerError(_))
    ));
}

#[tokio::test]
async fn size_mismatch_in_final_item_is_an_integrity_error() {
    let (server, client) = setup_client().await;
    let upload_url = format!("{}/upload/session-4", server.uri());

    Mock::given(method("POST"))
        .and(path("/drives/drive-1/items/parent-1:/short.bin:/createUploadSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadUrl": upload_url
        })))
        .mount(&server)
        .await;

    // Server claims a different final size than what was sent.
    Mock::given(method("PUT"))
        .and(path("/upload/session-4"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(file_item_json("short-1", "short.bin", 7)),
        )
        .mount(&server)
        .await;

    let file = temp_file_of(10);
    let err = upload_large(
        &client,
        "drive-1",
        "parent-1",
        "short.bin",
        file.path(),
        10,
        10,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::Integrity { .. }));
}
