//! File upload operations
//!
//! Two paths, selected by the dispatcher against the configured threshold:
//! - [`upload_small`] - single `PUT .../content` request with the raw bytes
//! - [`upload_large`] - resumable upload session transmitting contiguous
//!   byte ranges with `Content-Range` headers
//!
//! Upload-session URLs are pre-authenticated by Graph, so chunk requests
//! carry no bearer header and talk to the raw HTTP client. Chunks are sent
//! strictly sequentially: the session protocol acknowledges contiguous
//! ascending ranges, which rules out parallel dispatch within one file.
//! Each chunk is retried independently with backoff (and Retry-After
//! compliance) so a transient failure resumes the transfer instead of
//! restarting it.

use std::io::SeekFrom;
use std::path::Path;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use chansync_core::domain::{ErrorCategory, RemoteItemRef};

use crate::client::GraphClient;
use crate::drive::DriveItemSummary;
use crate::gate::{parse_retry_after, RetryPolicy, DEFAULT_RETRY_AFTER};
use crate::GraphError;

// ============================================================================
// Errors
// ============================================================================

/// Failure modes of a single file transfer.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Reading the local file failed
    #[error("local read failed: {0}")]
    LocalIo(#[from] std::io::Error),

    /// A remote call failed terminally
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The session completed without acknowledging the full file
    #[error("upload session acknowledged {acknowledged} of {expected} bytes")]
    Integrity { acknowledged: u64, expected: u64 },
}

impl UploadError {
    /// Maps onto the run-level error taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LocalIo(_) => ErrorCategory::File,
            Self::Graph(err) => err.category(),
            Self::Integrity { .. } => ErrorCategory::ChunkIntegrity,
        }
    }
}

// ============================================================================
// Chunk planning
// ============================================================================

/// A contiguous byte range of one file; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
    /// Transmission attempts consumed so far.
    pub attempts: u32,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `Content-Range` header value for this range within `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end - 1, total)
    }
}

/// Partitions `[0, file_size)` into contiguous, non-overlapping ranges of at
/// most `chunk_size` bytes. The union of the ranges is exactly the file.
pub fn chunk_ranges(file_size: u64, chunk_size: u64) -> Vec<ChunkRange> {
    assert!(chunk_size > 0, "chunk size must be positive");
    let mut ranges = Vec::with_capacity(file_size.div_ceil(chunk_size) as usize);
    let mut start = 0;
    while start < file_size {
        let end = (start + chunk_size).min(file_size);
        ranges.push(ChunkRange {
            start,
            end,
            attempts: 0,
        });
        start = end;
    }
    ranges
}

// ============================================================================
// Session types
// ============================================================================

/// An open resumable upload session.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Pre-authenticated session URL all chunks are PUT against.
    pub upload_url: String,
    /// Total file size the session was opened for.
    pub file_size: u64,
    /// Chunk size the transfer was planned with.
    pub chunk_size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSessionResponse {
    upload_url: String,
}

/// Server acknowledgement of one chunk.
enum ChunkAck {
    /// Intermediate chunk accepted (HTTP 202).
    Accepted,
    /// Final chunk: the session is complete and the item is returned.
    Completed(DriveItemSummary),
}

// ============================================================================
// Path construction
// ============================================================================

/// Builds the item-by-path API path for a child of `parent_id`.
///
/// Item names are percent-encoded so names with spaces, `#` or `%` survive
/// the path position.
fn item_path(drive_id: &str, parent_id: &str, name: &str, suffix: &str) -> String {
    format!(
        "/drives/{}/items/{}:/{}:/{}",
        drive_id,
        parent_id,
        urlencoding::encode(name),
        suffix
    )
}

// ============================================================================
// Single-shot upload
// ============================================================================

/// Uploads a small file in a single PUT request.
pub async fn upload_small(
    client: &GraphClient,
    drive_id: &str,
    parent_id: &str,
    name: &str,
    data: Vec<u8>,
) -> Result<RemoteItemRef, GraphError> {
    let url = client.endpoint(&item_path(drive_id, parent_id, name, "content"));
    debug!(name, bytes = data.len(), "Uploading small file");

    let response = client
        .send_with_retry("putContent", move |http: &Client| {
            http.put(&url)
                .header("Content-Type", "application/octet-stream")
                .body(data.clone())
        })
        .await?;

    let item: DriveItemSummary = response
        .json()
        .await
        .map_err(|e| GraphError::InvalidResponse(format!("upload response: {e}")))?;

    debug!(id = %item.id, name = %item.name, "Small upload completed");
    Ok(item.into_item_ref(drive_id))
}

// ============================================================================
// Upload sessions
// ============================================================================

/// Opens a resumable upload session for a large file.
///
/// Failure here is terminal for the file and leaves no partial session.
pub async fn create_upload_session(
    client: &GraphClient,
    drive_id: &str,
    parent_id: &str,
    name: &str,
    file_size: u64,
    chunk_size: u64,
) -> Result<UploadSession, GraphError> {
    let url = client.endpoint(&item_path(drive_id, parent_id, name, "createUploadSession"));
    debug!(name, file_size, "Creating upload session");

    let response = client
        .send_with_retry("createUploadSession", move |http: &Client| {
            http.post(&url)
                .header("Content-Type", "application/json")
                .body("{}")
        })
        .await?;

    let body: UploadSessionResponse = response
        .json()
        .await
        .map_err(|e| GraphError::InvalidResponse(format!("upload session response: {e}")))?;

    Ok(UploadSession {
        upload_url: body.upload_url,
        file_size,
        chunk_size,
    })
}

/// Sends one chunk, retrying transient failures with backoff.
///
/// The session URL is pre-authenticated; no bearer header is attached.
/// `range.attempts` records how many transmissions this range consumed.
async fn put_chunk(
    http: &Client,
    session: &UploadSession,
    range: &mut ChunkRange,
    body: Vec<u8>,
    retry: &RetryPolicy,
) -> Result<ChunkAck, UploadError> {
    let content_range = range.content_range(session.file_size);
    let mut backoffs: u32 = 0;

    loop {
        range.attempts += 1;

        let result = http
            .put(&session.upload_url)
            .header("Content-Length", body.len().to_string())
            .header("Content-Range", &content_range)
            .body(body.clone())
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if range.attempts >= retry.max_attempts {
                    return Err(UploadError::Graph(GraphError::Network(err)));
                }
                let delay = retry.backoff_delay(backoffs);
                debug!(%content_range, error = %err, "Chunk transport error, backing off");
                tokio::time::sleep(delay).await;
                backoffs += 1;
                continue;
            }
        };

        let status = response.status();

        if status == StatusCode::ACCEPTED {
            return Ok(ChunkAck::Accepted);
        }

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let item: DriveItemSummary = response.json().await.map_err(|e| {
                UploadError::Graph(GraphError::InvalidResponse(format!(
                    "final chunk response: {e}"
                )))
            })?;
            return Ok(ChunkAck::Completed(item));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                .unwrap_or(DEFAULT_RETRY_AFTER);
            if range.attempts >= retry.max_attempts {
                return Err(UploadError::Graph(GraphError::TooManyRequests {
                    retry_after,
                }));
            }
            info!(%content_range, retry_after_ms = retry_after.as_millis() as u64, "Chunk throttled");
            tokio::time::sleep(retry_after).await;
            continue;
        }

        if status.is_server_error() {
            if range.attempts >= retry.max_attempts {
                return Err(UploadError::Graph(GraphError::ServerError(format!(
                    "{status} on chunk {content_range}"
                ))));
            }
            let delay = retry.backoff_delay(backoffs);
            warn!(%content_range, status = status.as_u16(), "Chunk server error, backing off");
            tokio::time::sleep(delay).await;
            backoffs += 1;
            continue;
        }

        // Client errors on a session URL are not recoverable by resending
        // the same range.
        return Err(UploadError::Graph(GraphError::RequestFailed {
            status: status.as_u16(),
            detail: format!("chunk {content_range} rejected"),
        }));
    }
}

/// Uploads a large file through a resumable session.
///
/// Ranges are read from disk one at a time, so memory use is bounded by the
/// chunk size regardless of file size. The transfer completes only when the
/// acknowledged bytes equal `file_size`; anything else is an integrity
/// failure. An aborted transfer may leave a partial remote item behind.
pub async fn upload_large(
    client: &GraphClient,
    drive_id: &str,
    parent_id: &str,
    name: &str,
    local_path: &Path,
    file_size: u64,
    chunk_size: u64,
) -> Result<RemoteItemRef, UploadError> {
    let session =
        create_upload_session(client, drive_id, parent_id, name, file_size, chunk_size).await?;
    let retry = client.retry_policy();

    let mut ranges = chunk_ranges(file_size, chunk_size);
    info!(
        name,
        file_size,
        chunks = ranges.len(),
        "Starting chunked upload"
    );

    let mut file = tokio::fs::File::open(local_path).await?;
    let mut acknowledged: u64 = 0;
    let mut completed: Option<DriveItemSummary> = None;

    for range in &mut ranges {
        let mut buffer = vec![0u8; range.len() as usize];
        file.seek(SeekFrom::Start(range.start)).await?;
        file.read_exact(&mut buffer).await?;

        match put_chunk(client.http(), &session, range, buffer, &retry).await? {
            ChunkAck::Accepted => {
                acknowledged += range.len();
                debug!(name, acknowledged, total = file_size, "Chunk acknowledged");
            }
            ChunkAck::Completed(item) => {
                acknowledged += range.len();
                completed = Some(item);
            }
        }
    }

    if acknowledged != file_size {
        return Err(UploadError::Integrity {
            acknowledged,
            expected: file_size,
        });
    }

    let item = completed.ok_or(UploadError::Integrity {
        acknowledged,
        expected: file_size,
    })?;

    // The remote item's reported size is the last word on reconstruction.
    if let Some(remote_size) = item.size {
        if remote_size != file_size {
            return Err(UploadError::Integrity {
                acknowledged: remote_size,
                expected: file_size,
            });
        }
    }

    info!(name, id = %item.id, "Chunked upload completed");
    Ok(item.into_item_ref(drive_id))
}
