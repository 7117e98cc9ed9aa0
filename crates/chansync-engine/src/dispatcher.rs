//! Bounded-concurrency upload dispatch
//!
//! Routes each file to the single-shot or chunked upload path based on the
//! configured size threshold, after checking whether the destination folder
//! already holds an item of the same name. A file's upload is the unit of
//! work: one failing never cancels the others. In-flight uploads are
//! bounded by a semaphore sized from the configuration.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use chansync_core::config::TransferConfig;
use chansync_core::domain::{ErrorCategory, FileEntry, RemoteItemRef};
use chansync_core::report::{ErrorSink, RunStats};
use chansync_graph::client::GraphClient;
use chansync_graph::{drive, upload};

use crate::materializer::FolderMap;

/// Terminal state of one file's dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Ignored,
    Failed,
}

/// Routes files to upload paths under a concurrency bound.
pub struct UploadDispatcher {
    client: Arc<GraphClient>,
    sink: Arc<ErrorSink>,
    stats: Arc<RunStats>,
    transfer: TransferConfig,
    permits: Arc<Semaphore>,
}

impl UploadDispatcher {
    pub fn new(
        client: Arc<GraphClient>,
        sink: Arc<ErrorSink>,
        stats: Arc<RunStats>,
        transfer: TransferConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(transfer.concurrency));
        Self {
            client,
            sink,
            stats,
            transfer,
            permits,
        }
    }

    /// Dispatches every file of a walked tree.
    ///
    /// Files whose destination folder never materialized are failed up
    /// front without a network call. The rest run concurrently within the
    /// semaphore bound; this method returns once every file has reached a
    /// terminal state.
    pub async fn dispatch(&self, files: Vec<FileEntry>, folders: &FolderMap, dest: &RemoteItemRef) {
        let mut tasks: JoinSet<()> = JoinSet::new();

        for file in files {
            let parent = match file.parent_relative_path() {
                None => dest.clone(),
                Some(rel) => match folders.get(rel) {
                    Some(parent_ref) => parent_ref.clone(),
                    None => {
                        self.sink.push(
                            ErrorCategory::File,
                            "destination folder unavailable",
                            file.local_path.display().to_string(),
                        );
                        self.stats.file_failed();
                        continue;
                    }
                },
            };

            let client = Arc::clone(&self.client);
            let sink = Arc::clone(&self.sink);
            let stats = Arc::clone(&self.stats);
            let permits = Arc::clone(&self.permits);
            let transfer = self.transfer.clone();

            tasks.spawn(async move {
                // Semaphore is never closed, so acquire only fails on
                // shutdown; treat that as a failed file rather than a panic.
                let Ok(_permit) = permits.acquire().await else {
                    stats.file_failed();
                    return;
                };
                let outcome = process_file(&client, &sink, &transfer, &parent, &file).await;
                match outcome {
                    UploadOutcome::Uploaded => stats.file_uploaded(file.size_bytes),
                    UploadOutcome::Ignored => stats.file_ignored(),
                    UploadOutcome::Failed => stats.file_failed(),
                }
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                warn!(error = %err, "upload task panicked");
                self.stats.file_failed();
            }
        }
    }
}

/// Runs one file to a terminal state: existence check, then the size-routed
/// upload path. Every failure is recorded with the file's context.
async fn process_file(
    client: &GraphClient,
    sink: &ErrorSink,
    transfer: &TransferConfig,
    parent: &RemoteItemRef,
    file: &FileEntry,
) -> UploadOutcome {
    let name = file.name();
    let context = file.local_path.display().to_string();

    // Skip-if-present: an item of the same name means this file was already
    // delivered (this run is not a differ).
    match drive::lookup_by_name(client, &parent.drive_id, &parent.id, name).await {
        Ok(Some(_existing)) => {
            debug!(name, "Already present at destination, ignoring");
            sink.push(ErrorCategory::Ignored, "already present at destination", context);
            return UploadOutcome::Ignored;
        }
        Ok(None) => {}
        Err(err) => {
            sink.push(err.category(), format!("existence check failed: {err:#}"), context);
            return UploadOutcome::Failed;
        }
    }

    if file.size_bytes >= transfer.large_file_threshold_bytes() {
        match upload::upload_large(
            client,
            &parent.drive_id,
            &parent.id,
            name,
            &file.local_path,
            file.size_bytes,
            transfer.chunk_size_bytes(),
        )
        .await
        {
            Ok(_item) => UploadOutcome::Uploaded,
            Err(err) => {
                sink.push(err.category(), format!("chunked upload failed: {err:#}"), context);
                UploadOutcome::Failed
            }
        }
    } else {
        let data = match tokio::fs::read(&file.local_path).await {
            Ok(data) => data,
            Err(err) => {
                sink.push(ErrorCategory::File, format!("local read failed: {err}"), context);
                return UploadOutcome::Failed;
            }
        };

        match upload::upload_small(client, &parent.drive_id, &parent.id, name, data).await {
            Ok(_item) => UploadOutcome::Uploaded,
            Err(err) => {
                sink.push(err.category(), format!("upload failed: {err:#}"), context);
                UploadOutcome::Failed
            }
        }
    }
}
