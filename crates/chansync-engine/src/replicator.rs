//! Per-mapping replication orchestration
//!
//! A run covers every mapping entry in the configuration. Per entry: the
//! channel's files folder is resolved (a failure here aborts only this
//! entry), then each source directory is walked, its top-level folder and
//! hierarchy are materialized, and its files are dispatched. Per-item
//! failures are recorded and the run continues; the report at the end
//! carries everything needed to re-run just the failed items.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use chansync_core::config::{Config, MappingConfig};
use chansync_core::domain::{ErrorCategory, TreeCensus};
use chansync_core::report::{ErrorSink, ErrorSnapshot, RunStats, StatsSnapshot};
use chansync_graph::client::GraphClient;
use chansync_graph::drive;
use chansync_graph::namespace::RemoteNamespace;

use crate::dispatcher::UploadDispatcher;
use crate::materializer::FolderMaterializer;
use crate::walker;

/// Outcome of one source directory within a mapping entry.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    /// Local path as configured.
    pub path: String,
    /// Remote top-level folder name.
    pub remote_name: String,
    /// What the walk found, when it succeeded.
    pub census: Option<TreeCensus>,
}

/// Outcome of one mapping entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub group_id: String,
    pub channel_id: String,
    /// True when the destination root could not be resolved and the whole
    /// entry was skipped.
    pub aborted: bool,
    pub sources: Vec<SourceReport>,
}

/// Final report of a replication run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub entries: Vec<EntryReport>,
    pub stats: StatsSnapshot,
    pub errors: ErrorSnapshot,
    pub duration_ms: u64,
}

/// Orchestrates a full replication run.
pub struct Replicator {
    client: Arc<GraphClient>,
    config: Config,
    sink: Arc<ErrorSink>,
    stats: Arc<RunStats>,
}

impl Replicator {
    pub fn new(client: Arc<GraphClient>, config: Config) -> Self {
        Self {
            client,
            config,
            sink: Arc::new(ErrorSink::new()),
            stats: Arc::new(RunStats::new()),
        }
    }

    /// Live counters, for any presentation layer that wants to poll.
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Live error records.
    pub fn sink(&self) -> Arc<ErrorSink> {
        Arc::clone(&self.sink)
    }

    /// Executes every mapping entry and returns the final report.
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();
        let mut entries = Vec::with_capacity(self.config.mappings.len());

        for mapping in &self.config.mappings {
            entries.push(self.run_entry(mapping).await);
        }

        let report = RunReport {
            entries,
            stats: self.stats.snapshot(),
            errors: self.sink.snapshot(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            uploaded = report.stats.files_uploaded,
            ignored = report.stats.files_ignored,
            failed = report.stats.files_failed,
            folders = report.stats.folders_created,
            bytes = report.stats.bytes_transferred,
            duration_ms = report.duration_ms,
            "Replication run finished"
        );
        report
    }

    /// Runs one mapping entry; a root-resolution failure aborts the entry,
    /// nothing else does.
    async fn run_entry(&self, mapping: &MappingConfig) -> EntryReport {
        info!(
            group_id = %mapping.group_id,
            channel_id = %mapping.channel_id,
            sources = mapping.sources.len(),
            "Starting mapping entry"
        );

        let root = match drive::channel_files_folder(
            &self.client,
            &mapping.group_id,
            &mapping.channel_id,
        )
        .await
        {
            Ok(root) => root,
            Err(err) => {
                error!(
                    group_id = %mapping.group_id,
                    channel_id = %mapping.channel_id,
                    error = %err,
                    "Destination root unavailable, aborting entry"
                );
                self.sink.push(
                    err.category(),
                    format!("channel root resolution failed: {err:#}"),
                    format!("group {}, channel {}", mapping.group_id, mapping.channel_id),
                );
                return EntryReport {
                    group_id: mapping.group_id.clone(),
                    channel_id: mapping.channel_id.clone(),
                    aborted: true,
                    sources: Vec::new(),
                };
            }
        };

        let namespace = Arc::new(RemoteNamespace::new(
            Arc::clone(&self.client),
            Arc::clone(&self.sink),
        ));
        let materializer =
            FolderMaterializer::new(Arc::clone(&namespace), Arc::clone(&self.stats));
        let dispatcher = UploadDispatcher::new(
            Arc::clone(&self.client),
            Arc::clone(&self.sink),
            Arc::clone(&self.stats),
            self.config.transfer.clone(),
        );

        let root_ref = root.as_item_ref();
        let mut sources = Vec::with_capacity(mapping.sources.len());

        for source in &mapping.sources {
            let remote_name = match source.remote_name() {
                Ok(name) => name,
                Err(err) => {
                    self.sink.push(
                        ErrorCategory::File,
                        format!("{err:#}"),
                        source.path.display().to_string(),
                    );
                    sources.push(SourceReport {
                        path: source.path.display().to_string(),
                        remote_name: String::new(),
                        census: None,
                    });
                    continue;
                }
            };

            let tree = match walker::walk_tree(&source.path, &self.sink) {
                Ok(tree) => tree,
                Err(err) => {
                    self.sink.push(
                        ErrorCategory::File,
                        format!("{err:#}"),
                        source.path.display().to_string(),
                    );
                    sources.push(SourceReport {
                        path: source.path.display().to_string(),
                        remote_name,
                        census: None,
                    });
                    continue;
                }
            };

            // The source's own top-level folder under the channel root.
            let top = match namespace
                .resolve_or_create(&root.drive_id, &root.item_id, &remote_name)
                .await
            {
                Ok((item, created)) => {
                    if created {
                        self.stats.folder_created();
                    }
                    item
                }
                Err(_unresolved) => {
                    // Recorded by the namespace; every file below is failed
                    // explicitly so the summary accounts for them.
                    for file in &tree.files {
                        self.sink.push(
                            ErrorCategory::File,
                            "destination folder unavailable",
                            file.local_path.display().to_string(),
                        );
                        self.stats.file_failed();
                    }
                    sources.push(SourceReport {
                        path: source.path.display().to_string(),
                        remote_name,
                        census: Some(tree.census),
                    });
                    continue;
                }
            };

            let folders = materializer.materialize(&tree, &top).await;
            dispatcher.dispatch(tree.files, &folders, &top).await;

            sources.push(SourceReport {
                path: source.path.display().to_string(),
                remote_name,
                census: Some(tree.census),
            });
        }

        EntryReport {
            group_id: mapping.group_id.clone(),
            channel_id: mapping.channel_id.clone(),
            aborted: false,
            sources,
        }
    }
}
