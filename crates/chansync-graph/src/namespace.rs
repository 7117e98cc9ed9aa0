//! Single-flight remote namespace cache
//!
//! Maps (parent item id, child name) to a realized remote folder, issuing at
//! most one creation request per key for the lifetime of a run. Concurrent
//! requesters for the same key await the first requester's resolution and
//! share its outcome, including a terminal failure: dependents of a folder
//! that could not be resolved fail explicitly instead of being skipped.
//!
//! Resolution order per key: cache, then remote lookup (the namespace may
//! have been populated by a prior run), then creation with conflict behavior
//! `fail`. A creation conflict falls back to lookup and reuses the existing
//! id.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use chansync_core::domain::{NamespaceKey, RemoteItemRef};
use chansync_core::report::ErrorSink;

use crate::client::GraphClient;
use crate::drive;

/// Returned when a folder's resolution failed terminally for this run.
#[derive(Debug, Clone, Error)]
#[error("remote folder \"{name}\" under {parent_id} is unavailable")]
pub struct UnresolvedFolder {
    pub parent_id: String,
    pub name: String,
}

/// Outcome of a key's single-flight resolution, shared by all waiters.
#[derive(Debug, Clone)]
enum Resolution {
    Ready { item: RemoteItemRef, created: bool },
    Failed,
}

/// Process-scoped folder cache with per-key single-flight creation.
pub struct RemoteNamespace {
    client: Arc<GraphClient>,
    sink: Arc<ErrorSink>,
    slots: DashMap<NamespaceKey, Arc<OnceCell<Resolution>>>,
}

impl RemoteNamespace {
    pub fn new(client: Arc<GraphClient>, sink: Arc<ErrorSink>) -> Self {
        Self {
            client,
            sink,
            slots: DashMap::new(),
        }
    }

    /// Resolves `name` under `parent_id`, creating the folder remotely if it
    /// does not exist yet.
    ///
    /// Returns the remote reference and whether this run created it. The
    /// creation request for a given key is issued at most once; callers
    /// racing on the same key block on the winner's network round-trip.
    pub async fn resolve_or_create(
        &self,
        drive_id: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<(RemoteItemRef, bool), UnresolvedFolder> {
        let key = NamespaceKey::new(parent_id, name);

        // Clone the slot out of the map so no shard lock is held across await.
        let cell = self
            .slots
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let resolution = cell
            .get_or_init(|| self.resolve_slot(drive_id, parent_id, name))
            .await;

        match resolution {
            Resolution::Ready { item, created } => Ok((item.clone(), *created)),
            Resolution::Failed => Err(UnresolvedFolder {
                parent_id: parent_id.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Performs the actual lookup/create round-trips for one key.
    ///
    /// Runs exactly once per key; errors are recorded here so a failed key
    /// produces a single record no matter how many waiters observe it.
    async fn resolve_slot(&self, drive_id: &str, parent_id: &str, name: &str) -> Resolution {
        let context = format!("drive {drive_id}, parent {parent_id}, folder \"{name}\"");

        match drive::lookup_by_name(&self.client, drive_id, parent_id, name).await {
            Ok(Some(existing)) => {
                debug!(%context, id = %existing.id, "Folder already present, reusing");
                return Resolution::Ready {
                    item: existing.into_item_ref(drive_id),
                    created: false,
                };
            }
            Ok(None) => {}
            Err(err) => {
                self.sink.push(err.category(), format!("{err:#}"), context);
                return Resolution::Failed;
            }
        }

        match drive::create_folder(&self.client, drive_id, parent_id, name).await {
            Ok(created) => {
                debug!(%context, id = %created.id, "Folder created");
                Resolution::Ready {
                    item: created.into_item_ref(drive_id),
                    created: true,
                }
            }
            Err(crate::GraphError::Conflict(detail)) => {
                // Someone else (another process, an earlier partial run) won
                // the race; recover the existing id.
                warn!(%context, detail = %detail, "Creation conflict, falling back to lookup");
                match drive::lookup_by_name(&self.client, drive_id, parent_id, name).await {
                    Ok(Some(existing)) => Resolution::Ready {
                        item: existing.into_item_ref(drive_id),
                        created: false,
                    },
                    Ok(None) => {
                        self.sink.push(
                            chansync_core::domain::ErrorCategory::DataFormat,
                            "creation conflicted but the folder is not listed",
                            context,
                        );
                        Resolution::Failed
                    }
                    Err(err) => {
                        self.sink.push(err.category(), format!("{err:#}"), context);
                        Resolution::Failed
                    }
                }
            }
            Err(err) => {
                self.sink.push(err.category(), format!("{err:#}"), context);
                Resolution::Failed
            }
        }
    }

    /// Number of keys resolved (successfully or not) so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
