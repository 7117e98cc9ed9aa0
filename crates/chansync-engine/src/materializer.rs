//! Remote folder materialization
//!
//! Realizes a walked tree's directory hierarchy under a destination folder,
//! in depth order, so a child is never created before its parent has been
//! acknowledged. All creation goes through the single-flight namespace, so
//! concurrent materialization of overlapping trees stays safe.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use chansync_core::domain::RemoteItemRef;
use chansync_core::report::RunStats;
use chansync_graph::namespace::RemoteNamespace;

use crate::walker::LocalTree;

/// Mapping from relative path to realized remote folder.
///
/// A missing key means that folder (or one of its ancestors) failed to
/// resolve; files beneath it are marked failed by the dispatcher.
pub type FolderMap = HashMap<String, RemoteItemRef>;

/// Realizes folders remotely ahead of file uploads.
pub struct FolderMaterializer {
    namespace: Arc<RemoteNamespace>,
    stats: Arc<RunStats>,
}

impl FolderMaterializer {
    pub fn new(namespace: Arc<RemoteNamespace>, stats: Arc<RunStats>) -> Self {
        Self { namespace, stats }
    }

    /// Ensures every directory of `tree` exists under `dest`.
    ///
    /// Returns the relative-path map used by the dispatcher to address
    /// destination folders. Failures are already recorded by the namespace;
    /// the affected subtree is simply absent from the map. An entry whose
    /// parent is absent is skipped without a remote call, since its creation
    /// could only dangle.
    pub async fn materialize(&self, tree: &LocalTree, dest: &RemoteItemRef) -> FolderMap {
        let mut map = FolderMap::new();

        for folder in &tree.folders {
            let parent = match folder.parent_relative_path() {
                None => dest,
                Some(parent_rel) => match map.get(parent_rel) {
                    Some(parent_ref) => parent_ref,
                    None => {
                        debug!(
                            path = %folder.relative_path,
                            "Skipping folder under unresolved parent"
                        );
                        continue;
                    }
                },
            };

            match self
                .namespace
                .resolve_or_create(&dest.drive_id, &parent.id, folder.name())
                .await
            {
                Ok((item, created)) => {
                    if created {
                        self.stats.folder_created();
                    }
                    map.insert(folder.relative_path.clone(), item);
                }
                Err(_unresolved) => {
                    // Recorded by the namespace; dependents fail downstream.
                    continue;
                }
            }
        }

        map
    }
}
