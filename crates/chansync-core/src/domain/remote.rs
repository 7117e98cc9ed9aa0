//! Realized remote items and namespace keys
//!
//! Graph issues opaque string ids for drives and items; these types carry
//! them around without re-validating what the server already guarantees.

use serde::{Deserialize, Serialize};

/// A realized remote folder or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItemRef {
    /// Graph item id.
    pub id: String,
    /// Item name as it exists remotely.
    pub name: String,
    /// Id of the parent item, when known.
    pub parent_id: Option<String>,
    /// Drive the item lives in.
    pub drive_id: String,
}

/// Identifies a prospective child item: (parent item id, child name).
///
/// The namespace cache guarantees at most one creation attempt per key for
/// the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceKey {
    pub parent_id: String,
    pub name: String,
}

impl NamespaceKey {
    pub fn new(parent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: name.into(),
        }
    }
}

/// The files folder backing a Teams channel, resolved once per mapping entry.
///
/// Everything replicated for the entry is rooted under `item_id` within
/// `drive_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRoot {
    /// Drive (document library) id from `parentReference.driveId`.
    pub drive_id: String,
    /// Item id of the channel's files folder.
    pub item_id: String,
}

impl ChannelRoot {
    /// Returns the root as a `RemoteItemRef` usable as a materialization
    /// starting point.
    pub fn as_item_ref(&self) -> RemoteItemRef {
        RemoteItemRef {
            id: self.item_id.clone(),
            name: String::new(),
            parent_id: None,
            drive_id: self.drive_id.clone(),
        }
    }
}
