//! Drive and item operations
//!
//! Covers the Graph surface the replication engine consumes:
//! - `GET /teams/{groupId}/channels/{channelId}/filesFolder` to resolve a
//!   channel's document library root
//! - `GET /drives/{driveId}/items/{itemId}/children` with `@odata.nextLink`
//!   pagination, for existence checks and post-hoc id recovery
//! - `POST /drives/{driveId}/items/{itemId}/children` with
//!   `@microsoft.graph.conflictBehavior: "fail"` for folder creation
//!
//! All calls go through the client's request gate.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use chansync_core::domain::{ChannelRoot, RemoteItemRef};

use crate::client::GraphClient;
use crate::GraphError;

// ============================================================================
// Graph response DTOs
// ============================================================================

/// A drive item as returned by listing and creation calls.
///
/// Fields are `Option` because folders lack file facets and vice versa.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItemSummary {
    /// Graph item id
    pub id: String,
    /// Item name
    pub name: String,
    /// Size in bytes; present for files
    pub size: Option<u64>,
    /// Present if the item is a folder
    pub folder: Option<serde_json::Value>,
    /// Present if the item is a file
    pub file: Option<serde_json::Value>,
    /// Reference to the containing drive and parent item
    pub parent_reference: Option<ParentReference>,
}

/// Parent reference embedded in drive item responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    /// Drive (document library) id
    pub drive_id: Option<String>,
    /// Parent item id
    pub id: Option<String>,
}

impl DriveItemSummary {
    /// True when the folder facet is present.
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    /// Converts into a realized remote reference within `drive_id`.
    pub fn into_item_ref(self, drive_id: &str) -> RemoteItemRef {
        let parent_id = self.parent_reference.and_then(|p| p.id);
        RemoteItemRef {
            id: self.id,
            name: self.name,
            parent_id,
            drive_id: drive_id.to_string(),
        }
    }
}

/// One page of a children listing.
#[derive(Debug, Deserialize)]
struct ChildrenPage {
    value: Vec<DriveItemSummary>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Response of the filesFolder endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilesFolderResponse {
    id: String,
    parent_reference: Option<ParentReference>,
}

// ============================================================================
// Channel root resolution
// ============================================================================

/// Resolves the files folder backing a Teams channel.
///
/// The returned [`ChannelRoot`] carries the drive id every subsequent call
/// for this mapping entry addresses. A response without
/// `parentReference.driveId` is malformed and surfaced as
/// [`GraphError::InvalidResponse`].
pub async fn channel_files_folder(
    client: &GraphClient,
    group_id: &str,
    channel_id: &str,
) -> Result<ChannelRoot, GraphError> {
    let url = client.endpoint(&format!(
        "/teams/{group_id}/channels/{channel_id}/filesFolder"
    ));
    debug!(group_id, channel_id, "Resolving channel files folder");

    let response = client
        .send_with_retry("filesFolder", |http: &Client| http.get(&url))
        .await?;

    let body: FilesFolderResponse = response
        .json()
        .await
        .map_err(|e| GraphError::InvalidResponse(format!("filesFolder response: {e}")))?;

    let drive_id = body
        .parent_reference
        .and_then(|p| p.drive_id)
        .ok_or_else(|| {
            GraphError::InvalidResponse("filesFolder response missing parentReference.driveId".into())
        })?;

    Ok(ChannelRoot {
        drive_id,
        item_id: body.id,
    })
}

// ============================================================================
// Children listing and name lookup
// ============================================================================

/// Lists all children of an item, following `@odata.nextLink` pages.
pub async fn list_children(
    client: &GraphClient,
    drive_id: &str,
    item_id: &str,
) -> Result<Vec<DriveItemSummary>, GraphError> {
    let mut url = client.endpoint(&format!("/drives/{drive_id}/items/{item_id}/children"));
    let mut items = Vec::new();

    loop {
        let page_url = url.clone();
        let response = client
            .send_with_retry("listChildren", move |http: &Client| http.get(page_url.clone()))
            .await?;

        let page: ChildrenPage = response
            .json()
            .await
            .map_err(|e| GraphError::InvalidResponse(format!("children page: {e}")))?;

        items.extend(page.value);

        match page.next_link {
            Some(next) => url = next,
            None => break,
        }
    }

    debug!(drive_id, item_id, count = items.len(), "Listed children");
    Ok(items)
}

/// Finds a child by name, returning `None` on absence.
///
/// Graph treats item names case-insensitively, so the comparison does too.
/// Absence is an ordinary outcome here, never an error.
pub async fn lookup_by_name(
    client: &GraphClient,
    drive_id: &str,
    parent_id: &str,
    name: &str,
) -> Result<Option<DriveItemSummary>, GraphError> {
    let children = list_children(client, drive_id, parent_id).await?;
    Ok(children
        .into_iter()
        .find(|item| item.name.eq_ignore_ascii_case(name)))
}

// ============================================================================
// Folder creation
// ============================================================================

/// Creates a folder under `parent_id` with conflict behavior `fail`.
///
/// A name collision surfaces as [`GraphError::Conflict`]; the namespace
/// cache falls back to [`lookup_by_name`] in that case so the existing
/// folder's id is reused instead of renaming or failing the subtree.
pub async fn create_folder(
    client: &GraphClient,
    drive_id: &str,
    parent_id: &str,
    name: &str,
) -> Result<DriveItemSummary, GraphError> {
    let url = client.endpoint(&format!("/drives/{drive_id}/items/{parent_id}/children"));
    let payload = serde_json::json!({
        "name": name,
        "folder": {},
        "@microsoft.graph.conflictBehavior": "fail",
    });

    debug!(drive_id, parent_id, name, "Creating folder");

    let response = client
        .send_with_retry("createFolder", move |http: &Client| {
            http.post(&url).json(&payload)
        })
        .await?;

    response
        .json()
        .await
        .map_err(|e| GraphError::InvalidResponse(format!("create folder response: {e}")))
}
