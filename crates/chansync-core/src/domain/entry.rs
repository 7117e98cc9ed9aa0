//! Local tree entries produced by the walker
//!
//! A walk of one source directory yields every directory as a [`FolderEntry`]
//! (ordered so a parent precedes all of its descendants) and every regular
//! file as a [`FileEntry`]. Both are immutable once enumerated.

use std::path::PathBuf;

use serde::Serialize;

/// A local directory that must exist remotely before any file beneath it
/// is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    /// Path relative to the walked source root, `/`-separated, never empty.
    pub relative_path: String,
    /// Absolute path on the local filesystem.
    pub local_path: PathBuf,
    /// Number of path segments in `relative_path` (1 for a top-level child).
    pub depth: usize,
}

impl FolderEntry {
    /// Returns the final path segment (the folder's own name).
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Returns the relative path of the parent directory, or `None` for a
    /// top-level entry (whose parent is the source root itself).
    pub fn parent_relative_path(&self) -> Option<&str> {
        self.relative_path.rsplit_once('/').map(|(parent, _)| parent)
    }
}

/// A local regular file scheduled for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the walked source root, `/`-separated.
    pub relative_path: String,
    /// Absolute path on the local filesystem.
    pub local_path: PathBuf,
    /// Size in bytes at enumeration time.
    pub size_bytes: u64,
}

impl FileEntry {
    /// Returns the file name (final path segment).
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Returns the relative path of the containing directory, or `None` when
    /// the file sits directly in the source root.
    pub fn parent_relative_path(&self) -> Option<&str> {
        self.relative_path.rsplit_once('/').map(|(parent, _)| parent)
    }
}

/// Pre-transfer census of a walked tree: what a complete run would move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeCensus {
    /// Total number of regular files found.
    pub total_files: u64,
    /// Total number of directories found (excluding the root itself).
    pub total_folders: u64,
    /// Sum of all file sizes in bytes.
    pub total_bytes: u64,
}
