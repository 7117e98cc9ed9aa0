//! Local tree enumeration
//!
//! Walks one source directory and produces the immutable folder and file
//! entries the rest of the engine consumes. Folders come out parents-first
//! (walkdir's contract), which is what lets the materializer resolve each
//! entry against an already-realized parent. Unreadable entries are
//! recorded and skipped; only an unreadable root aborts the walk.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use chansync_core::domain::{ErrorCategory, FileEntry, FolderEntry, TreeCensus};
use chansync_core::report::ErrorSink;

/// The enumerated contents of one source directory.
#[derive(Debug)]
pub struct LocalTree {
    /// Directories, ordered so parents precede descendants.
    pub folders: Vec<FolderEntry>,
    /// Regular files in traversal order.
    pub files: Vec<FileEntry>,
    /// Totals computed during the walk.
    pub census: TreeCensus,
}

/// Converts a path relative to the walk root into the `/`-separated form
/// used as a map key and for remote naming.
fn relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walks `root` without following symlinks.
///
/// Entries that cannot be read (permission errors, vanished files) become
/// `File` records in the sink; the walk continues past them.
pub fn walk_tree(root: &Path, sink: &Arc<ErrorSink>) -> Result<LocalTree> {
    let root_meta = std::fs::metadata(root)
        .with_context(|| format!("source directory {} is not accessible", root.display()))?;
    if !root_meta.is_dir() {
        anyhow::bail!("source path {} is not a directory", root.display());
    }

    let mut folders = Vec::new();
    let mut files = Vec::new();
    let mut census = TreeCensus::default();

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let context = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                sink.push(ErrorCategory::File, format!("walk failed: {err}"), context);
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => relative_string(rel),
            Err(_) => continue,
        };

        if entry.file_type().is_dir() {
            census.total_folders += 1;
            folders.push(FolderEntry {
                relative_path: relative,
                local_path: entry.path().to_path_buf(),
                depth: entry.depth(),
            });
        } else if entry.file_type().is_file() {
            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    sink.push(
                        ErrorCategory::File,
                        format!("metadata failed: {err}"),
                        entry.path().display().to_string(),
                    );
                    continue;
                }
            };
            census.total_files += 1;
            census.total_bytes += size;
            files.push(FileEntry {
                relative_path: relative,
                local_path: entry.path().to_path_buf(),
                size_bytes: size,
            });
        }
        // Symlinks and other special files are skipped silently.
    }

    debug!(
        root = %root.display(),
        files = census.total_files,
        folders = census.total_folders,
        bytes = census.total_bytes,
        "Walked source tree"
    );

    Ok(LocalTree {
        folders,
        files,
        census,
    })
}
