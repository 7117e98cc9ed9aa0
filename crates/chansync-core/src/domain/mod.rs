//! Domain entities for tree replication
//!
//! Entries are produced once by the tree walker and are read-only afterward.
//! Remote references are realized lazily by the namespace cache and live for
//! the duration of a run.

pub mod entry;
pub mod errors;
pub mod remote;

pub use entry::{FileEntry, FolderEntry, TreeCensus};
pub use errors::{ErrorCategory, ErrorRecord};
pub use remote::{ChannelRoot, NamespaceKey, RemoteItemRef};
