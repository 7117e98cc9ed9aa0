//! chansync Core - Domain logic and shared run state
//!
//! This crate contains the provider-agnostic pieces of chansync:
//! - **Domain entities** - `FolderEntry`, `FileEntry`, `RemoteItemRef`,
//!   `NamespaceKey`, the error taxonomy
//! - **Configuration** - typed YAML configuration with defaults and validation
//! - **Run accumulators** - thread-safe `ErrorSink` and `RunStats`
//! - **Port definitions** - the `TokenSource` trait implemented by the
//!   Graph adapter crate
//!
//! The Graph adapter (`chansync-graph`) and the replication engine
//! (`chansync-engine`) both depend on this crate; nothing here performs I/O
//! beyond reading the configuration file.

pub mod config;
pub mod domain;
pub mod ports;
pub mod report;
