//! chansync Engine - tree replication orchestration
//!
//! Pulls the pieces together: walk a local tree, materialize its folder
//! hierarchy remotely, and dispatch file uploads through a bounded worker
//! pool. One [`replicator::Replicator`] run covers every mapping entry in
//! the configuration and yields a [`replicator::RunReport`].
//!
//! ## Modules
//!
//! - [`walker`] - local tree enumeration
//! - [`materializer`] - depth-ordered remote folder realization
//! - [`dispatcher`] - bounded-concurrency upload routing
//! - [`replicator`] - per-mapping orchestration and run reporting

pub mod dispatcher;
pub mod materializer;
pub mod replicator;
pub mod walker;
