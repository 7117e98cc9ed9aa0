//! chansync Graph - Microsoft Graph API adapter
//!
//! Provides the remote half of the replication engine:
//! - Client-credentials token lease with transparent refresh
//! - A typed HTTP client whose request gate handles retry, backoff and
//!   Retry-After throttling for every outbound call
//! - Drive operations: channel root resolution, child listing, folder
//!   creation with a fail-then-lookup conflict policy
//! - A single-flight remote namespace cache keyed by (parent id, name)
//! - Single-shot and resumable (chunked) file uploads
//!
//! ## Modules
//!
//! - [`auth`] - client-credentials credential lease
//! - [`client`] - Graph HTTP client and request gate
//! - [`drive`] - drive/item operations and response DTOs
//! - [`gate`] - retry policy and Retry-After parsing
//! - [`namespace`] - single-flight folder resolution cache
//! - [`upload`] - single-shot and upload-session transfers

pub mod auth;
pub mod client;
pub mod drive;
pub mod gate;
pub mod namespace;
pub mod upload;

use std::time::Duration;

use chansync_core::domain::ErrorCategory;
use thiserror::Error;

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// Credentials were rejected even after a transparent renewal
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The target name is already taken (folder creation with
    /// conflictBehavior=fail)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded beyond the retry budget
    #[error("Too many requests, last Retry-After was {retry_after:?}")]
    TooManyRequests {
        /// Server-specified wait from the final 429
        retry_after: Duration,
    },

    /// A server-side error persisted through all retries (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error persisted through all retries
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The credential lease could not supply a token
    #[error("Credential lease failed: {0}")]
    CredentialLease(String),

    /// The request was rejected with a client error outside the taxonomy
    #[error("Request failed with status {status}: {detail}")]
    RequestFailed {
        status: u16,
        detail: String,
    },

    /// The API response could not be parsed or was missing expected fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GraphError {
    /// Maps this error onto the run-level error taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized(_) | Self::CredentialLease(_) => ErrorCategory::Authentication,
            Self::Forbidden(_) => ErrorCategory::AccessRights,
            Self::TooManyRequests { .. } => ErrorCategory::Quota,
            Self::InvalidResponse(_) => ErrorCategory::DataFormat,
            Self::NotFound(_)
            | Self::Conflict(_)
            | Self::ServerError(_)
            | Self::Network(_)
            | Self::RequestFailed { .. } => ErrorCategory::Connection,
        }
    }
}
