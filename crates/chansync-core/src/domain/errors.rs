//! Error taxonomy for replication runs
//!
//! Every failure recorded during a run carries one of these categories.
//! Retryable categories (`Connection`, `Quota`) are only recorded after the
//! request gate has exhausted its attempts; non-retryable categories
//! (`AccessRights`, `DataFormat`) are recorded on first occurrence.
//! `Ignored` is not a failure: it marks items skipped because they already
//! exist at the destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned to every recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A request could not complete after retries (network, 5xx).
    Connection,
    /// Credentials were rejected and could not be transparently renewed.
    Authentication,
    /// A response was missing an expected field or had an unexpected shape.
    DataFormat,
    /// Authorization denied; never retried.
    AccessRights,
    /// Rate limited (HTTP 429) beyond the retry budget.
    Quota,
    /// Local I/O or upload-path failure for a single file.
    File,
    /// Acknowledged bytes do not reconstruct the full file size.
    ChunkIntegrity,
    /// Item already present at the destination; skipped, not a failure.
    Ignored,
}

impl ErrorCategory {
    /// Human-readable label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::DataFormat => "data format",
            Self::AccessRights => "access rights",
            Self::Quota => "quota",
            Self::File => "file",
            Self::ChunkIntegrity => "chunk integrity",
            Self::Ignored => "ignored",
        }
    }

    /// True for categories that count as failures in the run summary.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single recorded error with enough context to re-run the failed item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub category: ErrorCategory,
    /// What went wrong, including the causing error chain.
    pub message: String,
    /// Item context: local path and/or remote ids.
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        category: ErrorCategory,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            context: context.into(),
            timestamp: Utc::now(),
        }
    }
}
