//! Categorized, thread-safe error collection
//!
//! The sink never aborts anything: recording an error is how a worker hands
//! off a failed item and moves on. Snapshots group records by category for
//! the end-of-run summary.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

use crate::domain::{ErrorCategory, ErrorRecord};

/// Append-only, categorized error collector shared across workers.
#[derive(Debug, Default)]
pub struct ErrorSink {
    records: Mutex<Vec<ErrorRecord>>,
}

/// Immutable view of the sink at a point in time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorSnapshot {
    /// All records in insertion order.
    pub records: Vec<ErrorRecord>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Failures are logged as they arrive so a tail of the
    /// log shows trouble before the summary does.
    pub fn record(&self, record: ErrorRecord) {
        if record.category.is_failure() {
            warn!(
                category = %record.category,
                context = %record.context,
                "{}",
                record.message
            );
        }
        self.records
            .lock()
            .expect("error sink mutex poisoned")
            .push(record);
    }

    /// Convenience for building and appending a record in one call.
    pub fn push(
        &self,
        category: ErrorCategory,
        message: impl Into<String>,
        context: impl Into<String>,
    ) {
        self.record(ErrorRecord::new(category, message, context));
    }

    /// Number of records in a given category.
    pub fn count(&self, category: ErrorCategory) -> usize {
        self.records
            .lock()
            .expect("error sink mutex poisoned")
            .iter()
            .filter(|r| r.category == category)
            .count()
    }

    /// Total number of failure records (excludes `Ignored`).
    pub fn failure_count(&self) -> usize {
        self.records
            .lock()
            .expect("error sink mutex poisoned")
            .iter()
            .filter(|r| r.category.is_failure())
            .count()
    }

    /// Returns a point-in-time copy of all records.
    pub fn snapshot(&self) -> ErrorSnapshot {
        ErrorSnapshot {
            records: self
                .records
                .lock()
                .expect("error sink mutex poisoned")
                .clone(),
        }
    }
}

impl ErrorSnapshot {
    /// Groups records by category, insertion order preserved within a group.
    pub fn by_category(&self) -> HashMap<ErrorCategory, Vec<&ErrorRecord>> {
        let mut groups: HashMap<ErrorCategory, Vec<&ErrorRecord>> = HashMap::new();
        for record in &self.records {
            groups.entry(record.category).or_default().push(record);
        }
        groups
    }

    /// Per-category counts for the summary line.
    pub fn counts(&self) -> HashMap<ErrorCategory, usize> {
        let mut counts = HashMap::new();
        for record in &self.records {
            *counts.entry(record.category).or_insert(0) += 1;
        }
        counts
    }
}
