//! Human-readable run summary
//!
//! Prints the recap the operator actually reads: totals, per-category error
//! counts, and one line per failed item with enough context to re-run it.

use chansync_core::domain::ErrorCategory;
use chansync_engine::replicator::RunReport;

/// Categories in the order they appear in the summary.
const CATEGORY_ORDER: [ErrorCategory; 7] = [
    ErrorCategory::Connection,
    ErrorCategory::Authentication,
    ErrorCategory::DataFormat,
    ErrorCategory::AccessRights,
    ErrorCategory::Quota,
    ErrorCategory::File,
    ErrorCategory::ChunkIntegrity,
];

fn format_bytes(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes >= 1024 * 1024 {
        format!("{:.2} MiB", bytes as f64 / MIB)
    } else {
        format!("{bytes} B")
    }
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Prints the end-of-run summary to stdout.
pub fn print(report: &RunReport) {
    println!();
    println!("Transfer summary:");
    println!("  files uploaded:    {}", report.stats.files_uploaded);
    println!("  files ignored:     {}", report.stats.files_ignored);
    println!("  files failed:      {}", report.stats.files_failed);
    println!("  folders created:   {}", report.stats.folders_created);
    println!(
        "  bytes transferred: {}",
        format_bytes(report.stats.bytes_transferred)
    );
    println!("  duration:          {}", format_duration(report.duration_ms));

    for entry in &report.entries {
        if entry.aborted {
            println!(
                "  aborted entry:     group {}, channel {}",
                entry.group_id, entry.channel_id
            );
        }
    }

    let counts = report.errors.counts();
    let failures: Vec<_> = CATEGORY_ORDER
        .iter()
        .filter_map(|cat| counts.get(cat).map(|n| (*cat, *n)))
        .collect();

    if failures.is_empty() {
        return;
    }

    println!();
    println!("Errors by category:");
    for (category, count) in &failures {
        println!("  {}: {}", category.label(), count);
    }

    println!();
    println!("Failed items:");
    for record in &report.errors.records {
        if record.category.is_failure() {
            println!(
                "  [{}] {}: {}",
                record.category.label(),
                record.context,
                record.message
            );
        }
    }
}
