//! CLI output formatting.
//!
//! # Output Format
//!
//! ```text
//! Extracting 3 previews → recovered/
//! 001 IMG_0421.jpg (2.1 MB)
//!     Source: 3F2504E0-4F89-11D3-9A0C-0305E82C3301-9f8e.lrprev
//!     Original: Users/me/Pictures/2024/06/
//! 002 abc123.jpg (98.0 KB, unchanged)
//!     Source: abc123.lrprev
//!     Catalog: no catalog entry for abc123
//! 003 FAILED broken.lrprev
//!     Error: no embedded JPEG image found
//!
//! Extracted 2 of 3 previews (1 written, 1 unchanged, 1 named from catalog, 1 failed)
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` (or `String`) and is pure,
//! so output is unit-testable. `main` prints the lines from a printer thread
//! fed by the batch event channel; files are numbered in completion order.

use std::path::Path;

use crate::batch::{BatchEvent, BatchSummary, Failure};
use crate::extract::{ExtractionResult, NameSource};
use crate::naming::WriteOutcome;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable byte count: `512 B`, `98.0 KB`, `2.1 MB`.
pub fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Header printed before extraction starts.
pub fn format_start(total: usize, output_dir: &Path) -> String {
    let noun = if total == 1 { "preview" } else { "previews" };
    format!("Extracting {} {} → {}", total, noun, output_dir.display())
}

/// Lines for one extracted file.
pub fn format_extracted(index: usize, result: &ExtractionResult) -> Vec<String> {
    let mut detail = format_bytes(result.bytes_written);
    if result.outcome == WriteOutcome::AlreadyPresent {
        detail.push_str(", unchanged");
    }
    let mut lines = vec![format!(
        "{} {} ({})",
        format_index(index),
        file_name(&result.output_path),
        detail
    )];
    lines.push(format!("{}Source: {}", indent(1), file_name(&result.source)));
    match &result.name_source {
        NameSource::Catalog { original_dir } => {
            lines.push(format!("{}Original: {}", indent(1), original_dir.display()));
        }
        NameSource::Fallback { detail, .. } => {
            lines.push(format!("{}Catalog: {}", indent(1), detail));
        }
        NameSource::Identifier => {}
    }
    lines
}

/// Lines for one failed file.
pub fn format_failed(index: usize, failure: &Failure) -> Vec<String> {
    vec![
        format!("{} FAILED {}", format_index(index), file_name(&failure.source)),
        format!("{}Error: {}", indent(1), failure.detail),
    ]
}

/// Format one batch event. `index` is the 1-based count of finished files.
pub fn format_batch_event(index: usize, event: &BatchEvent, output_dir: &Path) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format_start(*total, output_dir)],
        BatchEvent::Extracted { result } => format_extracted(index, result),
        BatchEvent::Failed { failure } => format_failed(index, failure),
    }
}

/// One-line run summary.
pub fn format_summary(summary: &BatchSummary) -> String {
    if summary.total == 0 {
        return "No preview files found".to_string();
    }
    let extracted = summary.written + summary.already_present;
    let mut parts = vec![format!("{} written", summary.written)];
    if summary.already_present > 0 {
        parts.push(format!("{} unchanged", summary.already_present));
    }
    if summary.resolved > 0 {
        parts.push(format!("{} named from catalog", summary.resolved));
    }
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed));
    }
    format!(
        "Extracted {} of {} previews ({})",
        extracted,
        summary.total,
        parts.join(", ")
    )
}
