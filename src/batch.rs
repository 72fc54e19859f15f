//! Batch driver: input discovery, parallel extraction, run report.
//!
//! ## Setup vs. per-file failures
//!
//! Problems that make every file fail (missing input, an output directory
//! that cannot be created) are returned as [`BatchError`] before any work
//! starts. Everything after that is per-file: a failed preview, or a
//! directory entry the walk could not read, is recorded in the
//! [`BatchReport`] and the remaining files keep going.
//!
//! ## Parallel Processing
//!
//! Files are extracted on the global [rayon](https://docs.rs/rayon) pool.
//! Each worker opens its own catalog connection, and output names are claimed
//! with no-clobber renames, so workers share nothing mutable. Progress is
//! reported through an optional `mpsc` channel as files finish, in completion
//! order; the report itself lists files in discovery order.

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::extract::{self, ExtractOptions, ExtractionResult};
use crate::naming::WriteOutcome;
use crate::types::{ExtractRequest, PREVIEW_EXTENSION, PreviewFile};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("input path does not exist: {0}")]
    InputMissing(PathBuf),
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { total: usize },
    Extracted { result: ExtractionResult },
    Failed { failure: Failure },
}

/// One file that could not be extracted.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub source: PathBuf,
    /// `format` or `io`.
    pub kind: String,
    pub detail: String,
}

/// Per-file outcome in discovery order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileReport {
    Extracted(ExtractionResult),
    Failed(Failure),
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub written: usize,
    pub already_present: usize,
    /// Extracted files named after the catalog's original.
    pub resolved: usize,
    pub failed: usize,
}

impl BatchReport {
    fn from_files(files: Vec<FileReport>) -> Self {
        let mut summary = BatchSummary {
            total: files.len(),
            ..Default::default()
        };
        for file in &files {
            match file {
                FileReport::Extracted(r) => {
                    match r.outcome {
                        WriteOutcome::Written => summary.written += 1,
                        WriteOutcome::AlreadyPresent => summary.already_present += 1,
                    }
                    if r.resolved_name() {
                        summary.resolved += 1;
                    }
                }
                FileReport::Failed(_) => summary.failed += 1,
            }
        }
        Self { files, summary }
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.files.iter().filter_map(|f| match f {
            FileReport::Failed(failure) => Some(failure),
            FileReport::Extracted(_) => None,
        })
    }
}

/// Result of walking the input: the previews to extract, plus entries that
/// could not be read and count as failures.
#[derive(Debug, Default)]
pub struct Discovered {
    pub previews: Vec<PreviewFile>,
    pub failures: Vec<Failure>,
}

/// Preview files for an input path.
///
/// A file is taken as-is whatever its extension. A directory is walked
/// recursively for `*.lrprev` (any case), sorted by path. Unreadable entries
/// are recorded and skipped; only a missing input is fatal.
pub fn discover_previews(input: &Path) -> Result<Discovered, BatchError> {
    if !input.exists() {
        return Err(BatchError::InputMissing(input.to_path_buf()));
    }
    let mut found = Discovered::default();
    if !input.is_dir() {
        found.push(input);
        return Ok(found);
    }

    for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_preview(entry.path()) => {
                found.push(entry.path());
            }
            Ok(_) => {}
            Err(e) => {
                let source = e.path().unwrap_or(input).to_path_buf();
                warn!("skipping {}: {e}", source.display());
                found.failures.push(Failure {
                    source,
                    kind: "io".to_string(),
                    detail: e.to_string(),
                });
            }
        }
    }
    Ok(found)
}

impl Discovered {
    fn push(&mut self, path: &Path) {
        match PreviewFile::from_path(path) {
            Some(preview) => self.previews.push(preview),
            None => self.failures.push(Failure {
                source: path.to_path_buf(),
                kind: "io".to_string(),
                detail: "path has no file name".to_string(),
            }),
        }
    }
}

fn is_preview(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PREVIEW_EXTENSION))
}

/// Run a whole request: validate setup, discover inputs, extract in parallel.
pub fn run(
    request: &ExtractRequest,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    let Discovered { previews, failures } = discover_previews(&request.input)?;
    std::fs::create_dir_all(&request.output_dir).map_err(|source| BatchError::OutputDir {
        path: request.output_dir.clone(),
        source,
    })?;
    if let Some(catalog) = &request.catalog
        && !catalog.is_file()
    {
        warn!(
            "catalog {} not found; naming outputs by preview identifier",
            catalog.display()
        );
    }

    info!(
        files = previews.len(),
        unreadable = failures.len(),
        input = %request.input.display(),
        output = %request.output_dir.display(),
        "starting extraction"
    );

    let options = ExtractOptions {
        output_dir: request.output_dir.clone(),
        catalog: request.catalog.clone(),
        include_size: request.include_size,
    };
    let mut report = extract_all(&previews, &options, events.clone());
    if !failures.is_empty() {
        if let Some(tx) = &events {
            for failure in &failures {
                tx.send(BatchEvent::Failed {
                    failure: failure.clone(),
                })
                .ok();
            }
        }
        let mut files = report.files;
        files.extend(failures.into_iter().map(FileReport::Failed));
        report = BatchReport::from_files(files);
    }

    info!(
        written = report.summary.written,
        failed = report.summary.failed,
        "extraction finished"
    );
    Ok(report)
}

/// Extract every preview, continuing past per-file failures.
pub fn extract_all(
    previews: &[PreviewFile],
    options: &ExtractOptions,
    events: Option<Sender<BatchEvent>>,
) -> BatchReport {
    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            total: previews.len(),
        })
        .ok();
    }

    let files: Vec<FileReport> = previews
        .par_iter()
        .map_with(events, |events, preview| {
            let (file, event) = match extract::extract_preview(preview, options) {
                Ok(result) => (
                    FileReport::Extracted(result.clone()),
                    BatchEvent::Extracted { result },
                ),
                Err(e) => {
                    warn!("{}: {e}", preview.path.display());
                    let failure = Failure {
                        source: preview.path.clone(),
                        kind: e.kind().to_string(),
                        detail: e.to_string(),
                    };
                    (
                        FileReport::Failed(failure.clone()),
                        BatchEvent::Failed { failure },
                    )
                }
            };
            if let Some(tx) = events {
                tx.send(event).ok();
            }
            file
        })
        .collect();

    BatchReport::from_files(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn request(input: &Path, output: &Path) -> ExtractRequest {
        ExtractRequest {
            input: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            catalog: None,
            include_size: false,
        }
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    #[test]
    fn discovers_previews_recursively_in_order() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("Previews.lrdata/A/AB12");
        std::fs::create_dir_all(&nested).unwrap();
        write_preview(&nested, "zzz", b"x");
        write_preview(tmp.path(), "bbb", b"x");
        std::fs::write(tmp.path().join("aaa.LRPREV"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(tmp.path().join("root-pixels.db"), b"x").unwrap();

        let ids: Vec<String> = discover_previews(tmp.path())
            .unwrap()
            .previews
            .into_iter()
            .map(|p| p.identifier)
            .collect();
        assert_eq!(ids, vec!["zzz", "aaa", "bbb"]);
    }

    #[test]
    fn single_file_is_taken_regardless_of_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc123.bin");
        std::fs::write(&path, b"x").unwrap();

        let previews = discover_previews(&path).unwrap().previews;
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].identifier, "abc123");
    }

    #[test]
    fn missing_input_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = discover_previews(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, BatchError::InputMissing(_)), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entry_is_recorded_and_walk_continues() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir_all(input.join("sub")).unwrap();
        write_preview(&input, "aaa", &fake_jpeg(10));
        write_preview(&input.join("sub"), "zzz", &fake_jpeg(10));
        // A link back to an ancestor is reported by the walk as an error.
        std::os::unix::fs::symlink(&input, input.join("sub/loop")).unwrap();

        let found = discover_previews(&input).unwrap();

        let ids: Vec<&str> = found.previews.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "zzz"]);
        assert_eq!(found.failures.len(), 1);
        assert_eq!(found.failures[0].kind, "io");
        assert!(found.failures[0].source.ends_with("sub/loop"));
    }

    // =========================================================================
    // run
    // =========================================================================

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_name_is_still_extracted() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(OsStr::from_bytes(b"ab\xffc.lrprev"));
        std::fs::write(&path, fake_jpeg(10)).unwrap();
        let out = tmp.path().join("out");

        let report = run(&request(&path, &out), None).unwrap();

        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.written, 1);
        assert_eq!(dir_listing(&out), vec!["ab\u{FFFD}c.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_count_as_failures_without_stopping_the_run() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir_all(input.join("sub")).unwrap();
        write_preview(&input, "aaa", &fake_jpeg(10));
        std::os::unix::fs::symlink(&input, input.join("sub/loop")).unwrap();
        let out = tmp.path().join("out");

        let (tx, rx) = mpsc::channel();
        let report = run(&request(&input, &out), Some(tx)).unwrap();

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.written, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(dir_listing(&out), vec!["aaa.jpg"]);
        let failed = rx
            .iter()
            .filter(|e| matches!(e, BatchEvent::Failed { .. }))
            .count();
        assert_eq!(failed, 1);
    }

    #[test]
    fn run_creates_output_directory() {
        let tmp = TempDir::new().unwrap();
        let preview = write_preview(tmp.path(), "abc123", &fake_jpeg(10));
        let out = tmp.path().join("deep/out");

        let report = run(&request(&preview.path, &out), None).unwrap();

        assert_eq!(report.summary.written, 1);
        assert_eq!(dir_listing(&out), vec!["abc123.jpg"]);
    }

    #[test]
    fn uncreatable_output_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let preview = write_preview(tmp.path(), "abc123", &fake_jpeg(10));
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = run(&request(&preview.path, &blocker.join("out")), None).unwrap_err();
        assert!(matches!(err, BatchError::OutputDir { .. }), "got {err:?}");
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        write_preview(&input, "aaa", &fake_jpeg(10));
        write_preview(&input, "bbb", b"no jpeg in here");
        write_preview(&input, "ccc", &preview_container(&[fake_jpeg(5), fake_jpeg(50)]));
        let out = tmp.path().join("out");

        let report = run(&request(&input, &out), None).unwrap();

        assert_eq!(
            report.summary,
            BatchSummary {
                total: 3,
                written: 2,
                already_present: 0,
                resolved: 0,
                failed: 1,
            }
        );
        let failures: Vec<&Failure> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, "format");
        assert!(failures[0].source.ends_with("bbb.lrprev"));
        assert_eq!(dir_listing(&out), vec!["aaa.jpg", "ccc.jpg"]);
    }

    #[test]
    fn report_keeps_discovery_order() {
        let tmp = TempDir::new().unwrap();
        for id in ["d", "a", "c", "b"] {
            write_preview(tmp.path(), id, &fake_jpeg(id.len() * 10));
        }
        let out = tmp.path().join("out");

        let report = run(&request(tmp.path(), &out), None).unwrap();
        let sources: Vec<String> = report
            .files
            .iter()
            .map(|f| {
                let source = match f {
                    FileReport::Extracted(r) => &r.source,
                    FileReport::Failed(f) => &f.source,
                };
                source.file_name().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        assert_eq!(sources, vec!["a.lrprev", "b.lrprev", "c.lrprev", "d.lrprev"]);
    }

    #[test]
    fn second_run_reports_already_present() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        write_preview(&input, "aaa", &fake_jpeg(10));
        let out = tmp.path().join("out");

        run(&request(&input, &out), None).unwrap();
        let report = run(&request(&input, &out), None).unwrap();

        assert_eq!(report.summary.written, 0);
        assert_eq!(report.summary.already_present, 1);
        assert_eq!(dir_listing(&out), vec!["aaa.jpg"]);
    }

    #[test]
    fn catalog_resolution_is_counted() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        write_preview(&input, "aaa", &fake_jpeg(10));
        write_preview(&input, "bbb", &fake_jpeg(10));
        let catalog = create_catalog(tmp.path(), &[("aaa", "/p/", "", "sunset")]);
        let out = tmp.path().join("out");

        let req = ExtractRequest {
            catalog: Some(catalog),
            ..request(&input, &out)
        };
        let report = run(&req, None).unwrap();

        assert_eq!(report.summary.resolved, 1);
        assert_eq!(dir_listing(&out), vec!["bbb.jpg", "sunset.jpg"]);
    }

    #[test]
    fn events_cover_every_file() {
        let tmp = TempDir::new().unwrap();
        write_preview(tmp.path(), "aaa", &fake_jpeg(10));
        write_preview(tmp.path(), "bbb", b"nothing");
        let out = tmp.path().join("out");

        let (tx, rx) = mpsc::channel();
        run(&request(tmp.path(), &out), Some(tx)).unwrap();
        let events: Vec<BatchEvent> = rx.iter().collect();

        assert!(matches!(events[0], BatchEvent::Started { total: 2 }));
        let extracted = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Extracted { .. }))
            .count();
        let failed = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Failed { .. }))
            .count();
        assert_eq!((extracted, failed), (1, 1));
    }

    #[test]
    fn report_serializes_to_json() {
        let tmp = TempDir::new().unwrap();
        write_preview(tmp.path(), "aaa", &fake_jpeg(10));
        let out = tmp.path().join("out");

        let report = run(&request(tmp.path(), &out), None).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["summary"]["written"], 1);
        assert_eq!(json["files"][0]["status"], "extracted");
        assert_eq!(json["files"][0]["bytes_written"], 14);
        assert_eq!(json["files"][0]["name_source"]["source"], "identifier");
        assert_eq!(json["files"][0]["outcome"], "written");
    }
}
