//! Single-file extraction pipeline.
//!
//! ```text
//! start → scanned → selected → (resolved | unresolved) → named → written
//!   └────────┴─────────┴──→ failed(reason)
//! ```
//!
//! The whole container is read into memory, the largest embedded JPEG is
//! sliced out of it, and the result is persisted atomically by
//! [`naming::write_output`]. Catalog problems only change the output name;
//! they are logged and recorded in [`ExtractionResult::name_source`] but
//! never fail the extraction.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info_span, warn};

use crate::catalog::{self, CatalogError};
use crate::container::{self, ContainerError};
use crate::imaging::{self, Dimensions};
use crate::naming::{self, NamingError, WriteOutcome};
use crate::types::PreviewFile;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Format(#[from] ContainerError),
    #[error(transparent)]
    Write(#[from] NamingError),
}

impl ExtractError {
    /// Short label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Format(_) => "format",
            ExtractError::Read { .. } | ExtractError::Write(_) => "io",
        }
    }
}

/// Per-run settings shared by every file.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Must already exist.
    pub output_dir: PathBuf,
    /// Lightroom catalog used to recover original file names.
    pub catalog: Option<PathBuf>,
    /// Append `_WxH` to output names when the JPEG header reveals it.
    pub include_size: bool,
}

/// Where the output name came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum NameSource {
    /// Resolved through the catalog; `original_dir` is the original folder.
    Catalog { original_dir: PathBuf },
    /// No catalog configured.
    Identifier,
    /// The catalog was consulted but could not name the file.
    Fallback { reason: String, detail: String },
}

/// Outcome of one successful extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub source: PathBuf,
    pub output_path: PathBuf,
    pub bytes_written: usize,
    pub name_source: NameSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    pub outcome: WriteOutcome,
}

impl ExtractionResult {
    /// True when the output is named after the catalog's original file.
    pub fn resolved_name(&self) -> bool {
        matches!(self.name_source, NameSource::Catalog { .. })
    }
}

/// Extract the largest embedded JPEG of `preview` into `options.output_dir`.
pub fn extract_preview(
    preview: &PreviewFile,
    options: &ExtractOptions,
) -> Result<ExtractionResult, ExtractError> {
    let _span = info_span!("extract", identifier = %preview.identifier).entered();

    let data = std::fs::read(&preview.path).map_err(|source| ExtractError::Read {
        path: preview.path.clone(),
        source,
    })?;

    let candidates = container::scan_container(&data);
    debug!(
        candidates = candidates.len(),
        bytes = data.len(),
        "scanned container"
    );
    let largest = container::select_largest(&candidates)?;
    let jpeg = largest.bytes(&data);
    debug!(offset = largest.offset, len = largest.len, "selected preview");

    let (base_name, name_source) = resolve_name(preview, options.catalog.as_deref());

    // Only probe when the name needs it.
    let dimensions = if options.include_size {
        imaging::jpeg_dimensions(jpeg)
    } else {
        None
    };
    let stem = naming::output_stem(&base_name, dimensions, options.include_size);
    let (output_path, outcome) = naming::write_output(&options.output_dir, &stem, jpeg)?;

    Ok(ExtractionResult {
        source: preview.path.clone(),
        output_path,
        bytes_written: jpeg.len(),
        name_source,
        dimensions,
        outcome,
    })
}

/// Base name for the output: the catalog's original name, else the identifier.
fn resolve_name(preview: &PreviewFile, catalog_path: Option<&Path>) -> (String, NameSource) {
    let Some(catalog_path) = catalog_path else {
        return (preview.identifier.clone(), NameSource::Identifier);
    };
    match catalog::resolve(catalog_path, &preview.identifier) {
        Ok(entry) => {
            let original_dir = entry.absolute_path();
            debug!(original = %original_dir.display(), base = %entry.base_name, "resolved");
            (entry.base_name, NameSource::Catalog { original_dir })
        }
        Err(e) => {
            if e.is_routine() {
                debug!("catalog lookup failed: {e}");
            } else {
                warn!("catalog lookup failed: {e}");
            }
            (preview.identifier.clone(), fallback_source(&e))
        }
    }
}

fn fallback_source(e: &CatalogError) -> NameSource {
    NameSource::Fallback {
        reason: e.kind().to_string(),
        detail: e.to_string(),
    }
}
