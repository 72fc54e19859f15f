//! Shared types passed between the CLI, the batch driver, and the pipeline.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// File extension of Lightroom preview containers.
pub const PREVIEW_EXTENSION: &str = "lrprev";

/// One preview container on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewFile {
    pub path: PathBuf,
    /// Catalog key and fallback output name, derived from the file stem.
    pub identifier: String,
}

impl PreviewFile {
    /// Build from a path, deriving the identifier from its stem.
    ///
    /// Stems that are not valid UTF-8 are converted lossily; the output
    /// namer sanitizes whatever comes out. Returns `None` only when the path
    /// has no file name at all.
    pub fn from_path(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_string_lossy();
        if stem.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            identifier: identifier_from_stem(&stem).to_string(),
        })
    }
}

/// Lightroom names previews `<UUID>-<digest>.lrprev`; the UUID is what the
/// catalog stores as `id_global`. Stems without a leading UUID are used as-is.
///
/// - `"3F2504E0-4F89-11D3-9A0C-0305E82C3301-a1b2c3"` → `"3F2504E0-4F89-11D3-9A0C-0305E82C3301"`
/// - `"abc123"` → `"abc123"`
pub fn identifier_from_stem(stem: &str) -> &str {
    match stem.get(..UUID_LEN) {
        Some(prefix) if is_uuid(prefix) && stem[UUID_LEN..].starts_with('-') => prefix,
        _ => stem,
    }
}

const UUID_LEN: usize = 36;

fn is_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Everything one extraction run needs, assembled once by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// A single preview file, or a directory searched recursively.
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub catalog: Option<PathBuf>,
    pub include_size: bool,
}
