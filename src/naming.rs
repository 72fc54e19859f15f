//! Output file naming and collision-safe writes.
//!
//! ## Names
//!
//! The stem is the original file's base name from the catalog, or the preview
//! identifier when the catalog could not help. With `include_size` the pixel
//! dimensions are appended when the JPEG header reveals them:
//! - `"sunset"`, no size → `sunset.jpg`
//! - `"sunset"`, 4000×3000 → `sunset_4000x3000.jpg`
//! - `"sunset"`, size requested but unreadable → `sunset.jpg`
//!
//! ## Collisions
//!
//! Existing files are never overwritten. Candidates are tried in order
//! (`sunset.jpg`, `sunset-1.jpg`, `sunset-2.jpg`, …):
//! - a candidate holding byte-identical content is reused without writing,
//!   so re-running an extraction is a no-op;
//! - a free candidate is claimed by persisting a fully written temp file with
//!   a no-clobber rename, so a concurrent worker racing for the same name
//!   loses cleanly and moves on to the next candidate.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::imaging::Dimensions;

/// Extension of every output file.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Candidates tried before giving up on a stem.
const MAX_CANDIDATES: usize = 1000;

/// Longest sanitized stem in bytes. Leaves room for `_WxH`, `-N` and the
/// extension under the common 255-byte file name limit.
pub const MAX_STEM_BYTES: usize = 200;

#[derive(Error, Debug)]
pub enum NamingError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no free output name for {stem}")]
    Exhausted { stem: String },
}

/// How [`write_output`] satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Written,
    /// An identical file was already present at the path.
    AlreadyPresent,
}

/// Replace characters that cannot appear in a file name on common platforms,
/// and cut the result to at most [`MAX_STEM_BYTES`] on a character boundary.
pub fn sanitize_stem(name: &str) -> String {
    let mut cleaned = String::new();
    for c in name.trim().chars() {
        let c = match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        if cleaned.len() + c.len_utf8() > MAX_STEM_BYTES {
            break;
        }
        cleaned.push(c);
    }
    // Lone dots would resolve to the directory itself or its parent.
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Output stem: sanitized base name plus an optional `_WxH` suffix.
pub fn output_stem(base: &str, dimensions: Option<Dimensions>, include_size: bool) -> String {
    let stem = sanitize_stem(base);
    match dimensions {
        Some(d) if include_size => format!("{}_{}x{}", stem, d.width, d.height),
        _ => stem,
    }
}

/// Output file name, e.g. `sunset.jpg` or `sunset_4000x3000.jpg`.
pub fn output_file_name(base: &str, dimensions: Option<Dimensions>, include_size: bool) -> String {
    format!(
        "{}.{}",
        output_stem(base, dimensions, include_size),
        OUTPUT_EXTENSION
    )
}

/// The `n`th candidate name for a stem: `stem.jpg`, `stem-1.jpg`, …
fn candidate_name(stem: &str, n: usize) -> String {
    if n == 0 {
        format!("{stem}.{OUTPUT_EXTENSION}")
    } else {
        format!("{stem}-{n}.{OUTPUT_EXTENSION}")
    }
}

/// Write `bytes` into `dir` under the first usable candidate for `stem`.
///
/// Returns the final path and whether bytes were written. Nothing is ever
/// left at a final path unless it holds the complete content.
pub fn write_output(
    dir: &Path,
    stem: &str,
    bytes: &[u8],
) -> Result<(PathBuf, WriteOutcome), NamingError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| NamingError::Io { path, source }
    };
    let digest = Sha256::digest(bytes);

    // Written once, persisted under whichever name ends up free.
    let mut staged: Option<NamedTempFile> = None;

    for n in 0..MAX_CANDIDATES {
        let target = dir.join(candidate_name(stem, n));

        if target.exists() {
            if same_content(&target, bytes.len(), &digest).map_err(io_err(&target))? {
                return Ok((target, WriteOutcome::AlreadyPresent));
            }
            continue;
        }

        let tmp = match staged.take() {
            Some(tmp) => tmp,
            None => {
                let mut tmp = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
                tmp.write_all(bytes).map_err(io_err(tmp.path()))?;
                tmp.as_file().sync_all().map_err(io_err(tmp.path()))?;
                tmp
            }
        };

        match tmp.persist_noclobber(&target) {
            Ok(_) => return Ok((target, WriteOutcome::Written)),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                // Another worker claimed this name first; re-check it next round.
                staged = Some(e.file);
                if same_content(&target, bytes.len(), &digest).map_err(io_err(&target))? {
                    return Ok((target, WriteOutcome::AlreadyPresent));
                }
            }
            Err(e) => return Err(io_err(&target)(e.error)),
        }
    }

    Err(NamingError::Exhausted {
        stem: stem.to_string(),
    })
}

fn same_content(path: &Path, len: usize, digest: &[u8]) -> io::Result<bool> {
    if std::fs::metadata(path)?.len() != len as u64 {
        return Ok(false);
    }
    let existing = std::fs::read(path)?;
    Ok(Sha256::digest(&existing).as_slice() == digest)
}
