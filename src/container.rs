//! Embedded JPEG discovery inside `.lrprev` preview containers.
//!
//! A preview container is an opaque blob: a Lightroom header, a few metadata
//! blocks, and one JPEG per cached preview level. The only structure relied
//! on here is the JPEG framing itself:
//!
//! ```text
//! ...header... FF D8 <level 1 jpeg> FF D9 ...meta... FF D8 <level 2 jpeg> FF D9 ...
//!              └──── candidate 0 ────┘               └──── candidate 1 ────┘
//! ```
//!
//! [`scan_container`] walks the buffer once and returns every marker-delimited
//! range; [`select_largest`] picks the one to keep. Neither touches pixel data.

use thiserror::Error;

/// JPEG start-of-image marker.
pub const SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker.
pub const EOI: [u8; 2] = [0xFF, 0xD9];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContainerError {
    #[error("no embedded JPEG image found")]
    NoEmbeddedImage,
}

/// One candidate JPEG inside a container, as a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// Offset of the `FF D8` start marker.
    pub offset: usize,
    /// Length in bytes, both markers included.
    pub len: usize,
}

impl EmbeddedImage {
    /// Offset one past the `FF D9` end marker.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Borrow this image's bytes out of the buffer it was scanned from.
    pub fn bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset..self.end()]
    }
}

/// Find every non-overlapping `FF D8 … FF D9` range in `data`, in order.
///
/// The end marker closing a candidate is the first `FF D9` after its start
/// marker; scanning resumes right after it. A start marker that is never
/// closed ends the scan, keeping whatever was found before it.
pub fn scan_container(data: &[u8]) -> Vec<EmbeddedImage> {
    let mut images = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_marker(data, pos, SOI) {
        let Some(end_marker) = find_marker(data, start + SOI.len(), EOI) else {
            break;
        };
        let end = end_marker + EOI.len();
        images.push(EmbeddedImage {
            offset: start,
            len: end - start,
        });
        pos = end;
    }

    images
}

/// Pick the candidate with the most bytes. Ties keep the earliest candidate.
pub fn select_largest(images: &[EmbeddedImage]) -> Result<EmbeddedImage, ContainerError> {
    let mut best: Option<EmbeddedImage> = None;
    for image in images {
        // Strictly greater: `Iterator::max_by_key` would keep the last tie.
        if best.is_none_or(|b| image.len > b.len) {
            best = Some(*image);
        }
    }
    best.ok_or(ContainerError::NoEmbeddedImage)
}

fn find_marker(data: &[u8], from: usize, marker: [u8; 2]) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|i| from + i)
}
