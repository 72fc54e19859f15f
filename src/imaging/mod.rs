//! JPEG dimension probing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` (header only) |
//!
//! Only the frame header is read; pixel data is never decoded. Preview
//! levels that fail to parse simply have no known dimensions.

use image::{ImageFormat, ImageReader};
use serde::Serialize;
use std::io::Cursor;
use tracing::debug;

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Width and height from a JPEG byte stream, if its header parses.
pub fn jpeg_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    match ImageReader::with_format(Cursor::new(bytes), ImageFormat::Jpeg).into_dimensions() {
        Ok((width, height)) => Some(Dimensions { width, height }),
        Err(e) => {
            debug!("no dimensions for embedded image: {e}");
            None
        }
    }
}
