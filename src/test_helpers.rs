//! Shared test utilities for the lrprev-extract test suite.
//!
//! Builds synthetic inputs so tests never depend on real Lightroom data:
//! marker-framed fake JPEGs, real encoded JPEGs, preview containers wrapping
//! them, and a minimal catalog database.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let data = preview_container(&[fake_jpeg(100), real_jpeg(64, 48)]);
//! let preview = write_preview(tmp.path(), "abc123", &data);
//! let catalog = create_catalog(tmp.path(), &[("abc123", "/Users/me/Pictures/", "2024/", "sunset")]);
//! ```

use image::{ExtendedColorType, ImageEncoder, RgbImage};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

use crate::types::PreviewFile;

// =========================================================================
// Container bytes
// =========================================================================

/// `FF D8`, `payload` filler bytes, `FF D9`. Filler never contains `0xFF`.
pub fn fake_jpeg(payload: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload + 4);
    bytes.extend_from_slice(&[0xFF, 0xD8]);
    bytes.extend((0..payload).map(|i| (i % 0x7F) as u8));
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

/// A real baseline JPEG of the given size, decodable by the `image` crate.
pub fn real_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Wrap JPEG blocks the way Lightroom does: a header, then one metadata
/// block before each preview level, then a trailer.
pub fn preview_container(levels: &[Vec<u8>]) -> Vec<u8> {
    let mut data = b"AgHg\x00\x00\x00\x01header\x00\x00".to_vec();
    for (i, level) in levels.iter().enumerate() {
        data.extend_from_slice(format!("level_{}\x00\x00", i + 1).as_bytes());
        data.extend_from_slice(level);
    }
    data.extend_from_slice(b"\x00\x00trailer");
    data
}

/// Write container bytes to `<dir>/<stem>.lrprev`.
pub fn write_preview(dir: &Path, stem: &str, data: &[u8]) -> PreviewFile {
    let path = dir.join(format!("{stem}.lrprev"));
    std::fs::write(&path, data).unwrap();
    PreviewFile::from_path(&path).unwrap()
}

// =========================================================================
// Catalog
// =========================================================================

/// Create `<dir>/catalog.lrcat` with the three tables the resolver joins.
///
/// Each row is `(id_global, absolutePath, pathFromRoot, baseName)`; every
/// row gets its own root and folder.
pub fn create_catalog(dir: &Path, rows: &[(&str, &str, &str, &str)]) -> PathBuf {
    let path = dir.join("catalog.lrcat");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE AgLibraryRootFolder (
             id_local INTEGER PRIMARY KEY,
             absolutePath TEXT NOT NULL
         );
         CREATE TABLE AgLibraryFolder (
             id_local INTEGER PRIMARY KEY,
             rootFolder INTEGER NOT NULL,
             pathFromRoot TEXT NOT NULL
         );
         CREATE TABLE AgLibraryFile (
             id_local INTEGER PRIMARY KEY,
             id_global TEXT NOT NULL,
             folder INTEGER NOT NULL,
             baseName TEXT NOT NULL
         );",
    )
    .unwrap();
    for (i, (uuid, root, folder, base)) in rows.iter().enumerate() {
        let id = i as i64 + 1;
        conn.execute(
            "INSERT INTO AgLibraryRootFolder (id_local, absolutePath) VALUES (?1, ?2)",
            params![id, root],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO AgLibraryFolder (id_local, rootFolder, pathFromRoot) VALUES (?1, ?2, ?3)",
            params![id, id, folder],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO AgLibraryFile (id_local, id_global, folder, baseName) VALUES (?1, ?2, ?3, ?4)",
            params![id, uuid, id, base],
        )
        .unwrap();
    }
    path
}

/// Sorted file names in a directory.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
