//! # lrprev-extract
//!
//! Recovers full-size JPEG previews from Lightroom `.lrprev` preview files,
//! optionally naming each one after its original photo by looking it up in
//! the Lightroom catalog. Useful when the originals are gone and only the
//! catalog's preview cache survived.
//!
//! # Pipeline
//!
//! Every preview file goes through the same steps, independently of all
//! others:
//!
//! ```text
//! .lrprev ─▶ scan ─▶ select largest ─▶ catalog lookup? ─▶ name ─▶ atomic write
//!            (container)                 (catalog)        (naming)
//! ```
//!
//! - **Scan** finds every `FF D8 … FF D9` range in the container.
//! - **Select** keeps the longest range; ties go to the first.
//! - **Lookup** maps the preview's UUID to the original base name and folder.
//!   Any catalog problem degrades to naming by UUID; it never fails a file.
//! - **Write** never overwrites. Identical content is reused, anything else
//!   gets a `-N` suffix.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`container`] | Embedded JPEG scanning and largest-image selection |
//! | [`catalog`] | Read-only three-table join against the `.lrcat` SQLite catalog |
//! | [`naming`] | Output names, size suffix, collision-safe atomic writes |
//! | [`imaging`] | Header-only JPEG dimension probing |
//! | [`extract`] | Single-file pipeline and its result/error types |
//! | [`batch`] | Input discovery, parallel extraction, run report |
//! | [`config`] | `lrprev-extract.toml` loading, merging, and validation |
//! | [`types`] | `PreviewFile` and the `ExtractRequest` built by the CLI |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Byte Length Decides "Largest"
//!
//! Lightroom stores each preview level as a standalone JPEG, and higher
//! levels are both larger in pixels and in bytes. Comparing byte lengths
//! needs no decoding and is a pure function of the container bytes, so the
//! same input always yields the same output.
//!
//! ## Never Overwrite
//!
//! Different photos routinely share a base name (`IMG_0001` from two
//! cameras). Output names are claimed with a no-clobber rename of a fully
//! written temp file, so parallel workers cannot clobber each other and an
//! interrupted run never leaves a truncated JPEG behind.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod container;
pub mod extract;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
