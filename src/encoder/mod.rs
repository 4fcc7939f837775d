//! Page encoders: assembling a chapter's ordered page images into one document.
//!
//! [`PageEncoder`] is synchronous and CPU-bound; async callers run it on the
//! blocking pool. [`PdfEncoder`] is the bundled implementation.

mod error;
mod pdf;

pub use error::EncodeError;
pub use pdf::PdfEncoder;

use std::path::{Path, PathBuf};

/// Converts ordered page images into a single document.
pub trait PageEncoder: Send + Sync {
    /// File extension of produced documents, without the dot.
    fn extension(&self) -> &'static str;

    /// Writes `pages`, in the given order, to `output`.
    ///
    /// On failure an existing file at `output` must be left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] for empty input, unreadable or undecodable
    /// pages, and write failures.
    fn encode(&self, pages: &[PathBuf], output: &Path) -> Result<(), EncodeError>;
}
