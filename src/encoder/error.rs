//! Error types for page encoding.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling downloaded pages into a document.
///
/// Any of these leaves a previously existing output file untouched.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The chapter produced no pages to encode
    #[error("no pages to encode into {}", output.display())]
    NoPages {
        /// The document that would have been written
        output: PathBuf,
    },

    /// A page file could not be read, or the temporary output could not be written
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// The file involved
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A page file is corrupt or in an unsupported format
    #[error("cannot decode page {}: {source}", path.display())]
    Decode {
        /// The page file
        path: PathBuf,
        /// The underlying decoder error
        #[source]
        source: image::ImageError,
    },

    /// The finished document could not be moved into place
    #[error("cannot write document {}: {source}", path.display())]
    Persist {
        /// The destination document
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The encoding task stopped before finishing
    #[error("encoding interrupted: {reason}")]
    Interrupted {
        /// Why the task stopped
        reason: String,
    },
}

impl EncodeError {
    /// Creates an `Io` error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a `Decode` error.
    pub fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// Creates an `Interrupted` error.
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_no_pages_display() {
        let error = EncodeError::NoPages {
            output: PathBuf::from("/out/Chapters/chapter-1.pdf"),
        };
        assert_eq!(
            error.to_string(),
            "no pages to encode into /out/Chapters/chapter-1.pdf"
        );
    }

    #[test]
    fn test_encode_error_io_keeps_source() {
        use std::error::Error as _;

        let error = EncodeError::io(
            "/out/Images/chapter-1/001.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(error.to_string().contains("001.jpg"));
        assert!(error.source().is_some());
    }
}
