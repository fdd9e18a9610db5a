// THEORY:
// The engine has exactly two ways to fail before it produces an image: the input
// file cannot be read (`Load`), or a buffer is asked to take a shape it cannot
// have (`Dimension`). Both are fatal for the invocation that hit them. The
// auxiliary writers (grayscale dump, bitmap output, PNG preview) add a third,
// `Encode`, which never occurs on the edge-detection path itself.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    /// The bitmap file could not be opened or ended before the declared pixel data.
    #[error("failed to load bitmap {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A buffer was constructed with a non-positive size, or two buffers feeding
    /// the same stage disagree on their shape.
    #[error("invalid buffer dimensions: {reason} ({width}x{height})")]
    Dimension {
        width: i64,
        height: i64,
        reason: &'static str,
    },

    /// An auxiliary output file could not be written.
    #[error("failed to write {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },
}

impl VisionError {
    pub(crate) fn dimension(width: i64, height: i64, reason: &'static str) -> Self {
        VisionError::Dimension {
            width,
            height,
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, VisionError>;
