use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectError>;

/// Failures while reading or writing a project file.
/// None of them are fatal, the canvas is left as it was.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed project file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u64, height: u64 },

    #[error("layer {layer} has unreadable content: {source}")]
    InvalidContent {
        layer: usize,
        #[source]
        source: ContentError,
    },

    #[error("cannot encode layer content: {0}")]
    Encode(#[from] image::ImageError),
}

/// Failures while decoding the pixel content of a single layer.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("not base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("not a png image: {0}")]
    Image(#[from] image::ImageError),

    #[error("expected {expected:?} pixels, found {found:?}")]
    SizeMismatch { expected: [usize; 2], found: [usize; 2] },
}
