//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations orientation
//! normalization needs: read the EXIF orientation, and rotate a file in place.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust, built on the
//! `image` crate.

use super::params::RotateParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Trait for image processing backends.
pub trait ImageBackend {
    /// Raw EXIF orientation value (1–8), or `None` when the image carries no
    /// orientation or is already upright.
    fn read_orientation(&self, path: &Path) -> Result<Option<u8>, BackendError>;

    /// Rotate the pixel data and overwrite the file in its own format.
    ///
    /// The rewritten file must not carry an orientation tag.
    fn rotate(&self, params: &RotateParams) -> Result<(), BackendError>;
}
