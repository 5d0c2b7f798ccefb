//! High-level image operations.
//!
//! These functions combine the orientation mapping with backend execution.

use super::backend::{BackendError, ImageBackend};
use super::orientation::rotation_for_orientation;
use super::params::{Quality, RotateParams, Rotation};
use std::path::Path;
use tracing::{debug, instrument};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Outcome of a successful normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// `None` when the file was already upright and left alone.
    pub rotation: Option<Rotation>,
}

/// Rewrite an image in place so its pixels match its intended orientation.
///
/// Files without an orientation tag, or with a tag that needs no pure
/// rotation, are not touched. After a rotation the file no longer carries the
/// tag, so normalizing twice is the same as normalizing once.
///
/// Errors leave the file as it was; callers embed it unmodified.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn normalize(backend: &impl ImageBackend, path: &Path, quality: Quality) -> Result<Normalized> {
    let orientation = backend.read_orientation(path)?;
    let rotation = orientation.and_then(rotation_for_orientation);

    if let Some(rotation) = rotation {
        debug!(?orientation, %rotation, "Correcting orientation");
        backend.rotate(&RotateParams {
            path: path.to_path_buf(),
            rotation,
            quality,
        })?;
    }

    Ok(Normalized { rotation })
}
