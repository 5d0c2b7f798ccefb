//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image` crate (pure Rust decoders) |
//! | EXIF orientation | `image::ImageDecoder::orientation` |
//! | Rotate | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with configured quality |
//! | Encode → PNG, GIF | `DynamicImage::write_to` |
//!
//! Encoding never copies the source's EXIF block, so a rotated file comes back
//! without an orientation tag and a second normalization pass is a no-op.

use super::backend::{BackendError, ImageBackend};
use super::params::{Quality, RotateParams, Rotation};
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the decoder's orientation back to the EXIF value it was read from.
fn exif_value(orientation: Orientation) -> Option<u8> {
    match orientation {
        Orientation::FlipHorizontal => Some(2),
        Orientation::Rotate180 => Some(3),
        Orientation::FlipVertical => Some(4),
        Orientation::Rotate90FlipH => Some(5),
        Orientation::Rotate90 => Some(6),
        Orientation::Rotate270FlipH => Some(7),
        Orientation::Rotate270 => Some(8),
        _ => None,
    }
}

/// Format of a file, judged by its extension. The rewrite keeps it.
fn output_format(path: &Path) -> Result<ImageFormat, BackendError> {
    match ImageFormat::from_path(path) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif)) => Ok(format),
        _ => Err(BackendError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode an image in memory; the file on disk is only touched once this succeeds.
fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            rgb.write_with_encoder(encoder)
        }
        other => img.write_to(&mut Cursor::new(&mut buf), other),
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("Encode failed: {}", e)))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn read_orientation(&self, path: &Path) -> Result<Option<u8>, BackendError> {
        let mut decoder = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .into_decoder()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "Failed to open decoder for {}: {}",
                    path.display(),
                    e
                ))
            })?;
        let orientation = decoder.orientation().map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to read orientation of {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(exif_value(orientation))
    }

    fn rotate(&self, params: &RotateParams) -> Result<(), BackendError> {
        let format = output_format(&params.path)?;
        let img = load_image(&params.path)?;
        let rotated = match params.rotation {
            Rotation::Clockwise90 => img.rotate90(),
            Rotation::Half => img.rotate180(),
            Rotation::Clockwise270 => img.rotate270(),
        };
        let bytes = encode_image(&rotated, format, params.quality)?;
        std::fs::write(&params.path, bytes)?;
        debug!(
            path = %params.path.display(),
            width = rotated.width(),
            height = rotated.height(),
            "Rewrote rotated image"
        );
        Ok(())
    }
}
