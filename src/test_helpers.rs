//! Shared test utilities for the dossier test suite.
//!
//! Provides synthetic image writers (including JPEGs carrying an EXIF
//! orientation tag) and a tree builder for photo directory fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! make_tree(tmp.path(), &["A/img2.png", "A/img1.jpg", "A/B/img3.jpg"]);
//! ```

use crate::imaging::orientation::ORIENTATION_TAG;
use image::{ImageEncoder, RgbImage};
use std::path::Path;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Create a small valid JPEG file with the given dimensions.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// Create a small valid PNG file with the given dimensions.
pub fn write_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// Create a small valid GIF file with the given dimensions.
pub fn write_gif(path: &Path, width: u32, height: u32) {
    image::DynamicImage::ImageRgb8(gradient(width, height))
        .save_with_format(path, image::ImageFormat::Gif)
        .unwrap();
}

/// APP1 segment holding a big-endian TIFF header and a single IFD entry:
/// Orientation (SHORT, count 1).
fn exif_orientation_segment(value: u8) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"Exif\0\0");
    payload.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    payload.extend_from_slice(&1u16.to_be_bytes());
    payload.extend_from_slice(&ORIENTATION_TAG.to_be_bytes());
    payload.extend_from_slice(&3u16.to_be_bytes());
    payload.extend_from_slice(&1u32.to_be_bytes());
    payload.extend_from_slice(&[0, value, 0, 0]);
    payload.extend_from_slice(&0u32.to_be_bytes());

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    segment.extend_from_slice(&payload);
    segment
}

/// Create a JPEG whose EXIF block carries the given orientation value.
pub fn write_jpeg_with_orientation(path: &Path, width: u32, height: u32, orientation: u8) {
    let jpeg = jpeg_bytes(width, height);
    // Insert right after SOI
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&exif_orientation_segment(orientation));
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}

/// Create files and directories under `root`.
///
/// Entries ending in `/` are directories. Files are real images chosen by
/// extension (`.jpg`/`.jpeg`, `.png`, `.gif`); anything else is written as
/// plain text.
pub fn make_tree(root: &Path, entries: &[&str]) {
    for entry in entries {
        let path = root.join(entry);
        if entry.ends_with('/') {
            std::fs::create_dir_all(&path).unwrap();
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => write_jpeg(&path, 24, 32),
            "png" => write_png(&path, 24, 32),
            "gif" => write_gif(&path, 24, 32),
            _ => std::fs::write(&path, "not an image").unwrap(),
        }
    }
}

/// File names of a list of paths, in order.
pub fn file_names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}
