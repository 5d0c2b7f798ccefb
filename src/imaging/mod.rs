//! Image orientation normalization in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **EXIF orientation** | `image::ImageDecoder::orientation` |
//! | **Rotate in place** | `rotate90` / `rotate180` / `rotate270` + re-encode |
//!
//! The module is split into:
//! - **Orientation**: Pure EXIF value → rotation mapping (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`normalize`], combining the mapping with the backend

pub mod backend;
mod operations;
pub mod orientation;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use operations::{Normalized, normalize};
pub use params::{Quality, RotateParams, Rotation};
pub use rust_backend::RustBackend;
