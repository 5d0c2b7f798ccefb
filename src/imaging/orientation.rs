//! EXIF orientation → rotation mapping.
//!
//! Only the three pure-rotation values are corrected. The mirrored variants
//! (2, 4, 5, 7) are left untouched, as is anything out of range.
//!
//! | EXIF value | Meaning | Correction |
//! |---|---|---|
//! | 1 | upright | none |
//! | 3 | upside down | 180° |
//! | 6 | rotated 90° counter-clockwise | 90° clockwise |
//! | 8 | rotated 90° clockwise | 270° clockwise |

use super::params::Rotation;

/// EXIF tag 0x0112.
pub const ORIENTATION_TAG: u16 = 0x0112;

/// Rotation needed to display an image upright, given its EXIF orientation.
pub fn rotation_for_orientation(value: u8) -> Option<Rotation> {
    match value {
        3 => Some(Rotation::Half),
        6 => Some(Rotation::Clockwise90),
        8 => Some(Rotation::Clockwise270),
        _ => None,
    }
}
