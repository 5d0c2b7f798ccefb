//! Section layout: heading levels and the featured + thumbnail grid.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! ## Sizing
//!
//! Every box is derived from the page height (defaults shown):
//!
//! ```text
//! page height          9 in
//! featured height      page × 0.8            = 7.2 in
//! featured width       featured h × 0.75     = 5.4 in
//! thumbnail height     featured h × 0.4      = 2.88 in
//! thumbnail width      thumbnail h × 0.75    = 2.16 in
//! left column          featured width
//! right column         5 in
//! ```
//!
//! ## Grid
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │              │ [#2]␣␣ [#3]␣␣ [#4]␣␣ ↵   │
//! │     #1       │ [#5]␣␣ [#6]␣␣            │
//! │  (featured)  │                          │
//! └──────────────┴──────────────────────────┘
//! ```
//!
//! Each thumbnail is followed by the separator; a line break follows every
//! third thumbnail, including the last one when the count divides evenly.

use crate::config::LayoutConfig;
use crate::document::{CellItem, ImageTable, PlacedImage, TableColumn};
use std::path::{Path, PathBuf};

/// English Metric Units per inch (DrawingML picture extents).
pub const EMU_PER_INCH: f64 = 914_400.0;
/// Twentieths of a point per inch (table grid widths).
pub const TWIPS_PER_INCH: f64 = 1_440.0;

/// A length in inches.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Inches(pub f64);

impl Inches {
    pub fn to_emu(self) -> u32 {
        (self.0 * EMU_PER_INCH).round() as u32
    }

    pub fn to_twips(self) -> usize {
        (self.0 * TWIPS_PER_INCH).round() as usize
    }

    /// Pixel count at `dpi`, never less than one.
    pub fn to_pixels(self, dpi: f64) -> u32 {
        ((self.0 * dpi).round() as u32).max(1)
    }
}

/// Width and height of an image box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSize {
    pub width: Inches,
    pub height: Inches,
}

impl BoxSize {
    /// Pixel dimensions of the box at `dpi`.
    pub fn pixels_at(self, dpi: f64) -> (u32, u32) {
        (self.width.to_pixels(dpi), self.height.to_pixels(dpi))
    }
}

/// Box sizes and grid settings for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMetrics {
    pub featured: BoxSize,
    pub thumbnail: BoxSize,
    pub left_column: Inches,
    pub right_column: Inches,
    pub thumbnails_per_row: usize,
    pub separator: String,
}

impl LayoutMetrics {
    pub fn from_config(config: &LayoutConfig) -> Self {
        let featured_height = config.page_height * config.featured_ratio;
        let featured_width = featured_height * config.aspect_ratio;
        let thumbnail_height = featured_height * config.thumbnail_ratio;
        let thumbnail_width = thumbnail_height * config.aspect_ratio;

        Self {
            featured: BoxSize {
                width: Inches(featured_width),
                height: Inches(featured_height),
            },
            thumbnail: BoxSize {
                width: Inches(thumbnail_width),
                height: Inches(thumbnail_height),
            },
            left_column: Inches(featured_width),
            right_column: Inches(config.right_column_width),
            thumbnails_per_row: config.thumbnails_per_row.max(1),
            separator: config.separator.clone(),
        }
    }
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

/// Heading level for a directory depth (root = 1), capped at `max_level`.
pub fn heading_level(depth: usize, max_level: u8) -> u8 {
    depth.clamp(1, max_level.max(1) as usize) as u8
}

/// Lay out one directory's images: `featured` alone in the left column, the
/// rest as a wrapped grid in the right column, in the order given.
pub fn plan_image_table(
    featured: &Path,
    thumbnails: &[PathBuf],
    metrics: &LayoutMetrics,
) -> ImageTable {
    let left = TableColumn {
        width: metrics.left_column,
        items: vec![CellItem::Image(PlacedImage {
            path: featured.to_path_buf(),
            size: metrics.featured,
        })],
    };

    let mut items = Vec::new();
    let mut col_count = 0;
    for thumbnail in thumbnails {
        items.push(CellItem::Image(PlacedImage {
            path: thumbnail.clone(),
            size: metrics.thumbnail,
        }));
        items.push(CellItem::Text(metrics.separator.clone()));
        col_count += 1;

        if col_count >= metrics.thumbnails_per_row {
            items.push(CellItem::LineBreak);
            col_count = 0;
        }
    }

    ImageTable {
        left,
        right: TableColumn {
            width: metrics.right_column,
            items,
        },
    }
}
