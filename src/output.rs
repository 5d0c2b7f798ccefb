//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Sections are shown the way they read in the document: positional index
//! among siblings, title, and photo count, nested by depth. File names follow
//! as indented context lines.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! 001 Site visit (2 photos)
//!     Featured: 01-overview.jpg
//!     Thumbnails: 02-entrance.png
//!     001 Basement (1 photos)
//!         Featured: IMG_0001.JPG
//!     002 Roof
//!
//! 3 sections, 3 photos
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 Site visit (2 photos)
//!     01-overview.jpg: featured
//!     02-entrance.png: rotated 90°
//!     001 Basement (1 photos)
//!         IMG_0001.JPG: featured, orientation not fixed (corrupt metadata)
//!     002 Roof
//!
//! Table of contents: update-fields
//! Wrote report.docx: 3 sections, 3 photos
//! ```
//!
//! ## Normalize
//!
//! ```text
//! 001 side.jpg: rotated 270°
//! 002 upright.jpg: unchanged
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::build::{BuildReport, ImageReport, NormalizeOutcome, TocStatus};
use crate::scan::OutlineEntry;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title, with photo count when
/// the section has photos.
///
/// ```text
/// 001 Roof (5 photos)
/// 002 Gutters
/// ```
fn entity_header(index: usize, title: &str, count: usize) -> String {
    match count {
        0 => format!("{} {}", format_index(index), title),
        n => format!("{} {} ({} photos)", format_index(index), title, n),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Assigns 1-based positions among siblings while walking a depth-first list.
#[derive(Default)]
struct SiblingCounter {
    counts: Vec<usize>,
}

impl SiblingCounter {
    /// Position of the next entry at `depth` (root = 1).
    fn next(&mut self, depth: usize) -> usize {
        self.counts.truncate(depth);
        self.counts.resize(depth, 0);
        self.counts[depth - 1] += 1;
        self.counts[depth - 1]
    }
}

fn outcome_text(outcome: &NormalizeOutcome) -> Option<String> {
    match outcome {
        NormalizeOutcome::Upright => None,
        NormalizeOutcome::Rotated(rotation) => Some(format!("rotated {}", rotation)),
        NormalizeOutcome::Failed(error) => Some(format!("orientation not fixed ({})", error)),
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the outline of a photo tree as the document would lay it out.
pub fn format_outline(entries: &[OutlineEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut siblings = SiblingCounter::default();

    for entry in entries {
        let depth = entry.depth.max(1);
        let position = siblings.next(depth);
        let pad = indent(depth - 1);
        lines.push(format!(
            "{}{}",
            pad,
            entity_header(position, &entry.name, entry.images.len())
        ));

        if let Some((featured, thumbnails)) = entry.images.split_first() {
            lines.push(format!("{}    Featured: {}", pad, featured));
            if !thumbnails.is_empty() {
                lines.push(format!("{}    Thumbnails: {}", pad, thumbnails.join(", ")));
            }
        }
    }

    let photos: usize = entries.iter().map(|e| e.images.len()).sum();
    lines.push(String::new());
    lines.push(format!("{} sections, {} photos", entries.len(), photos));
    lines
}

pub fn print_outline(entries: &[OutlineEntry]) {
    for line in format_outline(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

fn image_status_line(pad: &str, image: &ImageReport, featured: bool) -> String {
    let mut notes = Vec::new();
    if featured {
        notes.push("featured".to_string());
    }
    notes.extend(outcome_text(&image.outcome));

    let name = file_name(&image.path);
    if notes.is_empty() {
        format!("{}    {}", pad, name)
    } else {
        format!("{}    {}: {}", pad, name, notes.join(", "))
    }
}

/// Format the result of a build: every section with per-image notes, then the
/// table-of-contents status and totals.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    let mut siblings = SiblingCounter::default();

    for section in &report.sections {
        let depth = section.depth.max(1);
        let position = siblings.next(depth);
        let pad = indent(depth - 1);
        lines.push(format!(
            "{}{}",
            pad,
            entity_header(position, &section.title, section.image_count())
        ));

        if let Some(featured) = &section.featured {
            lines.push(image_status_line(&pad, featured, true));
        }
        for thumbnail in &section.thumbnails {
            lines.push(image_status_line(&pad, thumbnail, false));
        }
    }

    lines.push(String::new());
    lines.push(match &report.toc {
        TocStatus::Refreshed { method } => format!("Table of contents: {}", method),
        TocStatus::Failed { method, error } => {
            format!("Table of contents: {} failed ({})", method, error)
        }
    });
    lines.push(format!(
        "Wrote {}: {} sections, {} photos",
        report.output.display(),
        report.sections.len(),
        report.image_count()
    ));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Normalize output
// ============================================================================

/// Format the outcome of the `normalize` command, one line per file.
pub fn format_normalize(results: &[(PathBuf, NormalizeOutcome)]) -> Vec<String> {
    results
        .iter()
        .enumerate()
        .map(|(i, (path, outcome))| {
            let status = outcome_text(outcome).unwrap_or_else(|| "unchanged".to_string());
            format!("{} {}: {}", format_index(i + 1), path.display(), status)
        })
        .collect()
}

pub fn print_normalize(results: &[(PathBuf, NormalizeOutcome)]) {
    for line in format_normalize(results) {
        println!("{}", line);
    }
}
