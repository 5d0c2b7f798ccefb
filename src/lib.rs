//! # Dossier
//!
//! Turns a folder of photos into a Word report. Your filesystem is the
//! outline: every directory becomes a heading, its photos become a featured
//! image plus a grid of thumbnails, and the template's table of contents picks
//! up the new headings.
//!
//! # Pipeline
//!
//! ```text
//! template.docx ─┐
//!                ├─ build ─→ report.docx ─→ toc refresh
//! photos/ ───────┘
//! ```
//!
//! For each directory, depth-first and in sorted order:
//!
//! 1. Heading at `min(depth, 5)`, titled with the directory name
//! 2. Each photo's EXIF orientation is fixed in place (rotate + re-encode)
//! 3. A two-column table: the first photo large on the left, the rest as
//!    thumbnails on the right, three per line
//! 4. A page break
//!
//! Directories without photos only contribute their heading. The document is
//! saved once, after the whole tree has been laid out.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Reads one directory: title, sorted photos, sorted subdirectories |
//! | [`imaging`] | EXIF orientation correction behind the [`imaging::ImageBackend`] trait |
//! | [`layout`] | Pure sizing math and the featured + thumbnail grid plan |
//! | [`document`] | [`document::DocumentWriter`] trait and the `docx-rs` writer |
//! | [`toc`] | Table-of-contents refresh after saving |
//! | [`build`] | The recursive tree-to-document traversal |
//! | [`config`] | `config.toml` loading, validation, and merging over stock defaults |
//! | [`output`] | CLI output formatting for build, check, and normalize |
//!
//! # Design Decisions
//!
//! ## Sorted Traversal
//!
//! Photos and subdirectories are sorted by name before use. Platforms list
//! directory entries in different orders; sorting makes the same tree produce
//! the same document everywhere.
//!
//! ## Orientation Is Fixed In The Source Files
//!
//! Word ignores EXIF orientation, so a portrait photo shot sideways would be
//! embedded sideways. Photos are rotated on disk before embedding. The rewrite
//! drops the EXIF block, so running a build twice never rotates twice.
//!
//! ## One Save, Atomically
//!
//! Content accumulates in memory and is written once at the end, through a
//! staging file renamed into place. A failed build leaves no output file.
//!
//! ## Table Of Contents On Open
//!
//! `docx-rs` cannot compute a TOC field. By default the saved package is
//! flagged with `updateFields`, so Word recomputes the table of contents when
//! the report is opened, and the body is closed with a continuous section
//! break. An external command (e.g. a LibreOffice macro) can be
//! configured instead.

pub mod build;
pub mod config;
pub mod document;
pub mod imaging;
pub mod layout;
pub mod output;
pub mod scan;
pub mod toc;

#[cfg(test)]
pub(crate) mod test_helpers;
