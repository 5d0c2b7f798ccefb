//! Document assembly.
//!
//! The builder talks to a [`DocumentWriter`]: headings, a two-column image
//! table per directory, page breaks, and a single save at the end. The
//! production writer, [`DocxWriter`], appends to a Word template loaded with
//! `docx-rs`; tests use the recording writer in [`tests`].
//!
//! ## Image table
//!
//! ```text
//! ┌─ left column ──┬─ right column ─────────────┐
//! │ featured image │ thumb␣␣ thumb␣␣ thumb␣␣ ↵  │
//! │                │ thumb␣␣                    │
//! └────────────────┴────────────────────────────┘
//! ```
//!
//! Each column is a single cell holding one paragraph. Items become runs in
//! that paragraph: pictures, text, or a text-wrapping break.
//!
//! ## Saving
//!
//! The package is written to a hidden staging file next to the target and
//! renamed into place, so a failed build never leaves a partial document.

use crate::config::DocumentConfig;
use crate::layout::{BoxSize, Inches};
use docx_rs::{
    BreakType, Docx, Paragraph, Pic, Run, Table, TableCell, TableLayoutType, TableRow, WidthType,
};
use image::ImageFormat;
use image::imageops::FilterType;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Cannot read template {path}: {message}")]
    Template { path: PathBuf, message: String },
    #[error("Cannot embed image {path}: {message}")]
    Image { path: PathBuf, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write document package: {0}")]
    Package(String),
    #[error("Document was already saved")]
    Closed,
}

/// An image placed at a fixed box size.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    pub path: PathBuf,
    pub size: BoxSize,
}

/// One run inside a table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellItem {
    Image(PlacedImage),
    Text(String),
    LineBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub width: Inches,
    pub items: Vec<CellItem>,
}

/// A one-row, two-column table: featured image left, thumbnails right.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTable {
    pub left: TableColumn,
    pub right: TableColumn,
}

/// Sink for document content, in reading order.
pub trait DocumentWriter {
    /// Append a heading paragraph at `level` (1 = top).
    fn add_heading(&mut self, text: &str, level: u8) -> Result<(), DocumentError>;

    fn add_image_table(&mut self, table: &ImageTable) -> Result<(), DocumentError>;

    fn add_page_break(&mut self) -> Result<(), DocumentError>;

    /// Write the finished document. Called once; later calls fail.
    fn save(&mut self, path: &Path) -> Result<(), DocumentError>;
}

/// Writes `.docx` files on top of a Word template.
pub struct DocxWriter {
    docx: Option<Docx>,
    document: DocumentConfig,
}

impl DocxWriter {
    /// Load `template` and prepare to append after its existing content.
    pub fn from_template(template: &Path, document: &DocumentConfig) -> Result<Self, DocumentError> {
        let template_error = |message: String| DocumentError::Template {
            path: template.to_path_buf(),
            message,
        };
        let bytes = fs::read(template).map_err(|e| template_error(e.to_string()))?;
        let docx = docx_rs::read_docx(&bytes).map_err(|e| template_error(e.to_string()))?;

        Ok(Self {
            docx: Some(docx),
            document: document.clone(),
        })
    }

    fn update(&mut self, f: impl FnOnce(Docx) -> Docx) -> Result<(), DocumentError> {
        let docx = self.docx.take().ok_or(DocumentError::Closed)?;
        self.docx = Some(f(docx));
        Ok(())
    }
}

impl DocumentWriter for DocxWriter {
    fn add_heading(&mut self, text: &str, level: u8) -> Result<(), DocumentError> {
        let style = self.document.heading_style_id(level);
        let paragraph = Paragraph::new()
            .add_run(Run::new().add_text(text))
            .style(&style);
        self.update(|docx| docx.add_paragraph(paragraph))
    }

    fn add_image_table(&mut self, table: &ImageTable) -> Result<(), DocumentError> {
        let left = column_cell(&table.left)?;
        let right = column_cell(&table.right)?;
        let grid = vec![table.left.width.to_twips(), table.right.width.to_twips()];

        let table = Table::new(vec![TableRow::new(vec![left, right])])
            .set_grid(grid)
            .layout(TableLayoutType::Fixed);
        self.update(|docx| docx.add_table(table))
    }

    fn add_page_break(&mut self) -> Result<(), DocumentError> {
        let paragraph = Paragraph::new().add_run(Run::new().add_break(BreakType::Page));
        self.update(|docx| docx.add_paragraph(paragraph))
    }

    fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
        let docx = self.docx.take().ok_or(DocumentError::Closed)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = staging_path(path);
        let written = fs::File::create(&staging).map_err(DocumentError::from).and_then(|file| {
            docx.build()
                .pack(file)
                .map_err(|e| DocumentError::Package(e.to_string()))
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }

        debug!(path = %path.display(), "Saved document");
        Ok(())
    }
}

/// Hidden sibling of `path` used while the package is being written.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.docx".to_string());
    path.with_file_name(format!(".{name}.partial"))
}

fn column_cell(column: &TableColumn) -> Result<TableCell, DocumentError> {
    let mut paragraph = Paragraph::new();
    for item in &column.items {
        let run = match item {
            CellItem::Image(image) => Run::new().add_image(picture(image)?),
            CellItem::Text(text) => Run::new().add_text(text.as_str()),
            CellItem::LineBreak => Run::new().add_break(BreakType::TextWrapping),
        };
        paragraph = paragraph.add_run(run);
    }
    Ok(TableCell::new()
        .add_paragraph(paragraph)
        .width(column.width.to_twips(), WidthType::Dxa))
}

/// Resolution pictures are embedded at. Sources larger than their box at
/// this density are downsampled; smaller ones are kept as they are.
pub const EMBED_DPI: f64 = 150.0;

/// Decode an image and wrap it as a PNG picture sized to its box.
///
/// `docx-rs` stores every picture as PNG, so a camera JPEG embedded at full
/// resolution would inflate the package many times over.
fn picture(image: &PlacedImage) -> Result<Pic, DocumentError> {
    let image_error = |message: String| DocumentError::Image {
        path: image.path.clone(),
        message,
    };
    let bytes = fs::read(&image.path).map_err(|e| image_error(e.to_string()))?;
    let mut decoded = image::load_from_memory(&bytes).map_err(|e| image_error(e.to_string()))?;

    let (max_width, max_height) = image.size.pixels_at(EMBED_DPI);
    if decoded.width() > max_width || decoded.height() > max_height {
        debug!(
            path = %image.path.display(),
            from = ?(decoded.width(), decoded.height()),
            to = ?(max_width, max_height),
            "Downsampling picture"
        );
        decoded = decoded.resize(max_width, max_height, FilterType::Lanczos3);
    }

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| image_error(e.to_string()))?;

    Ok(
        Pic::new_with_dimensions(png, decoded.width(), decoded.height())
            .size(image.size.width.to_emu(), image.size.height.to_emu()),
    )
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// One call received by a [`RecordingWriter`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum WriterOp {
        Heading { text: String, level: u8 },
        Table(ImageTable),
        PageBreak,
        Save(PathBuf),
    }

    /// Writer that records calls instead of producing a file.
    #[derive(Default)]
    pub struct RecordingWriter {
        pub ops: Vec<WriterOp>,
        fail_save: bool,
    }

    impl RecordingWriter {
        pub fn new() -> Self {
            Self::default()
        }

        /// A writer whose `save` always fails.
        pub fn failing_save() -> Self {
            Self {
                fail_save: true,
                ..Self::default()
            }
        }

        pub fn get_ops(&self) -> Vec<WriterOp> {
            self.ops.clone()
        }

        /// Compact form of the recorded ops for order assertions:
        /// `H1:A`, `T:img1.jpg|img2.png`, `PB`, `SAVE`.
        pub fn outline(&self) -> Vec<String> {
            self.get_ops()
                .iter()
                .map(|op| match op {
                    WriterOp::Heading { text, level } => format!("H{level}:{text}"),
                    WriterOp::Table(table) => {
                        let names = |column: &TableColumn| {
                            column
                                .items
                                .iter()
                                .filter_map(|item| match item {
                                    CellItem::Image(img) => Some(
                                        img.path.file_name().unwrap().to_string_lossy().to_string(),
                                    ),
                                    _ => None,
                                })
                                .collect::<Vec<_>>()
                                .join(",")
                        };
                        format!("T:{}|{}", names(&table.left), names(&table.right))
                    }
                    WriterOp::PageBreak => "PB".to_string(),
                    WriterOp::Save(_) => "SAVE".to_string(),
                })
                .collect()
        }

        fn record(&mut self, op: WriterOp) {
            self.ops.push(op);
        }
    }

    impl DocumentWriter for RecordingWriter {
        fn add_heading(&mut self, text: &str, level: u8) -> Result<(), DocumentError> {
            self.record(WriterOp::Heading {
                text: text.to_string(),
                level,
            });
            Ok(())
        }

        fn add_image_table(&mut self, table: &ImageTable) -> Result<(), DocumentError> {
            self.record(WriterOp::Table(table.clone()));
            Ok(())
        }

        fn add_page_break(&mut self) -> Result<(), DocumentError> {
            self.record(WriterOp::PageBreak);
            Ok(())
        }

        fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
            if self.fail_save {
                return Err(DocumentError::Package("simulated failure".into()));
            }
            self.record(WriterOp::Save(path.to_path_buf()));
            Ok(())
        }
    }

    // =========================================================================
    // DocxWriter tests
    // =========================================================================

    use crate::layout::{LayoutMetrics, plan_image_table};
    use crate::test_helpers::{write_jpeg, write_png};
    use std::io::Read;
    use tempfile::TempDir;

    fn document_xml(path: &Path) -> String {
        let file = fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry = archive.by_name("word/document.xml").unwrap();
        let mut xml = String::new();
        entry.read_to_string(&mut xml).unwrap();
        xml
    }

    fn blank_writer(document: &DocumentConfig) -> DocxWriter {
        DocxWriter {
            docx: Some(Docx::new()),
            document: document.clone(),
        }
    }

    fn media_dimensions(path: &Path) -> Vec<(u32, u32)> {
        let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        let names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("word/media/"))
            .map(String::from)
            .collect();
        let mut dims: Vec<(u32, u32)> = names
            .iter()
            .map(|name| {
                let mut bytes = Vec::new();
                archive.by_name(name).unwrap().read_to_end(&mut bytes).unwrap();
                let img = image::load_from_memory(&bytes).unwrap();
                (img.width(), img.height())
            })
            .collect();
        dims.sort();
        dims
    }

    fn write_template(path: &Path) {
        let file = fs::File::create(path).unwrap();
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Cover page")))
            .build()
            .pack(file)
            .unwrap();
    }

    #[test]
    fn heading_uses_configured_style() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.docx");
        let config = DocumentConfig {
            heading_style: "Titre{level}".into(),
            ..DocumentConfig::default()
        };

        let mut writer = blank_writer(&config);
        writer.add_heading("Roof", 2).unwrap();
        writer.save(&out).unwrap();

        let xml = document_xml(&out);
        assert!(xml.contains("Roof"));
        assert!(xml.contains(r#"<w:pStyle w:val="Titre2" />"#) || xml.contains(r#"w:val="Titre2""#));
    }

    #[test]
    fn template_content_is_kept() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("template.docx");
        let out = tmp.path().join("out.docx");
        write_template(&template);

        let mut writer = DocxWriter::from_template(&template, &DocumentConfig::default()).unwrap();
        writer.add_heading("Site", 1).unwrap();
        writer.save(&out).unwrap();

        let xml = document_xml(&out);
        let cover = xml.find("Cover page").unwrap();
        let heading = xml.find("Site").unwrap();
        assert!(cover < heading);
    }

    #[test]
    fn missing_template_is_template_error() {
        let tmp = TempDir::new().unwrap();
        let result = DocxWriter::from_template(&tmp.path().join("none.docx"), &DocumentConfig::default());
        assert!(matches!(result, Err(DocumentError::Template { .. })));
    }

    #[test]
    fn non_docx_template_is_template_error() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("notes.docx");
        fs::write(&template, "plain text").unwrap();
        let result = DocxWriter::from_template(&template, &DocumentConfig::default());
        assert!(matches!(result, Err(DocumentError::Template { .. })));
    }

    #[test]
    fn image_table_embeds_every_picture() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.png");
        let c = tmp.path().join("c.jpg");
        write_jpeg(&a, 24, 32);
        write_png(&b, 24, 32);
        write_jpeg(&c, 24, 32);
        let out = tmp.path().join("out.docx");

        let table = plan_image_table(&a, &[b, c], &LayoutMetrics::default());
        let mut writer = blank_writer(&DocumentConfig::default());
        writer.add_image_table(&table).unwrap();
        writer.add_page_break().unwrap();
        writer.save(&out).unwrap();

        let xml = document_xml(&out);
        assert_eq!(xml.matches("</w:drawing>").count(), 3);
        assert_eq!(xml.matches("<w:tbl>").count(), 1);
        assert!(xml.contains(r#"w:type="page""#));
        // Featured extent: 5.4 in x 7.2 in
        assert!(xml.contains(r#"cx="4937760""#));
        assert!(xml.contains(r#"cy="6583680""#));
    }

    #[test]
    fn unreadable_image_fails_table() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.jpg");
        fs::write(&bad, "not an image").unwrap();

        let table = plan_image_table(&bad, &[], &LayoutMetrics::default());
        let mut writer = blank_writer(&DocumentConfig::default());
        let result = writer.add_image_table(&table);
        assert!(matches!(result, Err(DocumentError::Image { .. })));
    }

    #[test]
    fn save_creates_parent_and_leaves_no_staging_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("reports").join("site.docx");

        let mut writer = blank_writer(&DocumentConfig::default());
        writer.add_heading("Site", 1).unwrap();
        writer.save(&out).unwrap();

        assert!(out.is_file());
        let names: Vec<String> = fs::read_dir(out.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["site.docx"]);
    }

    #[test]
    fn failed_rename_removes_staging_file() {
        let tmp = TempDir::new().unwrap();
        // A directory already sits where the report should go
        let out = tmp.path().join("site.docx");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("keep.txt"), "x").unwrap();

        let mut writer = blank_writer(&DocumentConfig::default());
        writer.add_heading("Site", 1).unwrap();
        let result = writer.save(&out);

        assert!(matches!(result, Err(DocumentError::Io(_))));
        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["site.docx"]);
        assert!(out.join("keep.txt").is_file());
    }

    #[test]
    fn large_pictures_are_downsampled_to_their_box() {
        let tmp = TempDir::new().unwrap();
        let featured = tmp.path().join("featured.jpg");
        let thumb = tmp.path().join("thumb.jpg");
        let small = tmp.path().join("small.png");
        write_jpeg(&featured, 1200, 1600);
        write_jpeg(&thumb, 1200, 1600);
        write_png(&small, 24, 32);
        let out = tmp.path().join("out.docx");

        let table = plan_image_table(&featured, &[thumb, small], &LayoutMetrics::default());
        let mut writer = blank_writer(&DocumentConfig::default());
        writer.add_image_table(&table).unwrap();
        writer.save(&out).unwrap();

        // Featured box at 150 dpi is 810 x 1080, thumbnails 324 x 432
        assert_eq!(media_dimensions(&out), vec![(24, 32), (324, 432), (810, 1080)]);
        // Displayed extent does not depend on pixel size
        let xml = document_xml(&out);
        assert!(xml.contains(r#"cx="4937760""#));
        assert!(xml.contains(r#"cy="6583680""#));
    }

    #[test]
    fn writer_is_closed_after_save() {
        let tmp = TempDir::new().unwrap();
        let mut writer = blank_writer(&DocumentConfig::default());
        writer.save(&tmp.path().join("a.docx")).unwrap();

        assert!(matches!(writer.add_heading("late", 1), Err(DocumentError::Closed)));
        assert!(matches!(
            writer.save(&tmp.path().join("b.docx")),
            Err(DocumentError::Closed)
        ));
    }

    #[test]
    fn staging_path_is_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("/out/site.docx")),
            PathBuf::from("/out/.site.docx.partial")
        );
    }
}
