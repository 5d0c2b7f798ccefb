//! Tree-to-document builder.
//!
//! Walks the photo tree depth-first and feeds a [`DocumentWriter`]:
//!
//! ```text
//! visit(dir, depth)
//!   heading(name, min(depth, max_heading_level))
//!   if dir has images:
//!     normalize each image (failures are logged and embedded as-is)
//!     image table: first image featured, the rest as thumbnails
//!     page break
//!   for child in sorted subdirectories: visit(child, depth + 1)
//! ```
//!
//! After the walk the document is saved once and the table of contents is
//! refreshed. Any error before the save aborts the build and nothing is
//! written. A failed refresh is reported but keeps the saved file.

use crate::config::ReportConfig;
use crate::document::{DocumentError, DocumentWriter, DocxWriter};
use crate::imaging::{BackendError, ImageBackend, Normalized, Quality, Rotation, RustBackend, normalize};
use crate::layout::{LayoutMetrics, heading_level, plan_image_table};
use crate::scan::{self, ScanError};
use crate::toc::{self, TocRefresher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),
    #[error("Source directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Word template whose content (cover, table of contents) comes first.
    pub template: PathBuf,
    /// Root of the photo tree; becomes the level 1 heading.
    pub root: PathBuf,
    /// Destination `.docx`.
    pub output: PathBuf,
}

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output: PathBuf,
    /// One entry per directory, in document order.
    pub sections: Vec<SectionReport>,
    pub toc: TocStatus,
}

impl BuildReport {
    pub fn image_count(&self) -> usize {
        self.sections.iter().map(SectionReport::image_count).sum()
    }

    /// Images whose orientation could not be checked or fixed.
    pub fn failed_images(&self) -> impl Iterator<Item = &ImageReport> {
        self.sections
            .iter()
            .flat_map(SectionReport::images)
            .filter(|image| matches!(image.outcome, NormalizeOutcome::Failed(_)))
    }
}

#[derive(Debug, Clone)]
pub struct SectionReport {
    pub title: String,
    pub path: PathBuf,
    pub depth: usize,
    pub level: u8,
    pub featured: Option<ImageReport>,
    pub thumbnails: Vec<ImageReport>,
}

impl SectionReport {
    pub fn images(&self) -> impl Iterator<Item = &ImageReport> {
        self.featured.iter().chain(self.thumbnails.iter())
    }

    pub fn image_count(&self) -> usize {
        self.images().count()
    }
}

#[derive(Debug, Clone)]
pub struct ImageReport {
    pub path: PathBuf,
    pub outcome: NormalizeOutcome,
}

/// What orientation correction did to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Upright,
    Rotated(Rotation),
    /// Embedded unmodified.
    Failed(String),
}

impl From<Result<Normalized, BackendError>> for NormalizeOutcome {
    fn from(result: Result<Normalized, BackendError>) -> Self {
        match result {
            Ok(Normalized {
                rotation: Some(rotation),
            }) => NormalizeOutcome::Rotated(rotation),
            Ok(Normalized { rotation: None }) => NormalizeOutcome::Upright,
            Err(e) => NormalizeOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocStatus {
    Refreshed { method: &'static str },
    Failed { method: &'static str, error: String },
}

/// Build a document from a photo tree with the production writer, backend
/// and configured table-of-contents refresh.
#[instrument(skip_all, fields(root = %request.root.display()))]
pub fn build(request: &BuildRequest, config: &ReportConfig) -> Result<BuildReport, BuildError> {
    check_preconditions(request)?;

    let mut writer = DocxWriter::from_template(&request.template, &config.document)?;
    let refresher = toc::from_config(&config.toc);
    build_with(
        &mut writer,
        &RustBackend::new(),
        refresher.as_ref(),
        request,
        config,
    )
}

/// Template must be a file and the root a directory.
pub fn check_preconditions(request: &BuildRequest) -> Result<(), BuildError> {
    if !request.template.is_file() {
        return Err(BuildError::TemplateNotFound(request.template.clone()));
    }
    if !request.root.is_dir() {
        return Err(BuildError::RootNotFound(request.root.clone()));
    }
    Ok(())
}

/// Walk `request.root` into `writer`, save to `request.output`, then refresh
/// the table of contents.
pub fn build_with<W, B>(
    writer: &mut W,
    backend: &B,
    refresher: &dyn TocRefresher,
    request: &BuildRequest,
    config: &ReportConfig,
) -> Result<BuildReport, BuildError>
where
    W: DocumentWriter + ?Sized,
    B: ImageBackend,
{
    let mut traversal = Traversal {
        writer: &mut *writer,
        backend,
        max_level: config.document.max_heading_level,
        metrics: LayoutMetrics::from_config(&config.layout),
        quality: Quality::new(config.images.quality),
        ancestors: Vec::new(),
        sections: Vec::new(),
    };
    traversal.visit(&request.root, 1)?;
    let sections = traversal.sections;

    writer.save(&request.output)?;
    info!(
        output = %request.output.display(),
        sections = sections.len(),
        "Saved document"
    );

    let method = refresher.name();
    let toc = match refresher.refresh(&request.output) {
        Ok(()) => TocStatus::Refreshed { method },
        Err(e) => {
            warn!(error = %e, "Table of contents refresh failed");
            TocStatus::Failed {
                method,
                error: e.to_string(),
            }
        }
    };

    Ok(BuildReport {
        output: request.output.clone(),
        sections,
        toc,
    })
}

struct Traversal<'a, W: ?Sized, B> {
    writer: &'a mut W,
    backend: &'a B,
    max_level: u8,
    metrics: LayoutMetrics,
    quality: Quality,
    /// Canonical paths of the directories being visited, root first.
    ancestors: Vec<PathBuf>,
    sections: Vec<SectionReport>,
}

impl<W, B> Traversal<'_, W, B>
where
    W: DocumentWriter + ?Sized,
    B: ImageBackend,
{
    fn visit(&mut self, path: &Path, depth: usize) -> Result<(), BuildError> {
        let node = scan::read_node(path, depth)?;
        let level = heading_level(depth, self.max_level);
        debug!(name = %node.name, depth, level, images = node.images.len(), "Section");

        self.writer.add_heading(&node.name, level)?;

        let mut section = SectionReport {
            title: node.name.clone(),
            path: node.path.clone(),
            depth,
            level,
            featured: None,
            thumbnails: Vec::new(),
        };

        if let Some((featured, thumbnails)) = node.images.split_first() {
            section.featured = Some(self.normalize_image(featured));
            section.thumbnails = thumbnails.iter().map(|p| self.normalize_image(p)).collect();

            let table = plan_image_table(featured, thumbnails, &self.metrics);
            self.writer.add_image_table(&table)?;
            self.writer.add_page_break()?;
        }
        self.sections.push(section);

        self.ancestors.push(scan::canonical(path));
        for subdir in &node.subdirs {
            if scan::is_ancestor_link(subdir, &self.ancestors) {
                continue;
            }
            self.visit(subdir, depth + 1)?;
        }
        self.ancestors.pop();
        Ok(())
    }

    fn normalize_image(&self, path: &Path) -> ImageReport {
        let result = normalize(self.backend, path, self.quality);
        if let Err(e) = &result {
            warn!(path = %path.display(), error = %e, "Orientation not corrected, embedding as is");
        }
        let outcome = NormalizeOutcome::from(result);
        ImageReport {
            path: path.to_path_buf(),
            outcome,
        }
    }
}
