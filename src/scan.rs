//! Filesystem scanning.
//!
//! Reads one directory at a time into a [`DirectoryNode`]: its display name,
//! its qualifying images and its child directories, both in a deterministic
//! order. The builder walks the tree lazily through [`read_node`]; the
//! `check` command uses [`outline`] to list the whole tree up front.
//!
//! ## Directory Structure
//!
//! ```text
//! Site visit/                      # Root → heading level 1
//! ├── config.toml                  # Optional config (not an image, ignored)
//! ├── 01-overview.jpg              # Featured image of "Site visit"
//! ├── 02-entrance.png              # Thumbnail
//! ├── Roof/                        # Heading level 2
//! │   ├── north.jpg
//! │   └── Gutters/                 # Heading level 3, no images → heading only
//! └── Basement/                    # Visited before "Roof"
//!     └── IMG_0001.JPG
//! ```
//!
//! ## Ordering
//!
//! Images and subdirectories are sorted by file name, so the document never
//! depends on the order the platform lists entries in. Uppercase sorts before
//! lowercase (`B/` before `a/`).
//!
//! ## Filtering
//!
//! - Images: extension `jpg`, `jpeg`, `png` or `gif`, case-insensitive
//! - Hidden files (leading `.`) are skipped, which drops macOS `._*`
//!   resource-fork files that carry image extensions but no image data.
//!   Hidden directories are still sections.
//!
//! ## Directory Links
//!
//! A subdirectory that resolves to one of its own ancestors (a symlink back
//! up the tree) is not entered. [`outline`] and the builder apply the same
//! rule through [`is_ancestor_link`], so `check` lists exactly the sections a
//! build writes.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Extensions accepted as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// One directory of the input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub path: PathBuf,
    /// Section title: the directory's base name.
    pub name: String,
    /// 1 for the root.
    pub depth: usize,
    /// Sorted, de-duplicated image files directly inside this directory.
    pub images: Vec<PathBuf>,
    /// Sorted child directories.
    pub subdirs: Vec<PathBuf>,
}

/// A directory as listed by [`outline`], in depth-first order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutlineEntry {
    pub name: String,
    pub depth: usize,
    /// Path relative to the root (empty for the root itself).
    pub path: String,
    /// Image file names, featured first.
    pub images: Vec<String>,
}

/// Read a single directory.
pub fn read_node(path: &Path, depth: usize) -> Result<DirectoryNode, ScanError> {
    let entries = collect_entries(path)?;

    let images = dedup_paths(entries.iter().filter(|e| is_image(e)).cloned());
    let subdirs = entries.into_iter().filter(|e| e.is_dir()).collect();

    Ok(DirectoryNode {
        path: path.to_path_buf(),
        name: display_name(path),
        depth,
        images,
        subdirs,
    })
}

/// List the whole tree depth-first, the way the builder will visit it.
pub fn outline(root: &Path) -> Result<Vec<OutlineEntry>, ScanError> {
    let mut entries = Vec::new();
    let mut ancestors = Vec::new();
    outline_directory(root, root, 1, &mut ancestors, &mut entries)?;
    Ok(entries)
}

fn outline_directory(
    path: &Path,
    root: &Path,
    depth: usize,
    ancestors: &mut Vec<PathBuf>,
    entries: &mut Vec<OutlineEntry>,
) -> Result<(), ScanError> {
    let node = read_node(path, depth)?;
    let rel_path = path.strip_prefix(root).unwrap_or(path);

    entries.push(OutlineEntry {
        name: node.name.clone(),
        depth,
        path: rel_path.to_string_lossy().to_string(),
        images: node
            .images
            .iter()
            .map(|p| file_name(p))
            .collect(),
    });

    ancestors.push(canonical(path));
    for subdir in &node.subdirs {
        if is_ancestor_link(subdir, ancestors) {
            continue;
        }
        outline_directory(subdir, root, depth + 1, ancestors, entries)?;
    }
    ancestors.pop();
    Ok(())
}

/// Whether `subdir` resolves to a directory in `ancestors` (canonical paths of
/// the directories currently being walked). Logs a warning when it does.
pub fn is_ancestor_link(subdir: &Path, ancestors: &[PathBuf]) -> bool {
    let looped = ancestors.contains(&canonical(subdir));
    if looped {
        warn!(path = %subdir.display(), "Skipping directory link back into its own ancestry");
    }
    looped
}

fn collect_entries(path: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut entries: Vec<PathBuf> = fs::read_dir(path)
        .map_err(io_err)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() || !file_name(p).starts_with('.'))
        .collect();

    entries.sort();
    Ok(entries)
}

/// Whether `path` is a file with an accepted image extension.
pub fn is_image(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Drop paths that resolve to a file already seen, keeping first occurrences.
fn dedup_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(canonical(p)))
        .collect()
}

/// Canonical form of a path, or the path itself when it cannot be resolved.
pub fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Base name of a directory, used as its section title.
///
/// Paths without a usable base name (`.`, `..`, `/photos/..`) fall back to the
/// base name of their canonical form.
pub fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => canonical(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
