//! Table-of-contents refresh.
//!
//! A template's table of contents is a Word field computed from the heading
//! styles. Appending headings does not recompute it; something has to run the
//! field update after the document is saved. [`TocRefresher`] is that step:
//!
//! | Mode            | Implementation      | Effect                                        |
//! |-----------------|---------------------|-----------------------------------------------|
//! | `update-fields` | [`FieldUpdate`]     | Word updates all fields when the file opens, and the body ends with a section break |
//! | `command`       | [`ExternalCommand`] | Runs a program (e.g. a LibreOffice macro)     |
//! | `off`           | [`Disabled`]        | Nothing                                       |
//!
//! [`FieldUpdate`] edits `word/settings.xml` and `word/document.xml` inside
//! the saved package and copies every other entry through unchanged. Running
//! it twice yields the same parts.
//!
//! ## Trailing section break
//!
//! The refreshed document closes with a continuous section break, a last
//! paragraph whose section properties copy the body's own:
//!
//! ```text
//! <w:p><w:pPr><w:sectPr>..<w:type w:val="continuous"/><w:pgSz ../>..</w:sectPr></w:pPr></w:p>
//! <w:sectPr>..<w:pgSz ../>..</w:sectPr>
//! </w:body>
//! ```

use crate::config::{PATH_PLACEHOLDER, TocConfig, TocMode};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const SETTINGS_PART: &str = "word/settings.xml";
const DOCUMENT_PART: &str = "word/document.xml";
const UPDATE_FIELDS: &str = r#"<w:updateFields w:val="true"/>"#;
const CONTINUOUS_SECTION: &str = r#"<w:type w:val="continuous"/>"#;
const SECTION_END: &str = "</w:sectPr>";

#[derive(Error, Debug)]
pub enum TocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("{path} has no word/settings.xml part")]
    MissingSettings { path: PathBuf },
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: String },
}

/// Refreshes the table of contents of a saved document.
pub trait TocRefresher {
    /// Short label for reports.
    fn name(&self) -> &'static str;

    fn refresh(&self, path: &Path) -> Result<(), TocError>;
}

/// Build the refresher selected by `[toc]`.
pub fn from_config(config: &TocConfig) -> Box<dyn TocRefresher> {
    match config.mode {
        TocMode::UpdateFields => Box::new(FieldUpdate),
        TocMode::Command => Box::new(ExternalCommand::new(config.command.clone())),
        TocMode::Off => Box::new(Disabled),
    }
}

/// Flags the package so Word recomputes fields on open and closes the body
/// with a section break.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldUpdate;

impl TocRefresher for FieldUpdate {
    fn name(&self) -> &'static str {
        "update-fields"
    }

    fn refresh(&self, path: &Path) -> Result<(), TocError> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        if !archive.file_names().any(|name| name == SETTINGS_PART) {
            return Err(TocError::MissingSettings {
                path: path.to_path_buf(),
            });
        }

        let staging = path.with_extension("toc.partial");
        let rewritten = rewrite_package(&mut archive, &staging);
        if let Err(e) = rewritten {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }

        debug!(path = %path.display(), "Flagged fields for update");
        Ok(())
    }
}

fn rewrite_package(archive: &mut ZipArchive<File>, staging: &Path) -> Result<(), TocError> {
    let mut writer = ZipWriter::new(File::create(staging)?);

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let rewrite: fn(&str) -> String = match entry.name() {
            SETTINGS_PART => with_update_fields,
            DOCUMENT_PART => with_trailing_section_break,
            _ => {
                writer.raw_copy_file(entry)?;
                continue;
            }
        };
        let name = entry.name().to_string();
        let mut xml = String::new();
        entry.read_to_string(&mut xml)?;
        writer.start_file(name, SimpleFileOptions::default())?;
        writer.write_all(rewrite(&xml).as_bytes())?;
    }

    writer.finish()?;
    Ok(())
}

/// Settings XML with exactly one `<w:updateFields w:val="true"/>`, placed last.
pub fn with_update_fields(settings: &str) -> String {
    let mut xml = remove_empty_elements(settings, "<w:updateFields");
    match xml.rfind("</w:settings>") {
        Some(pos) => xml.insert_str(pos, UPDATE_FIELDS),
        None => xml.push_str(UPDATE_FIELDS),
    }
    xml
}

/// Document XML whose body ends with a continuous section break.
///
/// Returned unchanged when the body already ends with a section break or has
/// no final `<w:sectPr>` to copy.
pub fn with_trailing_section_break(document: &str) -> String {
    let Some(body_end) = document.rfind("</w:body>") else {
        return document.to_string();
    };
    let Some(start) = document[..body_end].rfind("<w:sectPr") else {
        return document.to_string();
    };
    let Some(len) = document[start..body_end].find(SECTION_END) else {
        return document.to_string();
    };
    let end = start + len + SECTION_END.len();
    let body_level = document[end..body_end].trim().is_empty();
    let already_broken = document[..start]
        .trim_end()
        .ends_with("</w:sectPr></w:pPr></w:p>");
    if !body_level || already_broken {
        return document.to_string();
    }

    let mut section = remove_empty_elements(&document[start..end], "<w:type");
    let at = section
        .find("<w:pgSz")
        .unwrap_or(section.len() - SECTION_END.len());
    section.insert_str(at, CONTINUOUS_SECTION);

    let mut xml = document.to_string();
    xml.insert_str(start, &format!("<w:p><w:pPr>{section}</w:pPr></w:p>"));
    xml
}

/// Remove every self-closing element starting with `open` (e.g. `<w:type`).
fn remove_empty_elements(xml: &str, open: &str) -> String {
    let mut xml = xml.to_string();
    while let Some(start) = xml.find(open) {
        match xml[start..].find("/>") {
            Some(end) => xml.replace_range(start..start + end + 2, ""),
            None => break,
        }
    }
    xml
}

/// Runs a program against the saved document.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    argv: Vec<String>,
}

impl ExternalCommand {
    /// `argv[0]` is the program; `{path}` in any element becomes the
    /// document path.
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    fn args_for(&self, path: &Path) -> Vec<String> {
        let path = path.display().to_string();
        self.argv
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
            .collect()
    }
}

impl TocRefresher for ExternalCommand {
    fn name(&self) -> &'static str {
        "command"
    }

    fn refresh(&self, path: &Path) -> Result<(), TocError> {
        let args = self.args_for(path);
        let Some((program, rest)) = args.split_first() else {
            return Err(TocError::Spawn {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };

        debug!(%program, ?rest, "Running table of contents command");
        let status = Command::new(program)
            .args(rest)
            .status()
            .map_err(|source| TocError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(TocError::CommandFailed {
                program: program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Leaves the document alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl TocRefresher for Disabled {
    fn name(&self) -> &'static str {
        "off"
    }

    fn refresh(&self, _path: &Path) -> Result<(), TocError> {
        Ok(())
    }
}
