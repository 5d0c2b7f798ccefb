//! Report configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! reproduce the classic layout; a user config file only needs the keys it
//! wants to change.
//!
//! ## Config File Location
//!
//! Place `config.toml` in the photo root, or pass `--config FILE`:
//!
//! ```text
//! Site visit/
//! ├── config.toml              # Picked up automatically
//! ├── 01-overview.jpg
//! └── Roof/
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [layout]
//! page_height = 9.0          # Inches; every box is derived from it
//! featured_ratio = 0.8       # Featured image height / page height
//! aspect_ratio = 0.75        # Width / height of every image box
//! thumbnail_ratio = 0.4      # Thumbnail height / featured height
//! right_column_width = 5.0   # Inches
//! thumbnails_per_row = 3
//! separator = "  "           # Text after each thumbnail
//!
//! [document]
//! max_heading_level = 5
//! heading_style = "Heading{level}"
//!
//! [images]
//! quality = 90               # JPEG quality when rewriting a rotated photo
//!
//! [toc]
//! mode = "update-fields"     # "update-fields", "command" or "off"
//! command = []               # Program + args for mode = "command"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the photo root.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Placeholder replaced by the heading level in `document.heading_style`.
pub const LEVEL_PLACEHOLDER: &str = "{level}";

/// Placeholder replaced by the document path in `toc.command`.
pub const PATH_PLACEHOLDER: &str = "{path}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Report configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Image box sizes and thumbnail grid.
    pub layout: LayoutConfig,
    /// Heading depth and style ids.
    pub document: DocumentConfig,
    /// Encoding settings for rotated photos.
    pub images: ImagesConfig,
    /// Table-of-contents refresh after saving.
    pub toc: TocConfig,
}

impl ReportConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        for (key, value) in [
            ("layout.page_height", layout.page_height),
            ("layout.featured_ratio", layout.featured_ratio),
            ("layout.aspect_ratio", layout.aspect_ratio),
            ("layout.thumbnail_ratio", layout.thumbnail_ratio),
            ("layout.right_column_width", layout.right_column_width),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a positive number"
                )));
            }
        }
        if layout.thumbnails_per_row == 0 {
            return Err(ConfigError::Validation(
                "layout.thumbnails_per_row must be at least 1".into(),
            ));
        }
        if !(1..=9).contains(&self.document.max_heading_level) {
            return Err(ConfigError::Validation(
                "document.max_heading_level must be 1-9".into(),
            ));
        }
        if !self.document.heading_style.contains(LEVEL_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "document.heading_style must contain {LEVEL_PLACEHOLDER}"
            )));
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.toc.mode == TocMode::Command && self.toc.command.is_empty() {
            return Err(ConfigError::Validation(
                "toc.command must name a program when toc.mode = \"command\"".into(),
            ));
        }
        Ok(())
    }
}

/// Image box sizes and thumbnail grid. Lengths are in inches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub page_height: f64,
    /// Featured image height as a fraction of the page height.
    pub featured_ratio: f64,
    /// Width / height of every image box (0.75 = 3:4 portrait).
    pub aspect_ratio: f64,
    /// Thumbnail height as a fraction of the featured height.
    pub thumbnail_ratio: f64,
    pub right_column_width: f64,
    /// Thumbnails per line before a line break.
    pub thumbnails_per_row: usize,
    /// Text run appended after each thumbnail.
    pub separator: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_height: 9.0,
            featured_ratio: 0.8,
            aspect_ratio: 0.75,
            thumbnail_ratio: 0.4,
            right_column_width: 5.0,
            thumbnails_per_row: 3,
            separator: "  ".to_string(),
        }
    }
}

/// Heading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    /// Deepest heading level used; deeper directories reuse it.
    pub max_heading_level: u8,
    /// Paragraph style id for headings; `{level}` is replaced by the level.
    /// Localized templates use their own ids (French Word: `Titre{level}`).
    pub heading_style: String,
}

impl DocumentConfig {
    /// Style id for a heading level.
    pub fn heading_style_id(&self, level: u8) -> String {
        self.heading_style
            .replace(LEVEL_PLACEHOLDER, &level.to_string())
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_heading_level: 5,
            heading_style: "Heading{level}".to_string(),
        }
    }
}

/// Encoding settings for photos rewritten by orientation correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// How the table of contents is refreshed after the document is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TocMode {
    /// Flag the document so Word recomputes its fields when it is opened.
    #[default]
    UpdateFields,
    /// Run an external program against the saved document.
    Command,
    /// Leave the table of contents as the template had it.
    Off,
}

/// Table-of-contents refresh settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TocConfig {
    pub mode: TocMode,
    /// Program followed by its arguments; `{path}` is replaced by the
    /// document path. Used when `mode = "command"`.
    pub command: Vec<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ReportConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ReportConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ReportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the photo root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(root: &Path) -> Result<ReportConfig, ConfigError> {
    resolve_config(load_raw_config(&root.join(CONFIG_FILENAME))?)
}

/// Load config from an explicit file, which must exist.
pub fn load_config_file(path: &Path) -> Result<ReportConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Dossier Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Put this file in the photo root as config.toml, or pass --config FILE.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Layout (lengths in inches)
# ---------------------------------------------------------------------------
[layout]
# Every image box is derived from the page height.
page_height = 9.0

# Featured (first) image height as a fraction of the page height.
featured_ratio = 0.8

# Width / height of every image box. 0.75 = 3:4 portrait.
aspect_ratio = 0.75

# Thumbnail height as a fraction of the featured height.
thumbnail_ratio = 0.4

# Width of the thumbnail column. The featured column is as wide as the
# featured image.
right_column_width = 5.0

# Thumbnails per line before a line break.
thumbnails_per_row = 3

# Text placed after each thumbnail.
separator = "  "

# ---------------------------------------------------------------------------
# Document
# ---------------------------------------------------------------------------
[document]
# Deepest heading level used. Deeper folders reuse it.
max_heading_level = 5

# Paragraph style id for headings. {level} is replaced by the level.
# The template must define these styles. French Word templates: "Titre{level}".
heading_style = "Heading{level}"

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# JPEG quality used when a photo is rewritten to fix its orientation.
quality = 90

# ---------------------------------------------------------------------------
# Table of contents
# ---------------------------------------------------------------------------
[toc]
# "update-fields": Word refreshes the table of contents when the file is opened.
# "command":       run the program below against the saved document.
# "off":           leave the template's table of contents as is.
mode = "update-fields"

# Program and arguments for mode = "command". {path} is the document path.
# command = ["soffice", "--headless", "macro:///Standard.Toc.Refresh({path})"]
command = []
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_classic_layout() {
        let config = ReportConfig::default();
        assert_eq!(config.layout.page_height, 9.0);
        assert_eq!(config.layout.featured_ratio, 0.8);
        assert_eq!(config.layout.aspect_ratio, 0.75);
        assert_eq!(config.layout.thumbnail_ratio, 0.4);
        assert_eq!(config.layout.right_column_width, 5.0);
        assert_eq!(config.layout.thumbnails_per_row, 3);
        assert_eq!(config.layout.separator, "  ");
        assert_eq!(config.document.max_heading_level, 5);
        assert_eq!(config.images.quality, 90);
        assert_eq!(config.toc.mode, TocMode::UpdateFields);
    }

    #[test]
    fn default_config_is_valid() {
        ReportConfig::default().validate().unwrap();
    }

    #[test]
    fn heading_style_id_substitutes_level() {
        let doc = DocumentConfig::default();
        assert_eq!(doc.heading_style_id(1), "Heading1");
        assert_eq!(doc.heading_style_id(5), "Heading5");

        let french = DocumentConfig {
            heading_style: "Titre{level}".into(),
            ..DocumentConfig::default()
        };
        assert_eq!(french.heading_style_id(2), "Titre2");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[layout]
thumbnails_per_row = 4
"#;
        let config: ReportConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.layout.thumbnails_per_row, 4);
        // Default values preserved
        assert_eq!(config.layout.page_height, 9.0);
        assert_eq!(config.document.heading_style, "Heading{level}");
    }

    #[test]
    fn parse_toc_modes() {
        for (text, mode) in [
            ("update-fields", TocMode::UpdateFields),
            ("command", TocMode::Command),
            ("off", TocMode::Off),
        ] {
            let config: ReportConfig =
                toml::from_str(&format!("[toc]\nmode = \"{text}\"\ncommand = [\"x\"]")).unwrap();
            assert_eq!(config.toc.mode, mode);
        }
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<ReportConfig, _> = toml::from_str("[layout]\npage_heigth = 8.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn merge_overrides_only_given_keys() {
        let overlay: toml::Value = toml::from_str("[document]\nmax_heading_level = 3\n").unwrap();
        let merged = merge_toml(stock_defaults_value(), overlay);
        let config: ReportConfig = merged.try_into().unwrap();
        assert_eq!(config.document.max_heading_level, 3);
        assert_eq!(config.document.heading_style, "Heading{level}");
        assert_eq!(config.layout.right_column_width, 5.0);
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn zero_ratio_is_invalid() {
        let mut config = ReportConfig::default();
        config.layout.featured_ratio = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_thumbnails_per_row_is_invalid() {
        let mut config = ReportConfig::default();
        config.layout.thumbnails_per_row = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn heading_level_out_of_range_is_invalid() {
        let mut config = ReportConfig::default();
        config.document.max_heading_level = 0;
        assert!(config.validate().is_err());
        config.document.max_heading_level = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn heading_style_without_placeholder_is_invalid() {
        let mut config = ReportConfig::default();
        config.document.heading_style = "Heading".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn command_mode_requires_command() {
        let mut config = ReportConfig::default();
        config.toc.mode = TocMode::Command;
        assert!(config.validate().is_err());
        config.toc.command = vec!["refresh-toc".into(), "{path}".into()];
        config.validate().unwrap();
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.layout.thumbnails_per_row, 3);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[layout]
right_column_width = 4.5

[toc]
mode = "off"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.layout.right_column_width, 4.5);
        assert_eq!(config.toc.mode, TocMode::Off);
        assert_eq!(config.layout.page_height, 9.0);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[images]\nquality = 0\n",
        )
        .unwrap();

        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_file_requires_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: ReportConfig = toml::from_str(stock_config_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.layout.page_height, 9.0);
        assert_eq!(config.toc.mode, TocMode::UpdateFields);
        assert!(config.toc.command.is_empty());
    }
}
