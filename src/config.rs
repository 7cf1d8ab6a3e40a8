//! Report configuration.
//!
//! The configuration is a JSON document in which every field is optional.  Its path is resolved
//! in a fixed order:
//! 1. An explicit path (the `--config` command line flag)
//! 2. The `TOC_REPORT_CONFIG` environment variable
//! 3. Built-in defaults

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::ReportError;
use crate::fitter::Leader;
use crate::pass::PageGeometry;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "TOC_REPORT_CONFIG";

/// Where the active configuration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    CliFlag,
    EnvVar,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CliFlag => f.write_str("command line"),
            Self::EnvVar => write!(f, "{CONFIG_ENV}"),
            Self::Default => f.write_str("built-in defaults"),
        }
    }
}

/// Top-level report settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Title stored in the PDF metadata.
    pub title: String,
    /// Explicit font directory; searched before the environment and bundled locations.
    pub fonts_dir: Option<PathBuf>,
    pub page: PageConfig,
    pub toc: TocConfig,
    /// Hard cap on layout passes.
    pub max_passes: usize,
    /// Fail the build instead of warning when a cross-reference group matches no heading.
    pub strict_cross_references: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Report".to_owned(),
            fonts_dir: None,
            page: PageConfig::default(),
            toc: TocConfig::default(),
            max_passes: 10,
            strict_cross_references: false,
        }
    }
}

impl ReportConfig {
    /// Parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|source| ReportError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Loads the configuration from the first available source.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ReportError> {
        match resolve_config_path(explicit) {
            (Some(path), source) => {
                debug!("Loading configuration from {} ({})", path.display(), source);
                Ok((Self::load(&path)?, source))
            }
            (None, source) => Ok((Self::default(), source)),
        }
    }

    /// Position of the content frame used to convert element positions to page positions.
    pub fn geometry(&self) -> PageGeometry {
        self.page.geometry()
    }
}

/// Resolves the configuration path: explicit path, then [`CONFIG_ENV`], then none.
pub fn resolve_config_path(explicit: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = explicit {
        return (Some(path.to_path_buf()), ConfigSource::CliFlag);
    }

    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return (Some(PathBuf::from(path)), ConfigSource::EnvVar);
        }
    }

    (None, ConfigSource::Default)
}

/// Paper size, frame and footer placement.  Lengths are in millimetres.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    pub width_mm: f64,
    pub height_mm: f64,
    /// Margin between the page edge and the frame on every side.
    pub margin_mm: f64,
    /// Frame padding as a fraction of the frame width (left/right) and height (top/bottom).
    pub frame_padding_ratio: f64,
    pub show_frame_boundary: bool,
    /// Distance of the footer baseline from the bottom of the page.
    pub footer_offset_mm: f64,
    /// Paragraph style of the footer; `None` disables the footer.
    pub footer_style: Option<String>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 25.4,
            frame_padding_ratio: 0.1,
            show_frame_boundary: true,
            footer_offset_mm: 23.0,
            footer_style: Some("footerStyle".to_owned()),
        }
    }
}

impl PageConfig {
    /// Horizontal and vertical frame padding in millimetres.
    pub fn frame_padding(&self) -> (f64, f64) {
        let frame_width = self.width_mm - 2.0 * self.margin_mm;
        let frame_height = self.height_mm - 2.0 * self.margin_mm;
        (
            frame_width * self.frame_padding_ratio,
            frame_height * self.frame_padding_ratio,
        )
    }

    pub fn geometry(&self) -> PageGeometry {
        let (pad_x, pad_y) = self.frame_padding();
        PageGeometry {
            page_width: self.width_mm,
            page_height: self.height_mm,
            content_left: self.margin_mm + pad_x,
            content_top: self.margin_mm + pad_y,
        }
    }
}

/// Per-level style and leader of the table of contents.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TocLevelConfig {
    pub style: String,
    /// A string selects dot-leader mode, `null` selects inline mode.
    #[serde(default)]
    pub leader: Leader,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TocConfig {
    /// Levels beyond the end of the list use the last entry.
    pub levels: Vec<TocLevelConfig>,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                TocLevelConfig {
                    style: "Heading1OfTOC".to_owned(),
                    leader: Leader::default(),
                },
                TocLevelConfig {
                    style: "Heading2OfTOC".to_owned(),
                    leader: Leader::default(),
                },
            ],
        }
    }
}

impl TocConfig {
    /// `(style, leader)` pairs in level order.
    pub fn level_styles(&self) -> Vec<(String, Leader)> {
        self.levels
            .iter()
            .map(|level| (level.style.clone(), level.leader.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ReportConfig::from_json("{}").expect("valid config");
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.max_passes, 10);
        assert_eq!(config.toc.levels.len(), 2);
    }

    #[test]
    fn leader_modes_are_parsed() {
        let config = ReportConfig::from_json(
            r#"{ "toc": { "levels": [
                { "style": "Heading1OfTOC", "leader": "-" },
                { "style": "Heading2OfTOC", "leader": null },
                { "style": "Normal" }
            ] } }"#,
        )
        .expect("valid config");
        let leaders: Vec<_> = config.toc.levels.iter().map(|l| l.leader.clone()).collect();
        assert_eq!(
            leaders,
            [Leader::Dots("-".to_owned()), Leader::Inline, Leader::default()]
        );
    }

    #[test]
    fn invalid_leader_fails_fast() {
        let err = ReportConfig::from_json(
            r#"{ "toc": { "levels": [ { "style": "Heading1OfTOC", "leader": 3 } ] } }"#,
        )
        .expect_err("numeric leader must be rejected");
        assert!(err.to_string().contains("leader string"), "{err}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ReportConfig::from_json(r#"{ "max_pases": 3 }"#).is_err());
    }

    #[test]
    fn geometry_includes_margin_and_padding() {
        let geometry = PageConfig::default().geometry();
        assert!((geometry.content_left - (25.4 + 15.92)).abs() < 1e-9);
        assert!((geometry.content_top - (25.4 + 24.62)).abs() < 1e-9);
    }

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/tmp/report.json");
        let (resolved, source) = resolve_config_path(Some(&path));
        assert_eq!(resolved, Some(path));
        assert_eq!(source, ConfigSource::CliFlag);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ReportConfig::load(Path::new("/__toc_report_missing__/config.json"))
            .expect_err("missing file");
        assert!(matches!(err, ReportError::Io(_)));
    }
}
