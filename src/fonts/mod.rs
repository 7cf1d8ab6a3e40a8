//! Font loading utilities for the toc_report crate.
//!
//! Reports use four named fonts.  They are loaded once per build into a [`FontRegistry`] and
//! installed into every pass's `genpdf::Document`, which yields the [`InstalledFonts`] handles
//! that styles are resolved against.

use std::collections::BTreeMap;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{Font, FontData, FontFamily};
use genpdf::style::Style;
use genpdf::Document;
use log::{debug, info};

use crate::error::ReportError;
use crate::style::StyleSpec;

/// Environment variable that points at a directory containing the font files.
pub const FONTS_DIR_ENV: &str = "TOC_REPORT_FONTS_DIR";

/// Font used as the document default.
pub const DEFAULT_FONT_NAME: &str = "NotoSansTC-Regular";

/// Registered font names and the files they are loaded from.
pub const FONT_FILES: &[(&str, &str)] = &[
    ("NotoSansTC-Light", "NotoSansTC-Light.ttf"),
    ("NotoSansTC-Regular", "NotoSansTC-Regular.ttf"),
    ("NotoSansTC-Bold", "NotoSansTC-Bold.ttf"),
    ("AdobeSongStd-Light", "adobesongstd-light.ttf"),
];

/// Location of the font directory bundled with the crate sources.
pub fn bundled_fonts_source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn font_directory_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }

    if let Ok(path) = env::var(FONTS_DIR_ENV) {
        if !path.trim().is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.iter().any(|existing| existing == &candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = bundled_fonts_source_dir();
    if !candidates
        .iter()
        .any(|existing| existing == &manifest_candidate)
    {
        candidates.push(manifest_candidate);
    }

    candidates
}

fn missing_font_files(path: &Path) -> Vec<PathBuf> {
    FONT_FILES
        .iter()
        .map(|(_, file)| path.join(file))
        .filter(|candidate| !candidate.is_file())
        .collect()
}

/// Picks the first candidate directory that holds all four font files.
pub fn resolve_font_directory(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates(explicit) {
        let exists = candidate.is_dir();
        let missing = missing_font_files(&candidate);

        if exists && missing.is_empty() {
            debug!("Using fonts from {}", candidate.display());
            return Ok(candidate);
        }

        let reason = if !exists {
            format!("directory missing at {}", candidate.display())
        } else {
            let missing_list = missing
                .iter()
                .map(|path| path.file_name().unwrap_or_default().to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ");
            format!("missing files [{}]", missing_list)
        };

        attempts.push(format!("{} ({})", candidate.display(), reason));
    }

    let summary = if attempts.is_empty() {
        "no search paths were available".to_owned()
    } else {
        attempts.join(", ")
    };

    Err(Error::new(
        format!(
            "Unable to locate the report fonts. Checked: {}. Set {} or pass a fonts directory.",
            summary, FONTS_DIR_ENV
        ),
        io::Error::new(io::ErrorKind::NotFound, "report fonts directory not found"),
    ))
}

/// Indicates whether all fonts required for a report can be found.
pub fn fonts_available(explicit: Option<&Path>) -> bool {
    resolve_font_directory(explicit).is_ok()
}

fn single_face_family(data: &FontData) -> FontFamily<FontData> {
    FontFamily {
        regular: data.clone(),
        bold: data.clone(),
        italic: data.clone(),
        bold_italic: data.clone(),
    }
}

/// The raw font data of every named font.
pub struct FontRegistry {
    fonts: BTreeMap<String, FontData>,
}

impl FontRegistry {
    /// Loads all named fonts from the resolved font directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let directory = resolve_font_directory(explicit)?;
        let mut fonts = BTreeMap::new();

        for (name, file) in FONT_FILES {
            let path = directory.join(file);
            let data = FontData::load(&path, None).map_err(|err| {
                Error::new(
                    format!("Failed to load font '{}' from {}: {}", name, path.display(), err),
                    io::Error::new(io::ErrorKind::Other, err.to_string()),
                )
            })?;
            fonts.insert((*name).to_owned(), data);
        }

        info!("Loaded {} fonts from {}", fonts.len(), directory.display());
        Ok(Self { fonts })
    }

    /// Each named font as a family whose four faces are the same font.
    fn family(&self, name: &str) -> Result<FontFamily<FontData>, ReportError> {
        self.fonts
            .get(name)
            .map(single_face_family)
            .ok_or_else(|| ReportError::UnknownFont(name.to_owned()))
    }

    /// Creates a document that uses [`DEFAULT_FONT_NAME`] by default.
    pub fn new_document(&self) -> Result<Document, ReportError> {
        Ok(Document::new(self.family(DEFAULT_FONT_NAME)?))
    }

    /// Adds every named font to `document`.
    pub fn install(&self, document: &mut Document) -> InstalledFonts {
        let families = self
            .fonts
            .iter()
            .map(|(name, data)| (name.clone(), document.add_font_family(single_face_family(data))))
            .collect();
        InstalledFonts { families }
    }
}

/// Font handles valid for the document they were installed into.
#[derive(Clone, Debug)]
pub struct InstalledFonts {
    families: BTreeMap<String, FontFamily<Font>>,
}

impl InstalledFonts {
    pub fn family(&self, name: &str) -> Result<FontFamily<Font>, ReportError> {
        self.families
            .get(name)
            .cloned()
            .ok_or_else(|| ReportError::UnknownFont(name.to_owned()))
    }

    /// Resolves a style record into a `genpdf` style.
    ///
    /// `genpdf` sets text in whole points and expresses leading as a multiple of the font's
    /// natural line height, which is taken to be 1.2 times the font size.
    pub fn style(&self, spec: &StyleSpec) -> Result<Style, ReportError> {
        let family = self.family(&spec.font_name)?;
        let line_spacing = if spec.font_size > 0.0 {
            (spec.leading / (spec.font_size * 1.2)).max(0.5)
        } else {
            1.0
        };
        Ok(Style::new()
            .with_font_family(family)
            .with_font_size(whole_points(spec.font_size))
            .with_line_spacing(line_spacing)
            .with_color(spec.color.into()))
    }
}

/// Rounds a point size to the whole-point sizes `genpdf` supports.
pub fn whole_points(size: f64) -> u8 {
    size.round().clamp(1.0, f64::from(u8::MAX)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_points_clamps_to_valid_range() {
        assert_eq!(whole_points(0.3), 1);
        assert_eq!(whole_points(10.6), 11);
        assert_eq!(whole_points(900.0), 255);
    }

    #[test]
    fn explicit_directory_is_checked_first() {
        let missing = PathBuf::from("/__toc_report_missing_fonts__");
        let candidates = font_directory_candidates(Some(&missing));
        assert_eq!(candidates.first(), Some(&missing));
        assert!(candidates.contains(&bundled_fonts_source_dir()));
    }

    #[test]
    fn missing_directory_is_reported() {
        let missing = PathBuf::from("/__toc_report_missing_fonts__");
        assert_eq!(missing_font_files(&missing).len(), FONT_FILES.len());
    }
}
