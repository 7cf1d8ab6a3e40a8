//! Error and warning types shared across the crate.

use std::fmt;
use std::path::PathBuf;

use crate::links::NavigationError;

/// Errors that abort a report build.
///
/// There is no partial-output contract: any failure from the layout engine, the font loader or
/// the navigation post-processing propagates to the caller unchanged.
#[derive(Debug)]
pub enum ReportError {
    /// `genpdf` failed to lay out or write the document.
    Layout(genpdf::error::Error),
    /// Link annotations, destinations or the outline could not be embedded.
    Navigation(NavigationError),
    /// Reading or writing a file failed.
    Io(std::io::Error),
    /// The configuration file could not be parsed.
    Config {
        /// Path of the offending configuration file.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
    /// A block refers to a style that is not registered.
    UnknownStyle(String),
    /// A style refers to a font that was not loaded.
    UnknownFont(String),
    /// A heading present in the content tree produced no event during a pass.
    HeadingNotPlaced {
        /// Display text of the missing heading.
        text: String,
        /// One-based pass number.
        pass: usize,
    },
    /// The captured entries still changed after the final allowed pass.
    NotConverged {
        /// Number of passes that were run.
        passes: usize,
    },
    /// Cross-reference groups that never matched a heading, reported in strict mode.
    UnmatchedCrossReferences(Vec<String>),
}

impl From<genpdf::error::Error> for ReportError {
    fn from(err: genpdf::error::Error) -> Self {
        Self::Layout(err)
    }
}

impl From<NavigationError> for ReportError {
    fn from(err: NavigationError) -> Self {
        Self::Navigation(err)
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "Failed to lay out the document: {err}"),
            Self::Navigation(err) => write!(f, "Failed to embed document navigation: {err}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Config { path, source } => write!(
                f,
                "Failed to parse configuration file {}: {}",
                path.display(),
                source
            ),
            Self::UnknownStyle(name) => write!(f, "Style '{name}' is not registered"),
            Self::UnknownFont(name) => write!(f, "Font '{name}' is not loaded"),
            Self::HeadingNotPlaced { text, pass } => write!(
                f,
                "Heading '{text}' was never placed during layout pass {pass}"
            ),
            Self::NotConverged { passes } => write!(
                f,
                "Page numbers did not settle after {passes} layout passes"
            ),
            Self::UnmatchedCrossReferences(groups) => write!(
                f,
                "Cross-reference groups without any matching heading: {}",
                groups.join(", ")
            ),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            Self::Navigation(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config { source, .. } => Some(source),
            Self::UnknownStyle(_)
            | Self::UnknownFont(_)
            | Self::HeadingNotPlaced { .. }
            | Self::NotConverged { .. }
            | Self::UnmatchedCrossReferences(_) => None,
        }
    }
}

/// Findings that do not abort a build but most likely indicate a configuration mistake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildWarning {
    /// A cross-reference block whose group key never matched a heading; it still shows its
    /// placeholder text in the final document.
    UnmatchedCrossReference {
        /// The group key of the block.
        group: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedCrossReference { group } => write!(
                f,
                "cross-reference group '{group}' matched no heading and still shows its placeholder"
            ),
        }
    }
}
