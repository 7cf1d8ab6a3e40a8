//! Core entry point for the toc_report crate.
//!
//! The crate renders paginated PDF reports whose table of contents and cross references point at
//! page numbers that are only known once layout has finished.  Every build runs the `genpdf`
//! layout at least twice: the first pass records where bookmarked headings land, later passes
//! render the table of contents from what the previous pass captured.  Link annotations, named
//! destinations and the document outline are added afterwards with `lopdf`.

pub mod builder;
pub mod config;
pub mod driver;
pub mod elements;
pub mod error;
pub mod fitter;
pub mod fonts;
pub mod links;
pub mod model;
pub mod pass;
pub mod report;
pub mod richtext;
pub mod style;
pub mod toc;
pub mod units;

pub use config::ReportConfig;
pub use driver::{RenderedReport, ReportBuilder};
pub use error::{BuildWarning, ReportError};
