//! The style registry.
//!
//! Styles are immutable records looked up by name when paragraphs, headings and tables are
//! turned into layout elements.  Call sites that need a variation derive a new record through
//! [`StyleOverrides`] instead of changing the registered one.

use std::collections::BTreeMap;

use genpdf::style::Color;

use crate::error::ReportError;
use crate::model::HorizontalAlignment;

/// RGB color used by style records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    }
}

/// Typographic attributes of a paragraph style.  Lengths are in points.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleSpec {
    pub name: String,
    pub font_name: String,
    pub font_size: f64,
    pub leading: f64,
    pub color: Rgb,
    pub alignment: HorizontalAlignment,
    pub space_before: f64,
    pub space_after: f64,
    pub left_indent: f64,
    pub border_width: f64,
    pub border_color: Rgb,
}

impl StyleSpec {
    /// Creates a style with the given font and size, a leading of 1.2 times the size and
    /// everything else left at its neutral value.
    pub fn new(name: impl Into<String>, font_name: impl Into<String>, font_size: f64) -> Self {
        Self {
            name: name.into(),
            font_name: font_name.into(),
            font_size,
            leading: font_size * 1.2,
            color: Rgb::BLACK,
            alignment: HorizontalAlignment::Left,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
            border_width: 0.0,
            border_color: Rgb::BLACK,
        }
    }

    fn leading(mut self, leading: f64) -> Self {
        self.leading = leading;
        self
    }

    fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    fn aligned(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    fn space_after(mut self, space: f64) -> Self {
        self.space_after = space;
        self
    }

    fn indent(mut self, indent: f64) -> Self {
        self.left_indent = indent;
        self
    }

    fn border(mut self, width: f64, color: Rgb) -> Self {
        self.border_width = width;
        self.border_color = color;
        self
    }

    /// Derives a new record with the overrides applied; `self` is left untouched.
    pub fn with_overrides(&self, overrides: &StyleOverrides) -> StyleSpec {
        let mut derived = self.clone();
        if let Some(font_name) = &overrides.font_name {
            derived.font_name = font_name.clone();
        }
        if let Some(font_size) = overrides.font_size {
            derived.font_size = font_size;
        }
        if let Some(leading) = overrides.leading {
            derived.leading = leading;
        }
        if let Some(color) = overrides.color {
            derived.color = color;
        }
        if let Some(alignment) = overrides.alignment {
            derived.alignment = alignment;
        }
        if let Some(space_before) = overrides.space_before {
            derived.space_before = space_before;
        }
        if let Some(space_after) = overrides.space_after {
            derived.space_after = space_after;
        }
        if let Some(left_indent) = overrides.left_indent {
            derived.left_indent = left_indent;
        }
        derived
    }
}

/// Per-use adjustments to a registered style.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleOverrides {
    font_name: Option<String>,
    font_size: Option<f64>,
    leading: Option<f64>,
    color: Option<Rgb>,
    alignment: Option<HorizontalAlignment>,
    space_before: Option<f64>,
    space_after: Option<f64>,
    left_indent: Option<f64>,
}

impl StyleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether no attribute is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn font_name(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = Some(font_name.into());
        self
    }

    pub fn font_size(mut self, font_size: f64) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn leading(mut self, leading: f64) -> Self {
        self.leading = Some(leading);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn space_before(mut self, space: f64) -> Self {
        self.space_before = Some(space);
        self
    }

    pub fn space_after(mut self, space: f64) -> Self {
        self.space_after = Some(space);
        self
    }

    pub fn left_indent(mut self, indent: f64) -> Self {
        self.left_indent = Some(indent);
        self
    }
}

/// Grid and cell attributes of a table style.  Lengths are in points.
#[derive(Clone, Debug, PartialEq)]
pub struct TableStyleSpec {
    pub name: String,
    pub grid_width: f64,
    pub grid_color: Rgb,
    pub cell_padding: f64,
    pub cell_alignment: HorizontalAlignment,
}

/// Name-indexed collection of paragraph and table styles.
#[derive(Clone, Debug, Default)]
pub struct StyleSheet {
    paragraphs: BTreeMap<String, StyleSpec>,
    tables: BTreeMap<String, TableStyleSpec>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a paragraph style.  A style registered under an existing name is ignored so
    /// records stay immutable once registered; the return value reports whether it was added.
    pub fn add(&mut self, spec: StyleSpec) -> bool {
        if self.paragraphs.contains_key(&spec.name) {
            return false;
        }
        self.paragraphs.insert(spec.name.clone(), spec);
        true
    }

    /// Registers a table style with the same rules as [`StyleSheet::add`].
    pub fn add_table(&mut self, spec: TableStyleSpec) -> bool {
        if self.tables.contains_key(&spec.name) {
            return false;
        }
        self.tables.insert(spec.name.clone(), spec);
        true
    }

    pub fn get(&self, name: &str) -> Result<&StyleSpec, ReportError> {
        self.paragraphs
            .get(name)
            .ok_or_else(|| ReportError::UnknownStyle(name.to_owned()))
    }

    pub fn table(&self, name: &str) -> Result<&TableStyleSpec, ReportError> {
        self.tables
            .get(name)
            .ok_or_else(|| ReportError::UnknownStyle(name.to_owned()))
    }

    pub fn paragraph_styles(&self) -> impl Iterator<Item = &StyleSpec> {
        self.paragraphs.values()
    }

    pub fn table_styles(&self) -> impl Iterator<Item = &TableStyleSpec> {
        self.tables.values()
    }

    /// The styles used by the sample report.
    pub fn report_defaults() -> Self {
        const LIGHT: &str = "NotoSansTC-Light";

        let mut sheet = Self::new();
        sheet.add(StyleSpec::new("Normal", "NotoSansTC-Regular", 10.0).leading(12.0));
        sheet.add(StyleSpec::new("Heading1OfTOC", LIGHT, 14.0).leading(16.0));
        sheet.add(
            StyleSpec::new("Heading2OfTOC", LIGHT, 12.0)
                .leading(14.0)
                .indent(5.0),
        );
        sheet.add(StyleSpec::new("customLinkStyle", LIGHT, 10.0).border(1.0, Rgb::BLACK));
        sheet.add(
            StyleSpec::new("paragraphStyle", "NotoSansTC-Regular", 30.0)
                .aligned(HorizontalAlignment::Center),
        );
        sheet.add(
            StyleSpec::new("titleTOC", LIGHT, 16.0)
                .color(Rgb(44, 153, 132))
                .space_after(15.0),
        );
        sheet.add(StyleSpec::new("subHeaderStyle", "NotoSansTC-Bold", 18.0));
        sheet.add(
            StyleSpec::new("footerStyle", "AdobeSongStd-Light", 12.0)
                .aligned(HorizontalAlignment::Center),
        );
        sheet.add(
            StyleSpec::new("tableCellStyle", "NotoSansTC-Regular", 10.0)
                .aligned(HorizontalAlignment::Center),
        );
        sheet.add_table(TableStyleSpec {
            name: "tableStyle".to_owned(),
            grid_width: 0.5,
            grid_color: Rgb::RED,
            cell_padding: 0.0,
            cell_alignment: HorizontalAlignment::Center,
        });
        sheet
    }
}
