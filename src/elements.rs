//! Element implementations built on top of `genpdf` primitives.
//!
//! [`ElementFactory`] turns the declarative content tree into fresh `genpdf` elements for every
//! layout pass.  The table of contents and cross-reference blocks draw their text fragment by
//! fragment so they know where every page number ends up and can record link regions for them.

use std::collections::BTreeMap;

use genpdf::elements::{CellDecorator, FrameCellDecorator, PageBreak, Paragraph, TableLayout};
use genpdf::error::Error;
use genpdf::fonts::FontCache;
use genpdf::style::{Color, Style, StyledString};
use genpdf::{render, Alignment, Element, Margins, Mm, Position, RenderResult, Size};

use crate::error::ReportError;
use crate::fitter::{fit_page_numbers, whole_point_size, Leader, PageRef, TextMeasure, WholePoints};
use crate::fonts::InstalledFonts;
use crate::model::{Block, BookmarkedHeading, HorizontalAlignment};
use crate::pass::PassRecorder;
use crate::richtext::{layout_spans, Line, Span};
use crate::style::{Rgb, StyleSheet, StyleSpec};
use crate::toc::{CrossRefAccumulator, HeadingEvent, TocAccumulator, TocEntry, TocRow};
use crate::units::{mm_from_f64, mm_from_pt, mm_to_f64, pt_from_mm, pt_to_mm};

const UNDERLINE_OFFSET_MM: f64 = 0.4;

/// Measures text with a resolved `genpdf` style, scaled linearly to the requested size.
///
/// Wrap it in [`WholePoints`] wherever the measured text is drawn with `genpdf`.
pub struct FontMeasure<'a> {
    font_cache: &'a FontCache,
    style: Style,
}

impl<'a> FontMeasure<'a> {
    pub fn new(font_cache: &'a FontCache, style: Style) -> Self {
        Self { font_cache, style }
    }
}

impl TextMeasure for FontMeasure<'_> {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let nominal = f64::from(self.style.font_size());
        pt_from_mm(self.style.str_width(self.font_cache, text)) * font_size / nominal
    }
}

/// Wraps a top-level element and keeps the pass recorder's cursor in sync with it.
pub struct Tracked {
    inner: Box<dyn Element>,
    recorder: PassRecorder,
}

impl Tracked {
    pub fn new(inner: Box<dyn Element>, recorder: PassRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl Element for Tracked {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        self.recorder.begin_block();
        let result = self.inner.render(context, area, style)?;
        self.recorder.advance(mm_to_f64(result.size.height));
        Ok(result)
    }
}

/// Fixed vertical whitespace.  A spacer that reaches the bottom of the page is cut off there.
pub struct Spacer {
    height: Mm,
}

impl Spacer {
    pub fn new(height: Mm) -> Self {
        Self { height }
    }
}

impl Element for Spacer {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let available = area.size().height;
        let mut result = RenderResult::default();
        result.size = Size::new(0, if self.height > available { available } else { self.height });
        Ok(result)
    }
}

/// Content inset by fixed margins.  The vertical margins only count once the content itself
/// rendered something, so a block pushed to the next page leaves nothing behind.
pub struct Inset {
    inner: Box<dyn Element>,
    top: Mm,
    right: Mm,
    bottom: Mm,
    left: Mm,
}

impl Inset {
    pub fn new(inner: Box<dyn Element>, top: Mm, right: Mm, bottom: Mm, left: Mm) -> Self {
        Self {
            inner,
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same margin on every side.
    pub fn uniform(inner: Box<dyn Element>, margin: Mm) -> Self {
        Self::new(inner, margin, margin, margin, margin)
    }

    /// Height the inset adds to content of `height`.
    fn outer_height(&self, height: Mm) -> Mm {
        if height > Mm::default() {
            height + self.top + self.bottom
        } else {
            height
        }
    }
}

impl Element for Inset {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        area.add_margins(Margins::trbl(self.top, self.right, self.bottom, self.left));
        let mut result = self.inner.render(context, area, style)?;
        result.size.height = self.outer_height(result.size.height);
        Ok(result)
    }
}

/// Draws the table grid in the table style's color.
///
/// `genpdf` strokes lines with the PDF default width, so only the color of the grid is taken
/// from the style.
pub struct GridDecorator {
    frame: FrameCellDecorator,
    color: Color,
}

impl GridDecorator {
    pub fn new(color: Color) -> Self {
        Self {
            frame: FrameCellDecorator::new(true, true, false),
            color,
        }
    }
}

impl CellDecorator for GridDecorator {
    fn set_table_size(&mut self, num_columns: usize, num_rows: usize) {
        self.frame.set_table_size(num_columns, num_rows);
    }

    fn decorate_cell(
        &mut self,
        column: usize,
        row: usize,
        has_more: bool,
        area: render::Area<'_>,
        _style: Style,
    ) {
        let style = Style::new().with_color(self.color);
        self.frame.decorate_cell(column, row, has_more, area, style);
    }
}

/// A paragraph that reports a [`HeadingEvent`] and places its anchor the first time any part
/// of it is rendered.
pub struct HeadingElement {
    inner: Box<dyn Element>,
    event: HeadingEvent,
    anchor: String,
    recorder: PassRecorder,
    placed: bool,
}

impl HeadingElement {
    pub fn new(heading: &BookmarkedHeading, inner: Box<dyn Element>, recorder: PassRecorder) -> Self {
        let anchor = heading.anchor().as_str().to_owned();
        let event = HeadingEvent {
            entry: TocEntry {
                level: heading.level(),
                text: heading.text().to_owned(),
                page: 0,
                anchor: Some(anchor.clone()),
            },
            group: heading.group().map(str::to_owned),
        };
        Self {
            inner,
            event,
            anchor,
            recorder,
            placed: false,
        }
    }
}

impl Element for HeadingElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let result = self.inner.render(context, area, style)?;
        if !self.placed && result.size.height > Mm::default() {
            self.placed = true;
            let mut event = self.event.clone();
            event.entry.page = self.recorder.page();
            self.recorder.record_anchor(&self.anchor, 0.0);
            self.recorder.record_heading(event);
        }
        Ok(result)
    }
}

/// Resolved style of one table of contents level.
#[derive(Clone, Debug)]
pub struct TocLevelStyle {
    pub style: Style,
    pub space_before: f64,
    pub left_indent: f64,
    pub leader: Leader,
}

/// The table of contents as rendered from the previous pass.
pub struct TocElement {
    rows: Vec<TocRow>,
    levels: Vec<TocLevelStyle>,
    recorder: PassRecorder,
    next: usize,
}

impl TocElement {
    pub fn new(rows: Vec<TocRow>, levels: Vec<TocLevelStyle>, recorder: PassRecorder) -> Self {
        Self {
            rows,
            levels,
            recorder,
            next: 0,
        }
    }

    fn level(&self, level: u8) -> Option<&TocLevelStyle> {
        self.levels
            .get(usize::from(level))
            .or_else(|| self.levels.last())
    }

    /// Draws one row with its top at `top` and returns the row height.
    fn render_row(
        &self,
        context: &genpdf::Context,
        area: &render::Area<'_>,
        row: &TocRow,
        level: &TocLevelStyle,
        top: Mm,
        dry_run: bool,
    ) -> Result<Mm, Error> {
        let font_cache = &context.font_cache;
        let measure = WholePoints(FontMeasure::new(font_cache, level.style));
        let nominal = f64::from(level.style.font_size());
        let indent = level.left_indent;
        let available = pt_from_mm(area.size().width) - indent;
        let line_height = level.style.line_height(font_cache);
        let text_top = top + mm_from_pt(level.space_before);

        let mut title = Span::new(row.text.clone());
        if let Some(anchor) = &row.anchor {
            title = title.linked(anchor.clone());
        }
        let spans = [title];
        let lines = layout_spans(&spans, &measure, nominal, available);
        let height = mm_from_pt(level.space_before) + line_height * lines.len() as f64;
        if dry_run {
            return Ok(height);
        }

        for (index, line) in lines.iter().enumerate() {
            let line_top = text_top + line_height * index as f64;
            for fragment in &line.fragments {
                let x = mm_from_pt(indent + fragment.x);
                area.print_str(font_cache, Position::new(x, line_top), level.style, &fragment.text)?;
                if let Some(anchor) = spans[fragment.span].link() {
                    self.recorder.record_link(
                        pt_to_mm(indent + fragment.x),
                        mm_to_f64(line_top),
                        pt_to_mm(fragment.width),
                        mm_to_f64(line_height),
                        anchor,
                    );
                }
            }
        }

        if let Some(page) = row.page {
            let last_top = text_top + line_height * (lines.len() - 1) as f64;
            let cursor_x = lines.last().map(|line| line.width).unwrap_or_default();
            let pages = [PageRef::new(page, row.anchor.clone())];
            let fitted = fit_page_numbers(
                &measure,
                &pages,
                cursor_x,
                available,
                nominal,
                &level.leader,
            );
            let number_style = level.style.with_font_size(whole_point_size(fitted.font_size));
            if !fitted.lead.is_empty() {
                area.print_str(
                    font_cache,
                    Position::new(mm_from_pt(indent + fitted.lead_x), last_top),
                    number_style,
                    &fitted.lead,
                )?;
            }
            area.print_str(
                font_cache,
                Position::new(mm_from_pt(indent + fitted.numbers_x), last_top),
                number_style,
                &fitted.numbers,
            )?;
            for link in &fitted.links {
                self.recorder.record_link(
                    pt_to_mm(indent + link.x),
                    mm_to_f64(last_top),
                    pt_to_mm(link.width),
                    mm_to_f64(line_height),
                    &link.anchor,
                );
            }
        }

        Ok(height)
    }
}

impl Element for TocElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let available = area.size().height;
        let mut top = Mm::default();

        while self.next < self.rows.len() {
            let row = &self.rows[self.next];
            let Some(level) = self.level(row.level) else {
                self.next += 1;
                continue;
            };
            let height = self.render_row(context, &area, row, level, top, true)?;
            if top + height > available {
                result.has_more = true;
                break;
            }
            self.render_row(context, &area, row, level, top, false)?;
            top += height;
            self.next += 1;
        }

        if top > Mm::default() {
            result.size = Size::new(area.size().width, top);
        }
        Ok(result)
    }
}

/// Border drawn around a cross-reference paragraph.
#[derive(Clone, Copy, Debug)]
pub struct Border {
    pub width: f64,
    pub color: Rgb,
}

/// A cross-reference sentence with underlined, linked page numbers.
pub struct CrossRefElement {
    spans: Vec<Span>,
    style: Style,
    alignment: HorizontalAlignment,
    border: Option<Border>,
    recorder: PassRecorder,
    lines: Option<Vec<Line>>,
    next_line: usize,
}

impl CrossRefElement {
    pub fn new(spans: Vec<Span>, spec: &StyleSpec, style: Style, recorder: PassRecorder) -> Self {
        let border = (spec.border_width > 0.0).then_some(Border {
            width: spec.border_width,
            color: spec.border_color,
        });
        Self {
            spans,
            style,
            alignment: spec.alignment,
            border,
            recorder,
            lines: None,
            next_line: 0,
        }
    }

    fn inset(&self) -> f64 {
        self.border.map(|border| border.width * 2.0).unwrap_or_default()
    }
}

impl Element for CrossRefElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let font_cache = &context.font_cache;
        let inset = self.inset();
        let width = pt_from_mm(area.size().width) - 2.0 * inset;

        if self.lines.is_none() {
            let measure = WholePoints(FontMeasure::new(font_cache, self.style));
            let nominal = f64::from(self.style.font_size());
            self.lines = Some(layout_spans(&self.spans, &measure, nominal, width));
        }
        let lines = self.lines.as_deref().unwrap_or_default();

        let line_height = self.style.line_height(font_cache);
        let glyph_height = self
            .style
            .font(font_cache)
            .glyph_height(self.style.font_size());
        let inset_mm = mm_from_pt(inset);
        let available = area.size().height - inset_mm * 2.0;

        let mut result = RenderResult::default();
        let mut top = Mm::default();
        let mut drawn = 0;

        for line in &lines[self.next_line..] {
            if top + line_height > available {
                result.has_more = true;
                break;
            }
            let line_top = inset_mm + top;
            let offset = match self.alignment {
                HorizontalAlignment::Center => (width - line.width) / 2.0,
                HorizontalAlignment::Right => width - line.width,
                HorizontalAlignment::Left | HorizontalAlignment::Justified => 0.0,
            };

            for fragment in &line.fragments {
                let span = &self.spans[fragment.span];
                let style = span.style_on(self.style);
                let x = inset + offset + fragment.x;
                area.print_str(font_cache, Position::new(mm_from_pt(x), line_top), style, &fragment.text)?;

                if span.is_underlined() {
                    let baseline = line_top + glyph_height + mm_from_f64(UNDERLINE_OFFSET_MM);
                    let mut line_style = Style::new();
                    if let Some(color) = style.color() {
                        line_style = line_style.with_color(color);
                    }
                    area.draw_line(
                        vec![
                            Position::new(mm_from_pt(x), baseline),
                            Position::new(mm_from_pt(x + fragment.width), baseline),
                        ],
                        line_style,
                    );
                }

                if let Some(anchor) = span.link() {
                    self.recorder.record_link(
                        pt_to_mm(x),
                        mm_to_f64(line_top),
                        pt_to_mm(fragment.width),
                        mm_to_f64(line_height),
                        anchor,
                    );
                }
            }

            top += line_height;
            drawn += 1;
        }
        self.next_line += drawn;
        if drawn == 0 {
            return Ok(result);
        }

        let height = top + inset_mm * 2.0;
        if let Some(border) = self.border {
            let right = area.size().width;
            area.draw_line(
                vec![
                    Position::new(0, 0),
                    Position::new(right, 0),
                    Position::new(right, height),
                    Position::new(0, height),
                    Position::new(0, 0),
                ],
                Style::new().with_color(border.color.into()),
            );
        }

        result.size = Size::new(area.size().width, height);
        Ok(result)
    }
}

/// Builds the elements of one layout pass.
pub struct ElementFactory<'a> {
    styles: &'a StyleSheet,
    fonts: &'a InstalledFonts,
    recorder: PassRecorder,
    toc: &'a TocAccumulator,
    cross_refs: &'a BTreeMap<String, CrossRefAccumulator>,
    toc_levels: Vec<TocLevelStyle>,
}

impl<'a> ElementFactory<'a> {
    /// `toc_levels` lists the style name and leader of each table of contents level.
    pub fn new(
        styles: &'a StyleSheet,
        fonts: &'a InstalledFonts,
        recorder: PassRecorder,
        toc: &'a TocAccumulator,
        cross_refs: &'a BTreeMap<String, CrossRefAccumulator>,
        toc_levels: &[(String, Leader)],
    ) -> Result<Self, ReportError> {
        let toc_levels = toc_levels
            .iter()
            .map(|(style, leader)| {
                let spec = styles.get(style)?;
                Ok(TocLevelStyle {
                    style: fonts.style(spec)?,
                    space_before: spec.space_before,
                    left_indent: spec.left_indent,
                    leader: leader.clone(),
                })
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        Ok(Self {
            styles,
            fonts,
            recorder,
            toc,
            cross_refs,
            toc_levels,
        })
    }

    /// Builds a top-level element that keeps the recorder's cursor up to date.
    pub fn top_level(&self, block: &Block) -> Result<Tracked, ReportError> {
        Ok(Tracked::new(self.build(block)?, self.recorder.clone()))
    }

    /// Builds the element for `block` and, recursively, for its children.
    pub fn build(&self, block: &Block) -> Result<Box<dyn Element>, ReportError> {
        let element: Box<dyn Element> = match block {
            Block::Text(text) => self.paragraph(&text.text, self.styles.get(&text.style)?)?,
            Block::Heading(heading) => {
                let spec = self
                    .styles
                    .get(heading.style())?
                    .with_overrides(heading.overrides());
                let paragraph = self.paragraph(heading.text(), &spec)?;
                Box::new(HeadingElement::new(heading, paragraph, self.recorder.clone()))
            }
            Block::Spacer(height) => Box::new(Spacer::new(mm_from_f64(*height))),
            Block::Table(table) => {
                let grid = self.styles.table(table.style())?;
                let columns = table.columns().max(1);
                let mut layout = TableLayout::new(vec![1; columns]);
                layout.set_cell_decorator(GridDecorator::new(grid.grid_color.into()));
                let padding = mm_from_pt(grid.cell_padding);
                for row in table.rows() {
                    let mut cells = Vec::with_capacity(columns);
                    for cell in row {
                        cells.push(Box::new(Inset::uniform(self.build(cell)?, padding)) as Box<dyn Element>);
                    }
                    while cells.len() < columns {
                        cells.push(Box::new(Paragraph::default().aligned(grid.cell_alignment.into())));
                    }
                    layout.push_row(cells)?;
                }
                Box::new(layout)
            }
            Block::TableOfContents => Box::new(TocElement::new(
                self.toc.rows(),
                self.toc_levels.clone(),
                self.recorder.clone(),
            )),
            Block::CrossReference(cross_ref) => {
                let spec = self.styles.get("customLinkStyle")?;
                let spans = match self.cross_refs.get(&cross_ref.group) {
                    Some(accumulator) => accumulator.sentence(&cross_ref.label),
                    None => CrossRefAccumulator::new(cross_ref.group.clone()).sentence(&cross_ref.label),
                };
                Box::new(CrossRefElement::new(
                    spans,
                    spec,
                    self.fonts.style(spec)?,
                    self.recorder.clone(),
                ))
            }
            Block::PageBreak => Box::new(PageBreak::new()),
        };
        Ok(element)
    }

    fn paragraph(&self, text: &str, spec: &StyleSpec) -> Result<Box<dyn Element>, ReportError> {
        let style = self.fonts.style(spec)?;
        let alignment: Alignment = spec.alignment.into();
        let paragraph = Paragraph::new(StyledString::new(text.to_owned(), style)).aligned(alignment);
        Ok(Box::new(Inset::new(
            Box::new(paragraph),
            mm_from_pt(spec.space_before),
            Mm::default(),
            mm_from_pt(spec.space_after),
            mm_from_pt(spec.left_indent),
        )))
    }
}
