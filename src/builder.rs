//! Document construction helpers for the toc_report crate.
//!
//! Every layout pass starts from a fresh `genpdf::Document` because rendering consumes it.
//! [`DocumentBuilder`] installs the fonts, sets the paper size and attaches the [`PageFrame`]
//! decorator that draws the page furniture and announces new pages to the pass recorder.

use genpdf::error::{Error, ErrorKind};
use genpdf::style;
use genpdf::{self, Margins, Mm, PageDecorator, Position, Size};

use crate::config::PageConfig;
use crate::error::ReportError;
use crate::fonts::{FontRegistry, InstalledFonts};
use crate::model::HorizontalAlignment;
use crate::pass::PassRecorder;
use crate::style::StyleSpec;
use crate::units::{mm_from_f64, mm_to_f64};

/// Builder for `genpdf::Document` instances pre-configured for one layout pass.
pub struct DocumentBuilder<'a> {
    fonts: &'a FontRegistry,
    page: PageConfig,
    title: Option<String>,
    footer: Option<StyleSpec>,
}

impl<'a> DocumentBuilder<'a> {
    /// Creates a new builder instance with default page settings.
    pub fn new(fonts: &'a FontRegistry) -> Self {
        Self {
            fonts,
            page: PageConfig::default(),
            title: None,
            footer: None,
        }
    }

    /// Sets the paper size, margins and frame used for newly created documents.
    pub fn with_page(mut self, page: PageConfig) -> Self {
        self.page = page;
        self
    }

    /// Sets the document title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Draws the page number on every page using the given style.
    pub fn with_footer(mut self, style: StyleSpec) -> Self {
        self.footer = Some(style);
        self
    }

    /// Builds a document whose page decorator reports to `recorder`.
    pub fn build(
        self,
        recorder: &PassRecorder,
    ) -> Result<(genpdf::Document, InstalledFonts), ReportError> {
        let mut document = self.fonts.new_document()?;
        let fonts = self.fonts.install(&mut document);

        document.set_paper_size(Size::new(
            mm_from_f64(self.page.width_mm),
            mm_from_f64(self.page.height_mm),
        ));
        if let Some(title) = self.title {
            document.set_title(title);
        }

        let footer = match self.footer {
            Some(spec) => Some(FooterSpec {
                style: fonts.style(&spec)?,
                alignment: spec.alignment,
                offset: mm_from_f64(self.page.footer_offset_mm),
            }),
            None => None,
        };

        document.set_page_decorator(PageFrame::new(self.page, footer, recorder.clone()));
        Ok((document, fonts))
    }
}

/// Running footer that shows the page number.
pub struct FooterSpec {
    style: style::Style,
    alignment: HorizontalAlignment,
    /// Distance of the baseline from the bottom edge of the page.
    offset: Mm,
}

/// Draws the frame boundary and footer and insets the content area by margins and padding.
pub struct PageFrame {
    page: PageConfig,
    footer: Option<FooterSpec>,
    recorder: PassRecorder,
}

impl PageFrame {
    pub fn new(page: PageConfig, footer: Option<FooterSpec>, recorder: PassRecorder) -> Self {
        Self {
            page,
            footer,
            recorder,
        }
    }

    fn draw_footer(
        &self,
        footer: &FooterSpec,
        context: &genpdf::Context,
        area: &genpdf::render::Area<'_>,
        page_number: u32,
    ) -> Result<(), Error> {
        let text = page_number.to_string();
        let size = area.size();
        let width = footer.style.str_width(&context.font_cache, &text);
        let x = match footer.alignment {
            HorizontalAlignment::Center => (size.width - width) / 2.0,
            HorizontalAlignment::Right => size.width - mm_from_f64(self.page.margin_mm) - width,
            HorizontalAlignment::Left | HorizontalAlignment::Justified => {
                mm_from_f64(self.page.margin_mm)
            }
        };
        let glyph_height = footer
            .style
            .font(&context.font_cache)
            .glyph_height(footer.style.font_size());
        let top = size.height - footer.offset - glyph_height;

        if !area.print_str(&context.font_cache, Position::new(x, top), footer.style, text)? {
            return Err(Error::new(
                "Footer does not fit into the page",
                ErrorKind::PageSizeExceeded,
            ));
        }
        Ok(())
    }
}

impl PageDecorator for PageFrame {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        _style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        let page_number = self.recorder.begin_page();

        if let Some(footer) = &self.footer {
            self.draw_footer(footer, context, &area, page_number)?;
        }

        area.add_margins(Margins::all(mm_from_f64(self.page.margin_mm)));

        let frame = area.size();
        if mm_to_f64(frame.width) <= 0.0 || mm_to_f64(frame.height) <= 0.0 {
            return Err(Error::new(
                "Page margins leave no room for content",
                ErrorKind::InvalidData,
            ));
        }

        if self.page.show_frame_boundary {
            area.draw_line(
                vec![
                    Position::new(0, 0),
                    Position::new(frame.width, 0),
                    Position::new(frame.width, frame.height),
                    Position::new(0, frame.height),
                    Position::new(0, 0),
                ],
                style::Style::new(),
            );
        }

        let (pad_x, pad_y) = self.page.frame_padding();
        area.add_margins(Margins::trbl(
            mm_from_f64(pad_y),
            mm_from_f64(pad_x),
            mm_from_f64(pad_y),
            mm_from_f64(pad_x),
        ));

        Ok(area)
    }
}
