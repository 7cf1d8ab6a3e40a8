//! Forward-reference accumulators for the table of contents and cross references.
//!
//! Headings report a [`HeadingEvent`] once they have been placed.  Accumulators collect the
//! events of the running pass but always *render* the entries captured during the previous pass,
//! because page numbers of the running pass are not final while it is being laid out.
//! [`Accumulator::begin_pass`] moves the captured entries over to the rendered side.

use genpdf::style::Color;

use crate::richtext::Span;
use crate::style::Rgb;

/// Text shown by a table of contents before anything has been captured.
pub const TOC_PLACEHOLDER: &str = "Placeholder for table of contents";

/// Text shown by a cross-reference block before anything has been captured; the same row the
/// table of contents starts from.
pub const CROSS_REF_PLACEHOLDER: &str = TOC_PLACEHOLDER;

/// One table of contents line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// Style category; only used to pick the row style.
    pub level: u8,
    pub text: String,
    /// One-based page number.
    pub page: u32,
    pub anchor: Option<String>,
}

/// Reported by a heading once per pass, after it has been placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingEvent {
    pub entry: TocEntry,
    /// Cross-reference group; `None` for table of contents headings.
    pub group: Option<String>,
}

/// A [`TocEntry`] belonging to a cross-reference group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossRefEntry {
    pub entry: TocEntry,
    pub group: String,
}

/// Receives heading events and keeps what the previous pass captured.
pub trait Accumulator {
    /// Offers an event of the running pass.  Implementations keep only the events they accept.
    fn notify(&mut self, event: &HeadingEvent);

    /// Freezes the entries captured so far as the ones to render and starts capturing afresh.
    fn begin_pass(&mut self);

    /// Returns whether the running pass captured exactly the entries that were rendered.
    fn is_settled(&self) -> bool;

    /// Returns whether the rendered side is still empty.
    fn is_placeholder(&self) -> bool;
}

#[derive(Clone, Debug)]
struct EntryLog<T> {
    captured: Vec<T>,
    rendered: Vec<T>,
}

impl<T> Default for EntryLog<T> {
    fn default() -> Self {
        Self {
            captured: Vec::new(),
            rendered: Vec::new(),
        }
    }
}

impl<T: PartialEq> EntryLog<T> {
    fn begin_pass(&mut self) {
        self.rendered = std::mem::take(&mut self.captured);
    }

    fn is_settled(&self) -> bool {
        self.captured == self.rendered
    }
}

/// A row of the rendered table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocRow {
    pub level: u8,
    pub text: String,
    /// `None` for the placeholder row.
    pub page: Option<u32>,
    pub anchor: Option<String>,
}

/// Accepts every table of contents heading.
#[derive(Clone, Debug, Default)]
pub struct TocAccumulator {
    log: EntryLog<TocEntry>,
}

impl TocAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries rendered in the running pass.
    pub fn rendered(&self) -> &[TocEntry] {
        &self.log.rendered
    }

    /// Entries captured in the running pass so far.
    pub fn captured(&self) -> &[TocEntry] {
        &self.log.captured
    }

    /// The rows to draw: one per rendered entry in capture order, or a single placeholder row.
    pub fn rows(&self) -> Vec<TocRow> {
        if self.log.rendered.is_empty() {
            return vec![TocRow {
                level: 0,
                text: TOC_PLACEHOLDER.to_owned(),
                page: None,
                anchor: None,
            }];
        }
        self.log
            .rendered
            .iter()
            .map(|entry| TocRow {
                level: entry.level,
                text: entry.text.clone(),
                page: Some(entry.page),
                anchor: entry.anchor.clone(),
            })
            .collect()
    }
}

impl Accumulator for TocAccumulator {
    fn notify(&mut self, event: &HeadingEvent) {
        if event.group.is_none() {
            self.log.captured.push(event.entry.clone());
        }
    }

    fn begin_pass(&mut self) {
        self.log.begin_pass();
    }

    fn is_settled(&self) -> bool {
        self.log.is_settled()
    }

    fn is_placeholder(&self) -> bool {
        self.log.rendered.is_empty()
    }
}

/// Accepts the headings of one group.
#[derive(Clone, Debug)]
pub struct CrossRefAccumulator {
    group: String,
    log: EntryLog<CrossRefEntry>,
}

/// Color of linked page numbers inside cross-reference sentences.
pub const LINK_COLOR: Rgb = Rgb::BLUE;

impl CrossRefAccumulator {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            log: EntryLog::default(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn rendered(&self) -> &[CrossRefEntry] {
        &self.log.rendered
    }

    pub fn captured(&self) -> &[CrossRefEntry] {
        &self.log.captured
    }

    /// Composes the sentence drawn for this group: the placeholder text while nothing has been
    /// captured, otherwise `label` followed by one linked page number per rendered entry.
    pub fn sentence(&self, label: &str) -> Vec<Span> {
        if self.log.rendered.is_empty() {
            return vec![Span::new(CROSS_REF_PLACEHOLDER)];
        }

        let mut spans = vec![Span::new(format!(
            "{label} For {}, please refer to page: ",
            self.group
        ))];
        for (index, cross_ref) in self.log.rendered.iter().enumerate() {
            if index > 0 {
                spans.push(Span::new(", "));
            }
            let entry = &cross_ref.entry;
            spans.push(Span::new(format!("{}: ", entry.text)));
            let mut page = Span::new(entry.page.to_string())
                .colored(Color::from(LINK_COLOR))
                .underline();
            if let Some(anchor) = &entry.anchor {
                page = page.linked(anchor.clone());
            }
            spans.push(page);
        }
        spans
    }
}

impl Accumulator for CrossRefAccumulator {
    fn notify(&mut self, event: &HeadingEvent) {
        if event.group.as_deref() == Some(self.group.as_str()) {
            self.log.captured.push(CrossRefEntry {
                entry: event.entry.clone(),
                group: self.group.clone(),
            });
        }
    }

    fn begin_pass(&mut self) {
        self.log.begin_pass();
    }

    fn is_settled(&self) -> bool {
        self.log.is_settled()
    }

    fn is_placeholder(&self) -> bool {
        self.log.rendered.is_empty()
    }
}
