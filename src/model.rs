//! Declarative content tree of a report.
//!
//! A report is a flat sequence of [`Block`]s.  Blocks only describe *what* goes into the
//! document; they are turned into `genpdf` elements anew for every layout pass by
//! [`crate::elements::ElementFactory`].  Containers expose their nested blocks through
//! [`Block::children`], which is all [`walk`] needs to reach headings at any depth.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::style::StyleOverrides;

/// Horizontal alignment of a paragraph or table cell.
///
/// The variants map to [`genpdf::Alignment`]; `Justified` falls back to left alignment because
/// the layout engine does not justify text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
    /// Fully justified paragraphs.
    Justified,
}

impl From<HorizontalAlignment> for genpdf::Alignment {
    fn from(alignment: HorizontalAlignment) -> Self {
        match alignment {
            HorizontalAlignment::Left | HorizontalAlignment::Justified => genpdf::Alignment::Left,
            HorizontalAlignment::Center => genpdf::Alignment::Center,
            HorizontalAlignment::Right => genpdf::Alignment::Right,
        }
    }
}

/// Name of a link target inside the document.
///
/// Generated names hash the heading text together with a random nonce, so two headings with the
/// same text still get distinct anchors.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorName(String);

impl AnchorName {
    /// Generates a fresh collision-resistant anchor name for `text`.
    pub fn generate(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(Uuid::new_v4().as_bytes());
        let digest = hasher.finalize();
        let hex = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Self(hex)
    }

    /// Uses `name` verbatim.  The caller is responsible for its uniqueness.
    pub fn explicit(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnchorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A heading that reports where it lands so tables of contents and cross references can point
/// at it.
///
/// Headings without a group key feed the table of contents; headings with a group key feed the
/// cross-reference blocks of that group.
#[derive(Clone, Debug, PartialEq)]
pub struct BookmarkedHeading {
    text: String,
    style: String,
    overrides: StyleOverrides,
    level: u8,
    anchor: AnchorName,
    group: Option<String>,
}

impl BookmarkedHeading {
    /// Creates a level-0 heading with a generated anchor.
    pub fn new(text: impl Into<String>, style: impl Into<String>) -> Self {
        let text = text.into();
        let anchor = AnchorName::generate(&text);
        Self {
            text,
            style: style.into(),
            overrides: StyleOverrides::default(),
            level: 0,
            anchor,
            group: None,
        }
    }

    /// Routes the heading to the cross-reference blocks of `group`.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Replaces the generated anchor.
    pub fn with_anchor(mut self, anchor: AnchorName) -> Self {
        self.anchor = anchor;
        self
    }

    /// Sets the level used to pick the table of contents style.
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Applies per-use style overrides on top of the named style.
    pub fn with_overrides(mut self, overrides: StyleOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn overrides(&self) -> &StyleOverrides {
        &self.overrides
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn anchor(&self) -> &AnchorName {
        &self.anchor
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

/// Plain paragraph rendered with a registered style.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub style: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
        }
    }
}

/// A grid of blocks with equally wide columns.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    rows: Vec<Vec<Block>>,
    columns: usize,
    style: String,
    cell_style: String,
}

impl TableBlock {
    /// Creates an empty table with the given table style and the paragraph style used for text
    /// cells.
    pub fn new(style: impl Into<String>, cell_style: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            columns: 0,
            style: style.into(),
            cell_style: cell_style.into(),
        }
    }

    /// Appends a row.  Rows shorter than the widest row are padded with empty cells at layout
    /// time.
    pub fn with_row<I>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        let row: Vec<Block> = cells.into_iter().collect();
        self.columns = self.columns.max(row.len());
        self.rows.push(row);
        self
    }

    /// Appends a row of plain text cells.
    pub fn with_text_row<I, S>(self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let style = self.cell_style.clone();
        self.with_row(
            cells
                .into_iter()
                .map(|text| Block::Text(TextBlock::new(text, style.clone()))),
        )
    }

    pub fn rows(&self) -> &[Vec<Block>] {
        &self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn style(&self) -> &str {
        &self.style
    }
}

/// A paragraph listing every heading of `group` with a link to its page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossRefBlock {
    pub group: String,
    pub label: String,
}

impl CrossRefBlock {
    pub fn new(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            label: label.into(),
        }
    }
}

/// Individual content blocks that make up a report.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Styled paragraph content.
    Text(TextBlock),
    /// A heading that reports its page.
    Heading(BookmarkedHeading),
    /// Vertical whitespace in millimetres.
    Spacer(f64),
    /// Grid of nested blocks.
    Table(TableBlock),
    /// The table of contents, rendered from the previous pass.
    TableOfContents,
    /// A cross-reference paragraph, rendered from the previous pass.
    CrossReference(CrossRefBlock),
    /// Explicit page break request.
    PageBreak,
}

impl Block {
    /// Convenience helper for building a paragraph block.
    pub fn text(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self::Text(TextBlock::new(text, style))
    }

    /// Convenience helper for building a cross-reference block.
    pub fn cross_reference(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self::CrossReference(CrossRefBlock::new(group, label))
    }

    /// Returns the heading carried by this block, if it is heading-like.
    pub fn as_heading(&self) -> Option<&BookmarkedHeading> {
        match self {
            Self::Heading(heading) => Some(heading),
            _ => None,
        }
    }

    /// Returns the blocks nested directly inside this one.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Block> + '_> {
        match self {
            Self::Table(table) => Box::new(table.rows.iter().flatten()),
            _ => Box::new(std::iter::empty()),
        }
    }
}

impl From<BookmarkedHeading> for Block {
    fn from(heading: BookmarkedHeading) -> Self {
        Self::Heading(heading)
    }
}

impl From<TableBlock> for Block {
    fn from(table: TableBlock) -> Self {
        Self::Table(table)
    }
}

/// Visits every block of `blocks` in document order, parents before their children.
pub fn walk<'a, I, F>(blocks: I, visit: &mut F)
where
    I: IntoIterator<Item = &'a Block>,
    F: FnMut(&'a Block),
{
    for block in blocks {
        visit(block);
        walk(block.children(), visit);
    }
}

/// Collects every heading of `blocks` in document order, including nested ones.
pub fn headings(blocks: &[Block]) -> Vec<&BookmarkedHeading> {
    let mut found = Vec::new();
    walk(blocks, &mut |block| {
        if let Some(heading) = block.as_heading() {
            found.push(heading);
        }
    });
    found
}

/// Collects every cross-reference block of `blocks` in document order.
pub fn cross_references(blocks: &[Block]) -> Vec<&CrossRefBlock> {
    let mut found = Vec::new();
    walk(blocks, &mut |block| {
        if let Block::CrossReference(cross_ref) = block {
            found.push(cross_ref);
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn duplicate_texts_get_distinct_anchors() {
        let anchors: HashSet<_> = (0..64)
            .map(|_| BookmarkedHeading::new("drug1", "subHeaderStyle").anchor().clone())
            .collect();
        assert_eq!(anchors.len(), 64);
    }

    #[test]
    fn generated_anchor_is_hex_digest() {
        let anchor = AnchorName::generate("標題0");
        assert_eq!(anchor.as_str().len(), 64);
        assert!(anchor.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn walk_reaches_headings_inside_tables() {
        let nested = BookmarkedHeading::new("drug1", "subHeaderStyle").in_group("gene1");
        let story = vec![
            BookmarkedHeading::new("標題0", "subHeaderStyle").into(),
            Block::Spacer(20.0),
            TableBlock::new("tableStyle", "tableCellStyle")
                .with_text_row(["00", "01"])
                .with_row([Block::text("10", "tableCellStyle"), nested.into()])
                .into(),
            Block::PageBreak,
        ];

        let found: Vec<_> = headings(&story).iter().map(|h| h.text().to_owned()).collect();
        assert_eq!(found, ["標題0", "drug1"]);
        assert_eq!(headings(&story)[1].group(), Some("gene1"));
    }

    #[test]
    fn table_tracks_widest_row() {
        let table = TableBlock::new("tableStyle", "tableCellStyle")
            .with_text_row(["a"])
            .with_text_row(["a", "b", "c"]);
        assert_eq!(table.columns(), 3);
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn cross_references_are_collected_in_order() {
        let story = vec![
            Block::cross_reference("gene1", "label"),
            Block::TableOfContents,
            Block::cross_reference("gene2", "label"),
        ];
        let groups: Vec<_> = cross_references(&story)
            .iter()
            .map(|block| block.group.as_str())
            .collect();
        assert_eq!(groups, ["gene1", "gene2"]);
    }
}
