//! The multi-pass report build.
//!
//! Page numbers are only known once a pass has been laid out, so the table of contents and the
//! cross references always render what the previous pass captured.  Passes repeat until every
//! accumulator captured exactly what it rendered; the bytes of that last pass are final and get
//! their navigation structures added with `lopdf`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::builder::DocumentBuilder;
use crate::config::ReportConfig;
use crate::elements::ElementFactory;
use crate::error::{BuildWarning, ReportError};
use crate::fonts::FontRegistry;
use crate::links::{apply_navigation, Navigation, OutlineItem};
use crate::model::{self, Block, BookmarkedHeading};
use crate::pass::{PassCapture, PassRecorder};
use crate::style::StyleSheet;
use crate::toc::{Accumulator, CrossRefAccumulator, CrossRefEntry, TocAccumulator, TocEntry};

/// The outcome of a successful build.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    /// The final PDF bytes.
    pub bytes: Vec<u8>,
    /// Number of layout passes that were run.
    pub passes: usize,
    /// Page count of the final pass.
    pub pages: u32,
    /// Table of contents entries shown in the final document.
    pub toc: Vec<TocEntry>,
    /// Cross-reference entries shown in the final document, grouped in block order.
    pub cross_references: Vec<CrossRefEntry>,
    pub warnings: Vec<BuildWarning>,
}

/// Collects the content of a report and runs the build.
#[derive(Clone, Debug)]
pub struct ReportBuilder {
    config: ReportConfig,
    styles: StyleSheet,
    story: Vec<Block>,
}

impl ReportBuilder {
    /// Creates an empty report using the default style sheet.
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            styles: StyleSheet::report_defaults(),
            story: Vec::new(),
        }
    }

    /// Replaces the style sheet.
    pub fn with_styles(mut self, styles: StyleSheet) -> Self {
        self.styles = styles;
        self
    }

    /// Appends a block to the story.
    pub fn push(&mut self, block: impl Into<Block>) {
        self.story.push(block.into());
    }

    /// Appends a block and returns the builder.
    pub fn with_block(mut self, block: impl Into<Block>) -> Self {
        self.push(block);
        self
    }

    /// Appends all blocks and returns the builder.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.story.extend(blocks);
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub fn story(&self) -> &[Block] {
        &self.story
    }

    /// Loads the fonts and builds the report.
    pub fn render(&self) -> Result<RenderedReport, ReportError> {
        let fonts = FontRegistry::load(self.config.fonts_dir.as_deref())?;
        self.render_with(&fonts)
    }

    /// Builds the report and writes it to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<RenderedReport, ReportError> {
        let path = path.as_ref();
        let report = self.render()?;
        fs::write(path, &report.bytes)?;
        info!(
            "Wrote {} pages ({} bytes) to {}",
            report.pages,
            report.bytes.len(),
            path.display()
        );
        Ok(report)
    }

    /// Builds the report with fonts that have already been loaded.
    pub fn render_with(&self, fonts: &FontRegistry) -> Result<RenderedReport, ReportError> {
        let expected = model::headings(&self.story);
        let mut toc = TocAccumulator::new();
        let mut cross_refs: BTreeMap<String, CrossRefAccumulator> = BTreeMap::new();
        for block in model::cross_references(&self.story) {
            cross_refs
                .entry(block.group.clone())
                .or_insert_with(|| CrossRefAccumulator::new(block.group.clone()));
        }

        let settled = run_passes(
            self.config.max_passes,
            &expected,
            &mut toc,
            &mut cross_refs,
            |_, toc, cross_refs| self.run_pass(fonts, toc, cross_refs),
        )?;
        self.finish(settled, &toc, &cross_refs)
    }

    fn run_pass(
        &self,
        fonts: &FontRegistry,
        toc: &TocAccumulator,
        cross_refs: &BTreeMap<String, CrossRefAccumulator>,
    ) -> Result<(Vec<u8>, PassCapture), ReportError> {
        let recorder = PassRecorder::new(self.config.geometry());

        let mut builder = DocumentBuilder::new(fonts)
            .with_page(self.config.page.clone())
            .with_title(self.config.title.clone());
        if let Some(footer) = &self.config.page.footer_style {
            builder = builder.with_footer(self.styles.get(footer)?.clone());
        }
        let (mut document, installed) = builder.build(&recorder)?;

        let levels = self.config.toc.level_styles();
        let factory = ElementFactory::new(
            &self.styles,
            &installed,
            recorder.clone(),
            toc,
            cross_refs,
            &levels,
        )?;
        // A page break at the very end would leave an empty last page.
        let end = self
            .story
            .iter()
            .rposition(|block| !matches!(block, Block::PageBreak))
            .map_or(0, |index| index + 1);
        for block in &self.story[..end] {
            document.push(factory.top_level(block)?);
        }

        let mut bytes = Vec::new();
        document.render(&mut bytes)?;
        Ok((bytes, recorder.take_capture()))
    }

    fn finish(
        &self,
        settled: SettledPass,
        toc: &TocAccumulator,
        cross_refs: &BTreeMap<String, CrossRefAccumulator>,
    ) -> Result<RenderedReport, ReportError> {
        let mut warnings = Vec::new();
        let mut unmatched = Vec::new();
        for accumulator in cross_refs.values() {
            if accumulator.is_placeholder() {
                warn!(
                    "Cross-reference group '{}' matched no heading",
                    accumulator.group()
                );
                unmatched.push(accumulator.group().to_owned());
                warnings.push(BuildWarning::UnmatchedCrossReference {
                    group: accumulator.group().to_owned(),
                });
            }
        }
        if self.config.strict_cross_references && !unmatched.is_empty() {
            return Err(ReportError::UnmatchedCrossReferences(unmatched));
        }

        let outline = toc
            .rendered()
            .iter()
            .filter_map(|entry| {
                entry.anchor.as_ref().map(|anchor| OutlineItem {
                    title: entry.text.clone(),
                    anchor: anchor.clone(),
                })
            })
            .collect();
        let navigation = Navigation {
            anchors: settled.capture.anchors,
            links: settled.capture.links,
            outline,
        };
        let bytes = apply_navigation(&settled.bytes, &navigation)?;

        let mut cross_references = Vec::new();
        for block in model::cross_references(&self.story) {
            if let Some(accumulator) = cross_refs.get(&block.group) {
                if !cross_references
                    .iter()
                    .any(|entry: &CrossRefEntry| entry.group == block.group)
                {
                    cross_references.extend(accumulator.rendered().iter().cloned());
                }
            }
        }

        Ok(RenderedReport {
            bytes,
            passes: settled.passes,
            pages: settled.capture.pages,
            toc: toc.rendered().to_vec(),
            cross_references,
            warnings,
        })
    }
}

/// Output of the pass after which nothing changed any more.
struct SettledPass {
    bytes: Vec<u8>,
    capture: PassCapture,
    passes: usize,
}

/// Runs `layout` until every accumulator captured what it rendered.
///
/// Each pass starts by moving the previous capture to the rendered side of every accumulator,
/// lays the document out against that state, and then feeds the new heading events back.
fn run_passes<F>(
    max_passes: usize,
    expected: &[&BookmarkedHeading],
    toc: &mut TocAccumulator,
    cross_refs: &mut BTreeMap<String, CrossRefAccumulator>,
    mut layout: F,
) -> Result<SettledPass, ReportError>
where
    F: FnMut(
        usize,
        &TocAccumulator,
        &BTreeMap<String, CrossRefAccumulator>,
    ) -> Result<(Vec<u8>, PassCapture), ReportError>,
{
    let max_passes = max_passes.max(1);
    for number in 1..=max_passes {
        toc.begin_pass();
        for accumulator in cross_refs.values_mut() {
            accumulator.begin_pass();
        }

        let (bytes, capture) = layout(number, toc, cross_refs)?;
        check_complete(expected, &capture, number)?;

        for event in &capture.events {
            toc.notify(event);
            for accumulator in cross_refs.values_mut() {
                accumulator.notify(event);
            }
        }

        info!(
            "Layout pass {} produced {} pages and {} heading events",
            number,
            capture.pages,
            capture.events.len()
        );

        let settled = toc.is_settled() && cross_refs.values().all(|acc| acc.is_settled());
        if settled {
            info!("Page numbers settled after {} passes", number);
            return Ok(SettledPass {
                bytes,
                capture,
                passes: number,
            });
        }
        debug!("Page references changed during pass {}, running another", number);
    }

    Err(ReportError::NotConverged { passes: max_passes })
}

/// Every heading of the content tree must have reported itself during the pass.
fn check_complete(
    expected: &[&BookmarkedHeading],
    capture: &PassCapture,
    pass: usize,
) -> Result<(), ReportError> {
    for heading in expected {
        let anchor = heading.anchor().as_str();
        let reported = capture
            .events
            .iter()
            .any(|event| event.entry.anchor.as_deref() == Some(anchor));
        if !reported {
            return Err(ReportError::HeadingNotPlaced {
                text: heading.text().to_owned(),
                pass,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::HeadingEvent;

    fn capture_at(headings: &[&BookmarkedHeading], page: u32) -> PassCapture {
        PassCapture {
            pages: page,
            events: headings
                .iter()
                .map(|heading| HeadingEvent {
                    entry: TocEntry {
                        level: heading.level(),
                        text: heading.text().to_owned(),
                        page,
                        anchor: Some(heading.anchor().as_str().to_owned()),
                    },
                    group: heading.group().map(str::to_owned),
                })
                .collect(),
            ..PassCapture::default()
        }
    }

    fn capture_for(headings: &[&BookmarkedHeading]) -> PassCapture {
        capture_at(headings, 1)
    }

    fn gene_accumulators(groups: &[&str]) -> BTreeMap<String, CrossRefAccumulator> {
        groups
            .iter()
            .map(|group| ((*group).to_owned(), CrossRefAccumulator::new(*group)))
            .collect()
    }

    #[test]
    fn completeness_check_names_missing_heading() {
        let first = BookmarkedHeading::new("標題0", "subHeaderStyle");
        let nested = BookmarkedHeading::new("drug1", "subHeaderStyle").in_group("gene1");
        let expected = [&first, &nested];

        assert!(check_complete(&expected, &capture_for(&expected), 1).is_ok());

        let err = check_complete(&expected, &capture_for(&[&first]), 2).expect_err("missing");
        match err {
            ReportError::HeadingNotPlaced { text, pass } => {
                assert_eq!(text, "drug1");
                assert_eq!(pass, 2);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn duplicate_texts_are_told_apart_by_anchor() {
        let a = BookmarkedHeading::new("drug1", "subHeaderStyle");
        let b = BookmarkedHeading::new("drug1", "subHeaderStyle");
        let err = check_complete(&[&a, &b], &capture_for(&[&a]), 1);
        assert!(matches!(err, Err(ReportError::HeadingNotPlaced { .. })));
    }

    #[test]
    fn builder_collects_blocks() {
        let report = ReportBuilder::new(ReportConfig::default())
            .with_block(Block::TableOfContents)
            .with_block(BookmarkedHeading::new("x", "subHeaderStyle"))
            .with_blocks([Block::PageBreak]);
        assert_eq!(report.story().len(), 3);
        assert_eq!(model::headings(report.story()).len(), 1);
    }

    #[test]
    fn passes_repeat_until_toc_pages_settle() {
        let heading = BookmarkedHeading::new("標題0", "subHeaderStyle");
        let expected = [&heading];
        let mut toc = TocAccumulator::new();
        let mut cross_refs = BTreeMap::new();
        let mut seen = Vec::new();

        // Every rendered row pushes the heading one page further.
        let settled = run_passes(10, &expected, &mut toc, &mut cross_refs, |pass, toc, _| {
            seen.push((pass, toc.rendered().len()));
            let page = 1 + toc.rendered().len() as u32;
            Ok((vec![pass as u8], capture_at(&expected, page)))
        })
        .expect("settles");

        assert_eq!(seen, [(1, 0), (2, 1), (3, 1)]);
        assert_eq!(settled.passes, 3);
        assert_eq!(settled.bytes, [3]);
        assert_eq!(settled.capture.pages, 2);
        assert_eq!(toc.rendered()[0].page, 2);
        assert!(toc.is_settled());
    }

    #[test]
    fn cross_references_render_previous_pass() {
        let drug = BookmarkedHeading::new("drug1", "subHeaderStyle").in_group("gene1");
        let expected = [&drug];
        let mut toc = TocAccumulator::new();
        let mut cross_refs = gene_accumulators(&["gene1", "gene2"]);
        let mut placeholders = Vec::new();

        let settled = run_passes(10, &expected, &mut toc, &mut cross_refs, |_, toc, cross_refs| {
            placeholders.push((
                toc.is_placeholder(),
                cross_refs["gene1"].is_placeholder(),
                cross_refs["gene2"].is_placeholder(),
            ));
            Ok((Vec::new(), capture_at(&expected, 7)))
        })
        .expect("settles");

        assert_eq!(settled.passes, 2);
        assert_eq!(placeholders, [(true, true, true), (true, false, true)]);
        let gene1 = cross_refs["gene1"].rendered();
        assert_eq!(gene1.len(), 1);
        assert_eq!(gene1[0].entry.page, 7);
        assert!(cross_refs["gene2"].rendered().is_empty());
        assert!(toc.rendered().is_empty());
    }

    #[test]
    fn moving_pages_exhaust_the_pass_limit() {
        let heading = BookmarkedHeading::new("標題0", "subHeaderStyle");
        let expected = [&heading];
        let mut calls = 0;
        let result = run_passes(
            3,
            &expected,
            &mut TocAccumulator::new(),
            &mut BTreeMap::new(),
            |pass, _, _| {
                calls += 1;
                Ok((Vec::new(), capture_at(&expected, pass as u32)))
            },
        );
        assert!(matches!(result, Err(ReportError::NotConverged { passes: 3 })));
        assert_eq!(calls, 3);
    }

    #[test]
    fn unreported_heading_stops_the_build() {
        let heading = BookmarkedHeading::new("標題0", "subHeaderStyle");
        let result = run_passes(
            5,
            &[&heading],
            &mut TocAccumulator::new(),
            &mut BTreeMap::new(),
            |_, _, _| Ok((Vec::new(), PassCapture::default())),
        );
        assert!(matches!(
            result,
            Err(ReportError::HeadingNotPlaced { pass: 1, .. })
        ));
    }

    #[test]
    fn empty_story_settles_after_one_pass() {
        let settled = run_passes(
            0,
            &[],
            &mut TocAccumulator::new(),
            &mut BTreeMap::new(),
            |_, _, _| Ok((Vec::new(), PassCapture::default())),
        )
        .expect("nothing to resolve");
        assert_eq!(settled.passes, 1);
    }
}
