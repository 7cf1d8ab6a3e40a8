//! The sample report: a cover, the table of contents, one cross-reference page per gene, three
//! titled sections with tables and one page per drug.

use crate::config::ReportConfig;
use crate::driver::ReportBuilder;
use crate::model::{Block, BookmarkedHeading, TableBlock};

const HEADING_STYLE: &str = "subHeaderStyle";
const CROSS_REF_LABEL: &str = "這是文字，";

/// Genes and the drugs that get their own page.
const DRUG_PAGES: &[(&str, &[&str])] = &[
    ("gene1", &["drug2", "drug3"]),
    ("gene2", &["drug4", "drug5", "drug6"]),
];

fn section_table(section: usize) -> TableBlock {
    let mut table = TableBlock::new("tableStyle", "tableCellStyle");
    for row in 0..4 {
        let cells = (0..5).map(|column| {
            if row == 1 && column == 2 && section != 0 {
                BookmarkedHeading::new("drug1", HEADING_STYLE)
                    .in_group("gene1")
                    .into()
            } else {
                Block::text(format!("{row}{column}"), "tableCellStyle")
            }
        });
        table = table.with_row(cells);
    }
    table
}

/// The content of the sample report.
pub fn sample_story() -> Vec<Block> {
    let mut story = vec![
        Block::text("這是封面", "paragraphStyle"),
        Block::PageBreak,
        Block::text("目錄", "titleTOC"),
        Block::TableOfContents,
        Block::PageBreak,
        Block::cross_reference("gene1", CROSS_REF_LABEL),
        Block::PageBreak,
        Block::cross_reference("gene2", CROSS_REF_LABEL),
        Block::PageBreak,
    ];

    for section in 0..3 {
        story.push(BookmarkedHeading::new(format!("標題{section}"), HEADING_STYLE).into());
        story.push(Block::Spacer(20.0));
        story.push(section_table(section).into());
        story.push(Block::PageBreak);
    }

    for (gene, drugs) in DRUG_PAGES {
        for drug in *drugs {
            story.push(
                BookmarkedHeading::new(*drug, HEADING_STYLE)
                    .in_group(*gene)
                    .into(),
            );
            story.push(Block::PageBreak);
        }
    }

    story
}

/// A builder holding the sample report.
pub fn sample_report(config: ReportConfig) -> ReportBuilder {
    ReportBuilder::new(config).with_blocks(sample_story())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{cross_references, headings};

    #[test]
    fn sample_has_three_sections_and_seven_drug_headings() {
        let story = sample_story();
        let found = headings(&story);
        let toc: Vec<_> = found
            .iter()
            .filter(|h| h.group().is_none())
            .map(|h| h.text())
            .collect();
        assert_eq!(toc, ["標題0", "標題1", "標題2"]);

        let gene1 = found.iter().filter(|h| h.group() == Some("gene1")).count();
        let gene2 = found.iter().filter(|h| h.group() == Some("gene2")).count();
        // drug1 sits inside the tables of the second and third section.
        assert_eq!(gene1, 4);
        assert_eq!(gene2, 3);
    }

    #[test]
    fn sample_references_both_genes() {
        let story = sample_story();
        let groups: Vec<_> = cross_references(&story)
            .iter()
            .map(|block| block.group.as_str())
            .collect();
        assert_eq!(groups, ["gene1", "gene2"]);
    }

    #[test]
    fn sample_tables_are_four_by_five() {
        let table = section_table(1);
        assert_eq!(table.rows().len(), 4);
        assert_eq!(table.columns(), 5);
        assert!(table.rows()[1][2].as_heading().is_some());
        assert!(section_table(0).rows()[1][2].as_heading().is_none());
    }
}
