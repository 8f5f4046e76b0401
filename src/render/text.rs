//! Plain text rendering.

use crate::model::{Document, Page, Region, RegionType};

/// Options for plain text output.
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Separator between pages
    pub page_separator: String,
    /// Whether to drop regions typed as recognizer noise
    pub skip_artifacts: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            page_separator: "\n\n".to_string(),
            skip_artifacts: true,
        }
    }
}

/// Convert a document to plain text with default options.
pub fn to_text(doc: &Document) -> String {
    to_text_with_options(doc, &TextOptions::default())
}

/// Convert a document to plain text.
///
/// Regions are written in reading order, one per line. Rebuilt tables are
/// written one line per row with tab-separated cells; words outside any
/// region get a line of their own.
pub fn to_text_with_options(doc: &Document, options: &TextOptions) -> String {
    doc.pages
        .iter()
        .map(|p| page_text(p, options))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(&options.page_separator)
}

/// Plain text of one page.
pub fn page_text(page: &Page, options: &TextOptions) -> String {
    let mut lines = Vec::new();
    let mut cursor = 0;

    for region in &page.regions {
        if region.start > cursor {
            lines.push(page.text(cursor..region.start));
        }
        cursor = cursor.max(region.end);

        if options.skip_artifacts && region.kind == RegionType::OcrArtifact {
            continue;
        }
        lines.push(region_text(page, region));
    }
    if cursor < page.words.len() {
        lines.push(page.text(cursor..page.words.len()));
    }

    lines.retain(|l| !l.trim().is_empty());
    lines.join("\n")
}

fn region_text(page: &Page, region: &Region) -> String {
    let has_rows = region.children.iter().any(|c| c.kind == RegionType::TableRow);
    if region.kind != RegionType::Table || !has_rows {
        return page.text(region.start..region.end);
    }
    region
        .children
        .iter()
        .filter(|row| row.kind == RegionType::TableRow)
        .map(|row| {
            row.children
                .iter()
                .map(|cell| page.text(cell.start..cell.end))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Word;

    fn page_with(words: &[&str]) -> Page {
        let mut page = Page::new(1);
        for w in words {
            page.add_word(Word::new(*w));
        }
        page
    }

    #[test]
    fn test_regions_and_loose_words() {
        let mut page = page_with(&["Title", "body", "text", "12"]);
        page.add_region(Region::new(RegionType::Heading, 0, 1));
        page.add_region(Region::new(RegionType::MainText, 1, 3));
        let text = page_text(&page, &TextOptions::default());
        assert_eq!(text, "Title\nbody text\n12");
    }

    #[test]
    fn test_table_rows() {
        let mut page = page_with(&["a", "b", "c"]);
        let row0 = Region::new(RegionType::TableRow, 0, 2)
            .with_child(Region::new(RegionType::TableCell, 0, 1))
            .with_child(Region::new(RegionType::TableCell, 1, 2));
        let row1 = Region::new(RegionType::TableRow, 2, 3)
            .with_child(Region::new(RegionType::TableCell, 2, 2))
            .with_child(Region::new(RegionType::TableCell, 2, 3));
        page.add_region(
            Region::new(RegionType::Table, 0, 3)
                .with_child(row0)
                .with_child(row1),
        );
        assert_eq!(page_text(&page, &TextOptions::default()), "a\tb\n\tc");
    }

    #[test]
    fn test_skip_artifacts() {
        let mut page = page_with(&["~~~", "body"]);
        page.add_region(Region::new(RegionType::OcrArtifact, 0, 1));
        page.add_region(Region::new(RegionType::MainText, 1, 2));
        let mut doc = Document::new();
        doc.add_page(page);

        assert_eq!(to_text(&doc), "body");
        let options = TextOptions {
            skip_artifacts: false,
            ..TextOptions::default()
        };
        assert_eq!(to_text_with_options(&doc, &options), "~~~\nbody");
    }
}
