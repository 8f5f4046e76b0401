//! Integration tests for page-number resolution.

use std::io::Write;

use pagestruct::model::{Annotation, RegionType, PAGE_NUMBER_ATTRIBUTE};
use pagestruct::structure::{Hypothesis, PageNumberConfig, PageNumberResolver, UNKNOWN};
use pagestruct::{resolve_page_numbers, BoundingBox, DigitConfusion, Document, Page, Pipeline, PipelineOptions, Word};

/// A page with a number token at the bottom margin after some body text.
fn page(id: i64, number: Option<&str>, ocred: bool) -> Page {
    let mut page = if ocred { Page::ocred(id) } else { Page::new(id) };
    for (i, text) in ["the", "quick", "brown", "fox"].iter().enumerate() {
        let y = i as f32 * 50.0;
        page.add_word(Word::at(*text, BoundingBox::new(100.0, 200.0, y, y + 40.0)));
    }
    if let Some(number) = number {
        page.add_word(Word::at(number, BoundingBox::new(500.0, 540.0, 2000.0, 2040.0)));
    }
    page
}

fn document(numbers: &[Option<&str>], ocred: bool) -> Document {
    let mut doc = Document::new();
    for (i, number) in numbers.iter().enumerate() {
        doc.add_page(page(10 + i as i64, *number, ocred));
    }
    doc
}

#[test]
fn test_consistency_invariant() {
    let a = Hypothesis::new(3, 20, 0, 1);
    for (page_id, value) in [(5, 22), (1, 18), (5, 23), (3, 20), (4, 19)] {
        let b = Hypothesis::new(page_id, value, 0, 1);
        assert_eq!(a.is_consistent_with(&b), (a.value - b.value) == (a.page_id - b.page_id));
    }
}

#[test]
fn test_adjusted_score_sentinels() {
    let mut h = Hypothesis::new(1, 5, UNKNOWN, 1);
    h.score = 12;
    assert_eq!(h.adjusted_score(), 0.0);

    let mut h = Hypothesis::new(1, 5, 1, 3);
    h.score = 12;
    assert_eq!(h.adjusted_score(), 3.0);
}

#[test]
fn test_sequence_repair_fills_gap() {
    let mut doc = document(&[Some("13"), Some("14"), Some("15"), None, Some("17")], false);
    let numbers = resolve_page_numbers(&mut doc, None).unwrap();
    assert_eq!(numbers, vec![Some(13), Some(14), Some(15), Some(16), Some(17)]);

    // Only pages that carried the number get a promoted span.
    assert!(doc.pages[3]
        .annotations
        .iter()
        .all(|a| a.kind != RegionType::PageNumber));
    let promoted: Vec<&Annotation> = doc.pages[0]
        .annotations
        .iter()
        .filter(|a| a.kind == RegionType::PageNumber)
        .collect();
    assert_eq!(promoted.len(), 1);
    assert_eq!((promoted[0].start, promoted[0].end), (4, 5));
    assert_eq!(promoted[0].attributes.get("value").map(String::as_str), Some("13"));
}

#[test]
fn test_duplicate_value_is_disambiguated() {
    let mut doc = document(&[Some("27"), Some("28"), None, Some("28")], false);
    let numbers = resolve_page_numbers(&mut doc, None).unwrap();
    assert_eq!(numbers, vec![Some(27), Some(28), Some(29), None]);
    assert_eq!(doc.pages[3].attribute(PAGE_NUMBER_ATTRIBUTE), Some("-1"));
}

#[test]
fn test_born_digital_single_digits_are_ignored() {
    let mut doc = document(&[Some("3"), Some("4"), Some("5")], false);
    let numbers = resolve_page_numbers(&mut doc, None).unwrap();
    assert_eq!(numbers, vec![None, None, None]);
}

#[test]
fn test_fuzzy_digits_on_ocred_pages() {
    let confusion = DigitConfusion::parse("// OCR confusions\n0 oO\n1 lI\n").unwrap();
    let mut doc = document(&[Some("l0"), Some("1l"), Some("I2"), Some("13")], true);
    let numbers = resolve_page_numbers(&mut doc, Some(confusion)).unwrap();
    assert_eq!(numbers, vec![Some(10), Some(11), Some(12), Some(13)]);
}

#[test]
fn test_ambiguous_reading_resolved_by_neighbors() {
    // 'l' reads as 1 or 7; only 17 fits the run 15, 16, _, 18.
    let confusion = DigitConfusion::parse("1 l\n7 l").unwrap();
    let resolver = PageNumberResolver::new(PageNumberConfig::default(), Some(confusion)).unwrap();
    let mut pages = vec![
        page(1, Some("15"), true),
        page(2, Some("16"), true),
        page(3, Some("1l"), true),
        page(4, Some("18"), true),
    ];
    let chosen = resolver.resolve(&mut pages);
    let values: Vec<i64> = chosen.iter().map(|h| h.value).collect();
    assert_eq!(values, vec![15, 16, 17, 18]);
    assert_eq!(chosen[2].fuzziness, 1);
    assert_eq!(chosen[2].ambiguity, 2);
}

#[test]
fn test_numbers_outside_margins_are_ignored() {
    let mut doc = Document::new();
    for id in 1..=3 {
        let mut page = Page::new(id);
        for _ in 0..60 {
            page.add_word(Word::new("word"));
        }
        page.words[28].text = format!("{}", 40 + id);
        doc.add_page(page);
    }
    let numbers = resolve_page_numbers(&mut doc, None).unwrap();
    assert_eq!(numbers, vec![None, None, None]);
}

#[test]
fn test_pipeline_with_confusion_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "// digits").unwrap();
    writeln!(file, "5 sS").unwrap();
    writeln!(file, "0 oO").unwrap();

    let mut doc = document(&[Some("2S"), Some("26"), Some("27")], true);
    let options = PipelineOptions::new().with_confusion_file(file.path()).sequential();
    Pipeline::new(options).unwrap().run_auto(&mut doc).unwrap();
    assert_eq!(doc.page_numbers(), vec![Some(25), Some(26), Some(27)]);
}

#[test]
fn test_pipeline_missing_confusion_file_falls_back() {
    let mut doc = document(&[Some("2S"), Some("26"), Some("27")], true);
    let options = PipelineOptions::new().with_confusion_file("/nonexistent/digits.txt");
    let report = Pipeline::new(options).unwrap().run_auto(&mut doc).unwrap();
    // "2S" is no whole number without the table; the progression fills it in.
    assert_eq!(doc.page_numbers(), vec![Some(25), Some(26), Some(27)]);
    assert_eq!(report.page_numbers[0].value, Some(25));
}
