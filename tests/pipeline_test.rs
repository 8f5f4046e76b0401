//! End-to-end tests for loading, processing and rendering documents.

use std::fs;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use pagestruct::{
    detect_format_from_path, process_batch, process_file, render, BoundingBox, Document,
    InputFormat, JsonFormat, Page, PageStruct, Region, RegionType, Word,
};

fn page(id: i64, number: &str) -> Page {
    let mut page = Page::ocred(id);
    page.add_word(Word::at(number, BoundingBox::new(0.0, 20.0, 0.0, 40.0)));
    page.add_word(Word::at("text", BoundingBox::new(0.0, 40.0, 60.0, 100.0)));
    page.add_region(Region::new(RegionType::Paragraph, 1, 2));
    page
}

fn document() -> Document {
    let mut doc = Document::new();
    for (id, number) in [(1, "5"), (2, "6"), (3, "7")] {
        doc.add_page(page(id, number));
    }
    doc
}

#[test]
fn test_gzip_file_round_trip() {
    let json = render::to_json(&document(), JsonFormat::Compact).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.json.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).unwrap();
    fs::write(&path, encoder.finish().unwrap()).unwrap();

    assert_eq!(detect_format_from_path(&path).unwrap(), InputFormat::GzipJson);
    let (doc, report) = process_file(&path).unwrap();
    assert_eq!(report.page_count, 3);
    assert_eq!(doc.page_numbers(), vec![Some(5), Some(6), Some(7)]);
}

#[test]
fn test_plain_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.json");
    fs::write(&path, render::to_json(&document(), JsonFormat::Pretty).unwrap()).unwrap();

    let result = PageStruct::new().sequential().process(&path).unwrap();
    assert_eq!(result.page_numbers(), vec![Some(5), Some(6), Some(7)]);
    assert!(result.to_text().contains("text"));
}

#[test]
fn test_processed_output_carries_page_numbers() {
    let json = render::to_json(&document(), JsonFormat::Compact).unwrap();
    let result = PageStruct::new().process_bytes(json.as_bytes()).unwrap();

    let out = result.to_json(JsonFormat::Compact).unwrap();
    assert!(out.contains("\"pageNumber\":\"5\""));
    assert!(out.contains("\"processed\""));

    let reloaded = Document::from_json(&out).unwrap();
    assert_eq!(reloaded.page_numbers(), vec![Some(5), Some(6), Some(7)]);
}

#[test]
fn test_cancelled_review_still_numbers_all_pages() {
    let result = PageStruct::new().with_cutoff(2).process_document(document()).unwrap();

    assert!(result.report.cancelled);
    assert_eq!(result.report.cutoff, 2);
    assert_eq!(result.page_numbers(), vec![Some(5), Some(6), Some(7)]);
}

#[test]
fn test_report_json_fields() {
    let result = PageStruct::new().process_document(document()).unwrap();
    let json = render::report_to_json(&result.report, JsonFormat::Compact).unwrap();

    for key in ["\"pageCount\":3", "\"pageNumbers\"", "\"tablesBuilt\":0", "\"cancelled\":false"] {
        assert!(json.contains(key), "missing {} in {}", key, json);
    }
}

#[test]
fn test_batch_processing() {
    let mut docs = vec![document(), Document::new(), document()];
    let reports = process_batch(&mut docs).unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[1].as_ref().unwrap().page_count, 0);
    for doc in [&docs[0], &docs[2]] {
        assert_eq!(doc.page_numbers(), vec![Some(5), Some(6), Some(7)]);
    }
}

#[test]
fn test_unreadable_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.pdf");
    fs::write(&path, b"%PDF-1.7").unwrap();
    assert!(matches!(process_file(&path), Err(pagestruct::Error::UnknownFormat)));
}
