//! Integration tests for table grid reconstruction.

use pagestruct::render::{page_text, TextOptions};
use pagestruct::structure::TableBuilder;
use pagestruct::{BoundingBox, Document, Page, Pipeline, PipelineOptions, Region, RegionType, Word};

fn cell(col: usize, row: usize) -> BoundingBox {
    let x = 100.0 + col as f32 * 200.0;
    let y = 100.0 + row as f32 * 60.0;
    BoundingBox::new(x, x + 150.0, y, y + 40.0)
}

/// A page holding one table region whose cells each carry one word.
fn table_page(id: i64, cells: &[BoundingBox]) -> Page {
    let mut page = Page::new(id);
    let mut table = Region::new(RegionType::Table, 0, cells.len());
    for (i, bbox) in cells.iter().enumerate() {
        page.add_word(Word::at(format!("c{}", i), *bbox));
        table
            .children
            .push(Region::new(RegionType::Paragraph, i, i + 1).with_box(*bbox));
    }
    page.add_region(table);
    page
}

fn grid(rows: usize, cols: usize) -> Vec<BoundingBox> {
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| cell(c, r)))
        .collect()
}

#[test]
fn test_regular_grid_round_trip() {
    let grid = TableBuilder::new().reconstruct(&grid(3, 3)).unwrap();
    assert_eq!(grid.row_count(), 3);
    assert_eq!(grid.column_count(), 3);
    assert_eq!(grid.filler_count(), 0);
    assert_eq!(grid.column_lines, vec![275.0, 475.0]);
    assert_eq!(grid.row_lines, vec![150.0, 210.0]);
    for row in &grid.rows {
        assert_eq!(row.cells.len(), 3);
        assert!(row.cells.iter().all(|c| c.row_span == 1 && c.col_span == 1));
    }
}

#[test]
fn test_missing_cell_gets_filler() {
    let cells: Vec<BoundingBox> = grid(3, 3).into_iter().filter(|b| *b != cell(1, 1)).collect();
    let mut doc = Document::new();
    doc.add_page(table_page(1, &cells));

    let report = Pipeline::with_defaults().unwrap().run_auto(&mut doc).unwrap();
    assert_eq!(report.tables_built, 1);
    assert_eq!(report.synthetic_cells, 1);

    let page = &doc.pages[0];
    let table = &page.regions[0];
    assert_eq!(table.kind, RegionType::Table);
    assert_eq!(table.children.len(), 3);

    let middle = &table.children[1];
    assert_eq!(middle.kind, RegionType::TableRow);
    assert_eq!(middle.children.len(), 3);
    let filler = &middle.children[1];
    assert_eq!(filler.attribute("isEmpty"), Some("true"));
    assert!(filler.is_empty());
    assert_eq!(filler.bounding_box(), Some(cell(1, 1)));

    assert_eq!(
        page_text(page, &TextOptions::default()),
        "c0\tc1\tc2\nc3\t\tc4\nc5\tc6\tc7"
    );
}

#[test]
fn test_column_span_attribute() {
    let cells = vec![
        BoundingBox::new(100.0, 450.0, 100.0, 140.0),
        cell(0, 1),
        cell(1, 1),
    ];
    let mut page = table_page(1, &cells);
    let pass = TableBuilder::new().build_page(&mut page);
    assert_eq!(pass.tables.len(), 1);

    let table = &pass.tables[0];
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_count(), 2);
    assert!(table.has_merged_cells());
    assert_eq!(table.rows[0].cells[0].col_span, 2);

    let header = &page.regions[0].children[0].children[0];
    assert_eq!(header.attribute("colSpan"), Some("2"));
    assert_eq!(header.attribute("rowSpan"), None);
    let body = &page.regions[0].children[1].children[0];
    assert_eq!(body.attribute("colSpan"), None);
}

#[test]
fn test_row_span_attribute() {
    let cells = vec![
        BoundingBox::new(100.0, 250.0, 100.0, 200.0),
        cell(1, 0),
        cell(1, 1),
    ];
    let mut page = table_page(1, &cells);
    TableBuilder::new().build_page(&mut page);

    let first_row = &page.regions[0].children[0];
    assert_eq!(first_row.children[0].attribute("rowSpan"), Some("2"));
    assert_eq!(page.regions[0].children[1].children.len(), 1);
}

#[test]
fn test_degenerate_tables_are_left_alone() {
    let mut single = table_page(1, &[cell(0, 0)]);
    let mut unboxed = table_page(2, &grid(2, 2));
    unboxed.regions[0].children[3].bounding_boxes = Default::default();
    let before = unboxed.clone();

    let builder = TableBuilder::new();
    assert_eq!(builder.build_page(&mut single).skipped, 1);
    assert_eq!(builder.build_page(&mut unboxed).skipped, 1);
    assert_eq!(unboxed.regions, before.regions);
    assert_eq!(unboxed.words, before.words);
}

#[test]
fn test_tables_respect_cutoff_and_switch() {
    let mut doc = Document::new();
    doc.add_page(table_page(1, &grid(2, 2)));
    doc.add_page(table_page(2, &grid(2, 2)));

    let report = pagestruct::PageStruct::new()
        .with_cutoff(1)
        .process_document(doc.clone())
        .unwrap()
        .report;
    assert_eq!(report.tables_built, 1);

    let options = PipelineOptions::new().with_tables(false);
    let report = Pipeline::new(options).unwrap().run_auto(&mut doc).unwrap();
    assert_eq!(report.tables_built, 0);
    assert!(doc.pages.iter().all(|p| p.regions[0].children[0].kind == RegionType::Paragraph));
}
