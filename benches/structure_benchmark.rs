//! Benchmarks for the structure passes.
//!
//! Run with: cargo bench
//!
//! Pages are synthetic: a grid of boxed words per page, a printed number in
//! the top margin, and a footnote continued onto the next page.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use pagestruct::{
    BoundingBox, DigitConfusion, Page, PageNumberConfig, PageNumberResolver, Region, RegionStitcher,
    RegionType, TableBuilder, Word,
};

/// A page with a numbered header, `rows` x `cols` table cells and a footnote.
fn create_test_page(id: i64, rows: usize, cols: usize) -> Page {
    let mut page = Page::ocred(id);
    page.add_word(Word::at((id + 100).to_string(), BoundingBox::new(1200.0, 1240.0, 20.0, 60.0)));

    let start = page.words.len();
    let mut table = Region::new(RegionType::Table, start, start);
    for r in 0..rows {
        for c in 0..cols {
            let left = 100.0 + 200.0 * c as f32;
            let top = 200.0 + 60.0 * r as f32;
            let bbox = BoundingBox::new(left, left + 150.0, top, top + 40.0);
            let index = page.add_word(Word::at(format!("r{}c{}", r, c), bbox));
            table = table.with_child(Region::new(RegionType::Paragraph, index, index + 1).with_box(bbox));
        }
    }
    table.end = page.words.len();
    page.add_region(table);

    let start = page.words.len();
    for i in 0..20 {
        let left = 100.0 + 50.0 * i as f32;
        page.add_word(Word::at("note", BoundingBox::new(left, left + 40.0, 3000.0, 3030.0)));
    }
    let mut footnote = Region::new(RegionType::Footnote, start, page.words.len())
        .with_box(BoundingBox::new(100.0, 1100.0, 3000.0, 3030.0));
    footnote.continues = id > 0;
    page.add_region(footnote);
    page
}

fn create_test_pages(count: usize) -> Vec<Page> {
    (0..count as i64).map(|id| create_test_page(id, 8, 5)).collect()
}

/// Benchmark page-number resolution with and without a confusion table.
fn bench_page_numbers(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_numbers");
    let pages = create_test_pages(50);

    let exact = PageNumberResolver::new(PageNumberConfig::default(), None).unwrap();
    group.bench_function("exact_50_pages", |b| {
        b.iter_batched(
            || pages.clone(),
            |mut pages| exact.resolve(black_box(&mut pages)),
            BatchSize::SmallInput,
        );
    });

    let confusion = DigitConfusion::parse("0 oO\n1 lI\n5 sS").unwrap();
    let fuzzy = PageNumberResolver::new(PageNumberConfig::default(), Some(confusion)).unwrap();
    group.bench_function("fuzzy_50_pages", |b| {
        b.iter_batched(
            || pages.clone(),
            |mut pages| fuzzy.resolve(black_box(&mut pages)),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark table reconstruction at various grid sizes.
fn bench_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_reconstruction");
    let builder = TableBuilder::new();

    for (rows, cols) in [(4, 3), (8, 5), (20, 8)].iter() {
        let page = create_test_page(1, *rows, *cols);
        group.bench_function(format!("{}x{}", rows, cols), |b| {
            b.iter_batched(
                || page.clone(),
                |mut page| builder.build_page(black_box(&mut page)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark stitching a footnote chain across many pages.
fn bench_stitching(c: &mut Criterion) {
    let pages = create_test_pages(50);
    let stitcher = RegionStitcher::new();

    c.bench_function("stitch_50_pages", |b| {
        b.iter_batched(
            || pages.clone(),
            |mut pages| stitcher.stitch(black_box(&mut pages), 50),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_page_numbers, bench_tables, bench_stitching);
criterion_main!(benches);
