//! Page-structuring pipeline.
//!
//! Runs the structure passes over a document in order: paragraph
//! classification, page-number resolution, interactive correction,
//! continuation stitching and table reconstruction. The last two only
//! commit pages below the cutoff returned by a cancelled correction.
//!
//! ```no_run
//! use pagestruct::pipeline::{AcceptAll, Pipeline, PipelineOptions};
//! use pagestruct::Document;
//!
//! let mut doc = Document::load("scan.json")?;
//! let pipeline = Pipeline::new(PipelineOptions::new().with_confusion_file("digits.txt"))?;
//! let report = pipeline.run(&mut doc, &mut AcceptAll)?;
//! println!("{} merges, {} tables", report.merges, report.tables_built);
//! # Ok::<(), pagestruct::Error>(())
//! ```

mod correction;
mod options;

pub use correction::{
    AcceptAll, CancelAt, ChannelCorrector, CorrectionChannel, CorrectionEndpoint, CorrectionRequest,
    CorrectionResponse, PageLayout, RegionLayout,
};
pub use options::PipelineOptions;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Document, Page};
use crate::structure::{
    DigitConfusion, Hypothesis, Orphan, PageNumberResolver, ParagraphClassifier, RegionStitcher,
    TableBuilder,
};

/// Resolved page number of one page, as reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNumberEntry {
    /// Page id
    pub page_id: i64,
    /// Printed page number, if determined
    pub value: Option<i64>,
    /// Support from neighboring pages
    pub score: u32,
}

impl From<&Hypothesis> for PageNumberEntry {
    fn from(h: &Hypothesis) -> Self {
        Self {
            page_id: h.page_id,
            value: h.is_known().then_some(h.value),
            score: h.score,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// When the run started
    pub started: DateTime<Utc>,
    /// When the run finished
    pub finished: DateTime<Utc>,
    /// Pages in the document
    pub page_count: usize,
    /// Paragraphs given an initial type
    pub classified: usize,
    /// Per-page resolution results
    pub page_numbers: Vec<PageNumberEntry>,
    /// Whether the correction step was cancelled
    pub cancelled: bool,
    /// First page index left unprocessed
    pub cutoff: usize,
    /// Continuations joined
    pub merges: usize,
    /// Continuations that could not be joined
    pub orphans: Vec<Orphan>,
    /// Table regions rebuilt into grids
    pub tables_built: usize,
    /// Table regions left as plain text
    pub tables_skipped: usize,
    /// Empty cells synthesized in rebuilt tables
    pub synthetic_cells: usize,
}

impl PipelineReport {
    fn new(page_count: usize) -> Self {
        let now = Utc::now();
        Self {
            started: now,
            finished: now,
            page_count,
            classified: 0,
            page_numbers: Vec::new(),
            cancelled: false,
            cutoff: page_count,
            merges: 0,
            orphans: Vec::new(),
            tables_built: 0,
            tables_skipped: 0,
            synthetic_cells: 0,
        }
    }
}

/// The structure pipeline with its passes configured.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PipelineOptions,
    classifier: ParagraphClassifier,
    resolver: PageNumberResolver,
    stitcher: RegionStitcher,
    tables: TableBuilder,
}

impl Pipeline {
    /// Build a pipeline from options.
    ///
    /// A confusion file that cannot be read is logged and skipped; a
    /// malformed one is an error.
    pub fn new(options: PipelineOptions) -> Result<Self> {
        let confusion = load_confusion(&options)?;
        Ok(Self {
            classifier: ParagraphClassifier::with_config(options.classifier_config.clone())?,
            resolver: PageNumberResolver::new(options.page_number_config.clone(), confusion)?,
            stitcher: RegionStitcher::with_config(options.stitch_config.clone()),
            tables: TableBuilder::with_config(options.table_config.clone()),
            options,
        })
    }

    /// Build a pipeline with default options.
    pub fn with_defaults() -> Result<Self> {
        Self::new(PipelineOptions::default())
    }

    /// Options the pipeline was built with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every enabled pass over `doc`, asking `channel` to review the
    /// layout before anything is stitched or rebuilt.
    pub fn run(&self, doc: &mut Document, channel: &mut dyn CorrectionChannel) -> Result<PipelineReport> {
        let mut report = PipelineReport::new(doc.page_count());

        if self.options.classification {
            report.classified = self
                .map_pages(&mut doc.pages, |page| self.classifier.classify_page(page))
                .into_iter()
                .sum();
        }

        if self.options.page_numbers {
            let chosen = self.resolver.resolve(&mut doc.pages);
            report.page_numbers = chosen.iter().map(PageNumberEntry::from).collect();
        }

        report.cutoff = match channel.request(CorrectionRequest::from_document(doc)) {
            CorrectionResponse::Accepted(layouts) => {
                CorrectionRequest::apply_to(&layouts, doc)?;
                doc.page_count()
            }
            CorrectionResponse::Cancelled { cutoff } => {
                let cutoff = cutoff.min(doc.page_count());
                log::warn!(
                    "Correction cancelled; committing {} of {} pages",
                    cutoff,
                    doc.page_count()
                );
                report.cancelled = true;
                cutoff
            }
        };

        if self.options.stitching {
            let stitched = self.stitcher.stitch(&mut doc.pages, report.cutoff);
            report.merges = stitched.merges;
            report.orphans = stitched.orphans;
        }

        if self.options.tables {
            let passes = self.map_pages(&mut doc.pages[..report.cutoff], |page| self.tables.build_page(page));
            for pass in passes {
                report.tables_built += pass.tables.len();
                report.tables_skipped += pass.skipped;
                report.synthetic_cells += pass.tables.iter().map(|t| t.synthetic_cell_count()).sum::<usize>();
            }
        }

        report.finished = Utc::now();
        doc.metadata.processed = Some(report.finished);
        log::info!(
            "Processed {} pages: {} classified, {} merges, {} tables ({} skipped)",
            report.page_count,
            report.classified,
            report.merges,
            report.tables_built,
            report.tables_skipped
        );
        Ok(report)
    }

    /// Run with every proposal accepted unchanged.
    pub fn run_auto(&self, doc: &mut Document) -> Result<PipelineReport> {
        self.run(doc, &mut AcceptAll)
    }

    /// Process independent documents, each with proposals accepted unchanged.
    pub fn process_batch(&self, docs: &mut [Document]) -> Vec<Result<PipelineReport>> {
        if self.options.parallel {
            docs.par_iter_mut().map(|doc| self.run_auto(doc)).collect()
        } else {
            docs.iter_mut().map(|doc| self.run_auto(doc)).collect()
        }
    }

    fn map_pages<T, F>(&self, pages: &mut [Page], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&mut Page) -> T + Sync + Send,
    {
        if self.options.parallel {
            pages.par_iter_mut().map(f).collect()
        } else {
            pages.iter_mut().map(f).collect()
        }
    }
}

fn load_confusion(options: &PipelineOptions) -> Result<Option<DigitConfusion>> {
    if let Some(table) = &options.confusion {
        return Ok(Some(table.clone()));
    }
    let Some(path) = &options.confusion_path else {
        return Ok(None);
    };
    match DigitConfusion::load(path) {
        Ok(table) => Ok(Some(table)),
        Err(Error::Io(e)) => {
            log::warn!(
                "Digit confusion table {} unavailable ({}); OCR'd pages use exact matching",
                path.display(),
                e
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, Region, RegionType, Word};
    use std::io::Write;

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
    fn test_missing_confusion_file_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let options = PipelineOptions::new().with_confusion_file(dir.path().join("missing.txt"));
        let pipeline = Pipeline::new(options).unwrap();
        assert!(!pipeline.resolver.extractor().is_fuzzy());
    }

    #[test]
    fn test_malformed_confusion_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x abc").unwrap();
        let options = PipelineOptions::new().with_confusion_file(file.path());
        assert!(matches!(
            Pipeline::new(options),
            Err(Error::InvalidConfig { line: 1, .. })
        ));
    }

    #[test]
    fn test_run_reports_page_numbers() {
        let mut doc = document();
        let report = Pipeline::with_defaults().unwrap().run_auto(&mut doc).unwrap();

        assert_eq!(report.classified, 3);
        assert!(!report.cancelled);
        assert_eq!(report.cutoff, 3);
        let values: Vec<Option<i64>> = report.page_numbers.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![Some(5), Some(6), Some(7)]);
        assert_eq!(doc.page_numbers(), vec![Some(5), Some(6), Some(7)]);
        assert!(doc.metadata.processed.is_some());
    }

    #[test]
    fn test_cancelled_run_keeps_cutoff() {
        let mut doc = document();
        let pipeline = Pipeline::new(PipelineOptions::new().sequential()).unwrap();
        let report = pipeline.run(&mut doc, &mut CancelAt::new(10)).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.cutoff, 3);
    }

    #[test]
    fn test_disabled_passes() {
        let mut doc = document();
        let options = PipelineOptions::new()
            .with_classification(false)
            .with_page_numbers(false);
        let report = Pipeline::new(options).unwrap().run_auto(&mut doc).unwrap();
        assert_eq!(report.classified, 0);
        assert!(report.page_numbers.is_empty());
        assert_eq!(doc.pages[0].regions[0].kind, RegionType::Paragraph);
    }

    #[test]
    fn test_process_batch() {
        let mut docs = vec![document(), document()];
        let reports = Pipeline::with_defaults().unwrap().process_batch(&mut docs);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.is_ok()));
    }
}
