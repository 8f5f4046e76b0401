//! # pagestruct
//!
//! Page-layout reconstruction for OCR'd and born-digital page scans.
//!
//! Input is a run of pages, each an ordered sequence of words with
//! recognized text and a bounding box, plus the regions an upstream layout
//! step laid over them. This library recovers the logical structure the
//! words alone do not carry: printed page numbers, table grids, and blocks
//! that continue across page boundaries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagestruct::{process_file, render};
//!
//! fn main() -> pagestruct::Result<()> {
//!     let (doc, report) = process_file("scan.json")?;
//!     println!("{} continuations joined", report.merges);
//!     println!("{}", render::to_text(&doc));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Page numbers**: fuzzy digit matching with an OCR confusion table,
//!   cross-page scoring and sequence repair
//! - **Tables**: row/column lines from the gaps between cell boxes, with
//!   spans and synthetic empty cells
//! - **Continuations**: footnotes and body text split over pages are joined
//!   across headers, captions and other skippable material
//! - **Classification**: an initial type for every unclassified paragraph
//! - **Parallel processing**: Uses Rayon for pages and document batches

pub mod detect;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod structure;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, InputFormat};
pub use error::{Error, Result};
pub use model::{
    Annotation, BoundingBox, Document, Metadata, Page, Region, RegionType, Table, TableCell,
    TableRow, Word,
};
pub use pipeline::{
    AcceptAll, CancelAt, ChannelCorrector, CorrectionChannel, Pipeline, PipelineOptions,
    PipelineReport,
};
pub use render::{JsonFormat, TextOptions};
pub use structure::{
    DigitConfusion, PageNumberConfig, PageNumberResolver, ParagraphClassifier, RegionStitcher,
    StitchConfig, TableBuilder, TableConfig,
};

use std::path::Path;

/// Load a document and run the full pipeline with default options.
///
/// # Example
///
/// ```no_run
/// use pagestruct::process_file;
///
/// let (doc, report) = process_file("scan.json.gz").unwrap();
/// println!("Pages: {} ({} tables)", doc.page_count(), report.tables_built);
/// ```
pub fn process_file<P: AsRef<Path>>(path: P) -> Result<(Document, PipelineReport)> {
    process_file_with_options(path, PipelineOptions::default())
}

/// Load a document and run the pipeline with custom options.
pub fn process_file_with_options<P: AsRef<Path>>(
    path: P,
    options: PipelineOptions,
) -> Result<(Document, PipelineReport)> {
    let mut doc = Document::load(path)?;
    let report = Pipeline::new(options)?.run_auto(&mut doc)?;
    Ok((doc, report))
}

/// Parse a document from JSON or gzip-compressed JSON bytes and run the
/// full pipeline.
pub fn process_bytes(data: &[u8]) -> Result<(Document, PipelineReport)> {
    let mut doc = Document::from_bytes(data)?;
    let report = Pipeline::with_defaults()?.run_auto(&mut doc)?;
    Ok((doc, report))
}

/// Process independent documents with default options.
pub fn process_batch(docs: &mut [Document]) -> Result<Vec<Result<PipelineReport>>> {
    Ok(Pipeline::with_defaults()?.process_batch(docs))
}

/// Resolve page numbers only, returning them in page order.
pub fn resolve_page_numbers(doc: &mut Document, confusion: Option<DigitConfusion>) -> Result<Vec<Option<i64>>> {
    let resolver = PageNumberResolver::new(PageNumberConfig::default(), confusion)?;
    resolver.resolve(&mut doc.pages);
    Ok(doc.page_numbers())
}

/// Builder for processing documents.
///
/// # Example
///
/// ```no_run
/// use pagestruct::PageStruct;
///
/// let text = PageStruct::new()
///     .with_confusion_file("config/digit_confusion.txt")
///     .without_tables()
///     .sequential()
///     .process("scan.json")?
///     .to_text();
/// # Ok::<(), pagestruct::Error>(())
/// ```
pub struct PageStruct {
    options: PipelineOptions,
    cutoff: Option<usize>,
}

impl PageStruct {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            options: PipelineOptions::default(),
            cutoff: None,
        }
    }

    /// Load the digit confusion table from a file.
    pub fn with_confusion_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.options = self.options.with_confusion_file(path);
        self
    }

    /// Use a digit confusion table.
    pub fn with_confusion(mut self, confusion: DigitConfusion) -> Self {
        self.options = self.options.with_confusion(confusion);
        self
    }

    /// Skip table reconstruction.
    pub fn without_tables(mut self) -> Self {
        self.options = self.options.with_tables(false);
        self
    }

    /// Skip continuation stitching.
    pub fn without_stitching(mut self) -> Self {
        self.options = self.options.with_stitching(false);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Commit only pages below `cutoff`, as if review had been cancelled there.
    pub fn with_cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// Load and process a document file.
    pub fn process<P: AsRef<Path>>(self, path: P) -> Result<ProcessResult> {
        let doc = Document::load(path)?;
        self.process_document(doc)
    }

    /// Process a document from JSON or gzip-compressed JSON bytes.
    pub fn process_bytes(self, data: &[u8]) -> Result<ProcessResult> {
        let doc = Document::from_bytes(data)?;
        self.process_document(doc)
    }

    /// Process an already loaded document.
    pub fn process_document(self, mut document: Document) -> Result<ProcessResult> {
        let pipeline = Pipeline::new(self.options)?;
        let report = match self.cutoff {
            Some(cutoff) => pipeline.run(&mut document, &mut CancelAt::new(cutoff))?,
            None => pipeline.run_auto(&mut document)?,
        };
        Ok(ProcessResult { document, report })
    }
}

impl Default for PageStruct {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of processing a document.
pub struct ProcessResult {
    /// The processed document
    pub document: Document,
    /// What the pipeline did
    pub report: PipelineReport,
}

impl ProcessResult {
    /// Convert to plain text.
    pub fn to_text(&self) -> String {
        render::to_text(&self.document)
    }

    /// Convert to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.document, format)
    }

    /// Resolved page numbers in page order.
    pub fn page_numbers(&self) -> Vec<Option<i64>> {
        self.document.page_numbers()
    }

    /// Get the document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}
