//! Pipeline options and configuration.

use std::path::PathBuf;

use crate::structure::{ClassifierConfig, DigitConfusion, PageNumberConfig, StitchConfig, TableConfig};

/// Options for running the structure pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Whether to classify paragraphs still typed `paragraph`
    pub classification: bool,

    /// Whether to resolve page numbers
    pub page_numbers: bool,

    /// Whether to stitch continuations across pages
    pub stitching: bool,

    /// Whether to rebuild table grids
    pub tables: bool,

    /// Whether to use parallel processing
    pub parallel: bool,

    /// Digit confusion table for OCR'd pages
    pub confusion: Option<DigitConfusion>,

    /// File to load the digit confusion table from, if no table is given
    pub confusion_path: Option<PathBuf>,

    /// Page-number resolver configuration
    pub page_number_config: PageNumberConfig,

    /// Paragraph classifier configuration
    pub classifier_config: ClassifierConfig,

    /// Stitcher configuration
    pub stitch_config: StitchConfig,

    /// Table builder configuration
    pub table_config: TableConfig,
}

impl PipelineOptions {
    /// Create new pipeline options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable page-number resolution.
    pub fn with_page_numbers(mut self, enabled: bool) -> Self {
        self.page_numbers = enabled;
        self
    }

    /// Enable or disable table reconstruction.
    pub fn with_tables(mut self, enabled: bool) -> Self {
        self.tables = enabled;
        self
    }

    /// Enable or disable continuation stitching.
    pub fn with_stitching(mut self, enabled: bool) -> Self {
        self.stitching = enabled;
        self
    }

    /// Enable or disable paragraph classification.
    pub fn with_classification(mut self, enabled: bool) -> Self {
        self.classification = enabled;
        self
    }

    /// Use a digit confusion table for OCR'd pages.
    pub fn with_confusion(mut self, confusion: DigitConfusion) -> Self {
        self.confusion = Some(confusion);
        self
    }

    /// Load the digit confusion table from a file when the pipeline is built.
    ///
    /// A missing or unreadable file is not an error: OCR'd pages then fall
    /// back to exact digit matching.
    pub fn with_confusion_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.confusion_path = Some(path.into());
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page-number resolver configuration.
    pub fn with_page_number_config(mut self, config: PageNumberConfig) -> Self {
        self.page_number_config = config;
        self
    }

    /// Set paragraph classifier configuration.
    pub fn with_classifier_config(mut self, config: ClassifierConfig) -> Self {
        self.classifier_config = config;
        self
    }

    /// Set stitcher configuration.
    pub fn with_stitch_config(mut self, config: StitchConfig) -> Self {
        self.stitch_config = config;
        self
    }

    /// Set table builder configuration.
    pub fn with_table_config(mut self, config: TableConfig) -> Self {
        self.table_config = config;
        self
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            classification: true,
            page_numbers: true,
            stitching: true,
            tables: true,
            parallel: true,
            confusion: None,
            confusion_path: None,
            page_number_config: PageNumberConfig::default(),
            classifier_config: ClassifierConfig::default(),
            stitch_config: StitchConfig::default(),
            table_config: TableConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_options_builder() {
        let options = PipelineOptions::new()
            .with_tables(false)
            .with_stitching(false)
            .with_confusion_file("config/digit_confusion.txt")
            .sequential();

        assert!(!options.tables);
        assert!(!options.stitching);
        assert!(options.page_numbers);
        assert!(options.classification);
        assert!(!options.parallel);
        assert_eq!(
            options.confusion_path,
            Some(PathBuf::from("config/digit_confusion.txt"))
        );
    }

    #[test]
    fn test_pipeline_options_default() {
        let options = PipelineOptions::default();
        assert!(options.parallel);
        assert!(options.confusion.is_none());
        assert_eq!(options.page_number_config.max_misses, 3);
        assert_eq!(options.table_config.min_cells, 2);
    }
}
