//! Page-number resolution under OCR uncertainty.
//!
//! Candidates are read from the first and last words of every page, each
//! reading becomes a [`Hypothesis`], and hypotheses are scored by how well
//! neighbouring pages agree with their progression. The best hypothesis per
//! page is then repaired against its neighbours and de-duplicated before
//! being written back.
//!
//! # Example
//! ```no_run
//! use pagestruct::structure::{DigitConfusion, PageNumberConfig, PageNumberResolver};
//! use pagestruct::Document;
//!
//! let mut doc = Document::load("pages.json").unwrap();
//! let confusion = DigitConfusion::load("config/digit_confusion.txt").ok();
//! let resolver = PageNumberResolver::new(PageNumberConfig::default(), confusion).unwrap();
//! for h in resolver.resolve(&mut doc.pages) {
//!     println!("page {} -> {}", h.page_id, h.value);
//! }
//! ```

mod candidate;
mod confusion;
mod resolver;

pub use candidate::{Candidate, CandidateExtractor, DigitSlot};
pub use confusion::DigitConfusion;
pub use resolver::{Hypothesis, PageNumberResolver, PageValue, UNKNOWN};

/// Page-number resolver configuration.
#[derive(Debug, Clone)]
pub struct PageNumberConfig {
    /// Words at the start and end of a page searched for candidates
    pub margin_tokens: usize,
    /// Consecutive misses that end a scoring scan
    pub max_misses: usize,
    /// Candidates with this many positions or more are rejected
    pub max_digits: usize,
    /// Pattern for born-digital pages
    pub strict_pattern: String,
    /// Pattern for OCR'd pages when no confusion table is available
    pub fallback_pattern: String,
}

impl Default for PageNumberConfig {
    fn default() -> Self {
        Self {
            margin_tokens: 25,
            max_misses: 3,
            max_digits: 6,
            strict_pattern: "[1-9][0-9]+".to_string(),
            fallback_pattern: "[0-9]+".to_string(),
        }
    }
}

impl PageNumberConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of margin words searched.
    pub fn with_margin_tokens(mut self, tokens: usize) -> Self {
        self.margin_tokens = tokens;
        self
    }

    /// Set the pattern used on born-digital pages.
    pub fn with_strict_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.strict_pattern = pattern.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let config = PageNumberConfig::new().with_strict_pattern("[1-9");
        let result = PageNumberResolver::new(config, None);
        assert!(matches!(result, Err(Error::InvalidPattern(_))));
    }
}
