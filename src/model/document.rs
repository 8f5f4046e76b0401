//! Document-level types.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use super::Page;
use crate::detect::{detect_format_from_bytes, InputFormat};
use crate::error::{Error, Result};

/// A page range as handed over by the annotation collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Pages in document order
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from a JSON or gzip-compressed JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut data = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Parse a document from JSON or gzip-compressed JSON bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match detect_format_from_bytes(data)? {
            InputFormat::Json => {
                let data = data.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(data);
                Ok(serde_json::from_slice(data)?)
            }
            InputFormat::GzipJson => {
                let mut json = Vec::new();
                GzDecoder::new(data).read_to_end(&mut json)?;
                Ok(serde_json::from_slice(&json)?)
            }
        }
    }

    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get a page by index.
    pub fn get_page(&self, index: usize) -> Result<&Page> {
        self.pages
            .get(index)
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    /// Index of the page with the given id.
    pub fn page_index(&self, id: i64) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Resolved page numbers in page order (`None` where undetermined).
    pub fn page_numbers(&self) -> Vec<Option<i64>> {
        self.pages
            .iter()
            .map(|p| {
                p.attribute(PAGE_NUMBER_ATTRIBUTE)
                    .and_then(|v| v.parse::<i64>().ok())
                    .filter(|v| *v >= 0)
            })
            .collect()
    }

    /// Get plain text content of the document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Total number of words.
    pub fn word_count(&self) -> usize {
        self.pages.iter().map(|p| p.words.len()).sum()
    }
}

/// Page attribute holding the resolved page number (`-1` if undetermined).
pub const PAGE_NUMBER_ATTRIBUTE: &str = "pageNumber";

/// Document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Where the pages came from (file name, scan batch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// When the structure pass last ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<DateTime<Utc>>,
}
