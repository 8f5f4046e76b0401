//! Typed content spans: regions and inline annotations.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Attributes, BoundingBox, PageBoxes};

/// Logical type of a region or annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegionType {
    /// Not classified yet
    Paragraph,
    /// Body text
    MainText,
    /// Footnote
    Footnote,
    /// Figure or table caption
    Caption,
    /// Heading
    Heading,
    /// Table (grid reconstructed by the table builder)
    Table,
    /// Noise left by the recognizer (stamps, specks, rulers)
    OcrArtifact,
    /// Running page header
    PageTitle,
    /// Page number
    PageNumber,
    /// Bibliographic reference
    BibRef,
    /// Table row produced by the table builder
    TableRow,
    /// Table cell produced by the table builder
    TableCell,
    /// Any other collaborator-defined type
    Other(String),
}

impl RegionType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            RegionType::Paragraph => "paragraph",
            RegionType::MainText => "mainText",
            RegionType::Footnote => "footnote",
            RegionType::Caption => "caption",
            RegionType::Heading => "heading",
            RegionType::Table => "table",
            RegionType::OcrArtifact => "ocrArtifact",
            RegionType::PageTitle => "pageTitle",
            RegionType::PageNumber => "pageNumber",
            RegionType::BibRef => "bibRef",
            RegionType::TableRow => "tr",
            RegionType::TableCell => "td",
            RegionType::Other(name) => name,
        }
    }

    /// Parse a wire name; unknown names are kept verbatim.
    pub fn parse(name: &str) -> Self {
        match name {
            "paragraph" => RegionType::Paragraph,
            "mainText" => RegionType::MainText,
            "footnote" => RegionType::Footnote,
            "caption" => RegionType::Caption,
            "heading" => RegionType::Heading,
            "table" => RegionType::Table,
            "ocrArtifact" => RegionType::OcrArtifact,
            "pageTitle" | "pageHeader" => RegionType::PageTitle,
            "pageNumber" => RegionType::PageNumber,
            "bibRef" => RegionType::BibRef,
            "tr" => RegionType::TableRow,
            "td" => RegionType::TableCell,
            other => RegionType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RegionType {
    fn from(value: String) -> Self {
        RegionType::parse(&value)
    }
}

impl From<RegionType> for String {
    fn from(value: RegionType) -> Self {
        value.as_str().to_string()
    }
}

/// An inline span over word indices `[start, end)` of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Span type
    #[serde(rename = "type")]
    pub kind: RegionType,
    /// First word index
    pub start: usize,
    /// One past the last word index
    pub end: usize,
    /// Span attributes
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Annotation {
    /// Create a new annotation.
    pub fn new(kind: RegionType, start: usize, end: usize) -> Self {
        Self {
            kind,
            start,
            end,
            attributes: Attributes::new(),
        }
    }

    /// Set an attribute and return self.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Number of words covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span covers no words.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check if the span lies within `[start, end)`.
    pub fn is_within(&self, start: usize, end: usize) -> bool {
        self.start >= start && self.end <= end
    }
}

/// A typed block of content on a page, possibly with nested regions.
///
/// Word offsets of the region and of all nested children are absolute
/// indices into the owning page's word list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Region type
    #[serde(rename = "type")]
    pub kind: RegionType,

    /// First word index
    pub start: usize,

    /// One past the last word index
    pub end: usize,

    /// Marks a block split across a page boundary that still has to be
    /// joined with its counterpart
    #[serde(default, rename = "continue", skip_serializing_if = "std::ops::Not::not")]
    pub continues: bool,

    /// Per-page bounding boxes
    #[serde(default, rename = "boundingBox", skip_serializing_if = "PageBoxes::is_empty")]
    pub bounding_boxes: PageBoxes,

    /// Region attributes
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,

    /// Nested regions in reading order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Region>,
}

impl Region {
    /// Create a new region over `[start, end)`.
    pub fn new(kind: RegionType, start: usize, end: usize) -> Self {
        Self {
            kind,
            start,
            end,
            continues: false,
            bounding_boxes: PageBoxes::default(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Set the bounding box on the region's own page and return self.
    pub fn with_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_boxes = PageBoxes::single(bbox);
        self
    }

    /// Mark the region as a continuation and return self.
    pub fn continued(mut self) -> Self {
        self.continues = true;
        self
    }

    /// Add a nested region and return self.
    pub fn with_child(mut self, child: Region) -> Self {
        self.children.push(child);
        self
    }

    /// Bounding box on the region's own page.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_boxes.first()
    }

    /// Number of words covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the region covers no words.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Get an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Apply `map` to the offsets of this region and every nested child.
    pub fn remap(&mut self, map: &impl Fn(usize, usize) -> (usize, usize)) {
        let (start, end) = map(self.start, self.end);
        self.start = start;
        self.end = end;
        for child in &mut self.children {
            child.remap(map);
        }
    }

    /// Shift this region and every nested child by `delta` words.
    pub fn offset(&mut self, delta: isize) {
        self.remap(&|start, end| (shift(start, delta), shift(end, delta)));
    }
}

/// Shift an index by a signed delta, clamping at zero.
pub(crate) fn shift(index: usize, delta: isize) -> usize {
    if delta >= 0 {
        index + delta as usize
    } else {
        index.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_type_round_trip_names() {
        for name in ["mainText", "footnote", "ocrArtifact", "tr", "td", "bibRef"] {
            assert_eq!(RegionType::parse(name).as_str(), name);
        }
        assert_eq!(
            RegionType::parse("sidebar"),
            RegionType::Other("sidebar".to_string())
        );
        assert_eq!(RegionType::parse("pageHeader"), RegionType::PageTitle);
    }

    #[test]
    fn test_region_offset_nested() {
        let mut region = Region::new(RegionType::Table, 10, 20)
            .with_child(Region::new(RegionType::Paragraph, 10, 14))
            .with_child(Region::new(RegionType::Paragraph, 14, 20));
        region.offset(-10);
        assert_eq!((region.start, region.end), (0, 10));
        assert_eq!((region.children[1].start, region.children[1].end), (4, 10));

        region.offset(5);
        assert_eq!(region.children[0].start, 5);
    }

    #[test]
    fn test_region_serde_continue_flag() {
        let region = Region::new(RegionType::Footnote, 0, 3)
            .with_box(BoundingBox::new(0.0, 1.0, 0.0, 1.0))
            .continued();
        let json = serde_json::to_string(&region).unwrap();
        assert!(json.contains("\"continue\":true"));
        assert!(json.contains("\"type\":\"footnote\""));
        assert!(json.contains("\"boundingBox\":\"[0,1,0,1]\""));

        let plain = serde_json::to_string(&Region::new(RegionType::MainText, 0, 1)).unwrap();
        assert!(!plain.contains("continue"));
    }
}
