//! Word-level types: positional tokens and their bounding boxes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::structure::Interval;

/// Opaque key to string attribute map supplied by the annotation collaborator.
pub type Attributes = BTreeMap<String, String>;

/// An axis-aligned box in page pixel space (y grows downward).
///
/// The wire form is `left,right,top,bottom`, the order the OCR collaborator
/// writes it in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundingBox {
    /// Left edge
    pub left: f32,
    /// Right edge
    pub right: f32,
    /// Top edge
    pub top: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Box width.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Box height.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Horizontal extent as an interval.
    pub fn horizontal(&self) -> Interval {
        Interval::new(self.left, self.right)
    }

    /// Vertical extent as an interval.
    pub fn vertical(&self) -> Interval {
        Interval::new(self.top, self.bottom)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Union over an iterator of boxes, `None` when empty.
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<BoundingBox> {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BoundingBox>, b| match acc {
                Some(a) => Some(a.union(b)),
                None => Some(*b),
            })
    }

    /// Check whether the interiors of two boxes intersect.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.horizontal().overlaps(&other.horizontal()) && self.vertical().overlaps(&other.vertical())
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// Format as a single page entry of an aggregated box string: `[l,r,t,b]`.
    pub fn to_bracketed(&self) -> String {
        format!("[{}]", self)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.right, self.top, self.bottom)
    }
}

impl FromStr for BoundingBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(Error::InvalidBoundingBox(s.to_string()));
        }

        let mut coords = [0f32; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f32>()
                .map_err(|_| Error::InvalidBoundingBox(s.to_string()))?;
        }

        let [left, right, top, bottom] = coords;
        if left > right || top > bottom {
            return Err(Error::InvalidBoundingBox(s.to_string()));
        }
        Ok(Self::new(left, right, top, bottom))
    }
}

impl TryFrom<String> for BoundingBox {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BoundingBox> for String {
    fn from(value: BoundingBox) -> Self {
        value.to_string()
    }
}

/// Per-page boxes of a region that may span several pages.
///
/// Entry 0 is the region's own page; a `None` entry is a page the region
/// skips. Serialized as the aggregated form `[l,r,t,b][][l,r,t,b]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageBoxes(pub Vec<Option<BoundingBox>>);

impl PageBoxes {
    /// Boxes for a region confined to one page.
    pub fn single(bbox: BoundingBox) -> Self {
        Self(vec![Some(bbox)])
    }

    /// Box on the region's own page.
    pub fn first(&self) -> Option<BoundingBox> {
        self.0.first().copied().flatten()
    }

    /// Number of pages covered, skipped pages included.
    pub fn page_span(&self) -> usize {
        self.0.len().max(1)
    }

    /// Check if no box is known at all.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Append the boxes of a later region that starts `offset` pages after
    /// this region's first page. Pages in between become `[]` placeholders;
    /// a page both regions touch gets the union of the two boxes.
    pub fn append_at(&mut self, offset: usize, later: &PageBoxes) {
        let later_boxes: &[Option<BoundingBox>] = if later.0.is_empty() {
            &[None]
        } else {
            &later.0
        };
        for (i, bbox) in later_boxes.iter().enumerate() {
            let index = offset + i;
            if index >= self.0.len() {
                self.0.resize(index + 1, None);
            }
            self.0[index] = match (self.0[index], bbox) {
                (Some(a), Some(b)) => Some(a.union(b)),
                (a, b) => a.or(*b),
            };
        }
    }
}

impl fmt::Display for PageBoxes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.0 {
            match entry {
                Some(bbox) => write!(f, "[{}]", bbox)?,
                None => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PageBoxes {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        if !s.starts_with('[') {
            return Ok(Self(vec![Some(s.parse()?)]));
        }

        let mut boxes = Vec::new();
        for chunk in s.split(']') {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            let inner = chunk
                .strip_prefix('[')
                .ok_or_else(|| Error::InvalidBoundingBox(s.to_string()))?;
            if inner.trim().is_empty() {
                boxes.push(None);
            } else {
                boxes.push(Some(inner.parse()?));
            }
        }
        Ok(Self(boxes))
    }
}

impl TryFrom<String> for PageBoxes {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PageBoxes> for String {
    fn from(value: PageBoxes) -> Self {
        value.to_string()
    }
}

/// A positional token produced by OCR or born-digital extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    /// Recognized text
    #[serde(rename = "str")]
    pub text: String,

    /// Bounding box on the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Baseline y coordinate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f32>,

    /// Font size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Bold font flag
    #[serde(default)]
    pub bold: bool,

    /// Italic font flag
    #[serde(default)]
    pub italic: bool,

    /// Token-level attributes
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Word {
    /// Create a word without position.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bounding_box: None,
            baseline: None,
            font_size: None,
            bold: false,
            italic: false,
            attributes: Attributes::new(),
        }
    }

    /// Create a word with a bounding box.
    pub fn at(text: impl Into<String>, bbox: BoundingBox) -> Self {
        let mut word = Self::new(text);
        word.bounding_box = Some(bbox);
        word
    }

    /// Set font size and return self.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Font size in points, falling back to the box height scaled by the
    /// image resolution.
    pub fn effective_font_size(&self, dpi: u32) -> Option<f32> {
        self.font_size.or_else(|| {
            self.bounding_box
                .filter(|_| dpi > 0)
                .map(|b| b.height() * 72.0 / dpi as f32)
        })
    }

    /// Check if the first character is a lower-case letter.
    pub fn starts_lowercase(&self) -> bool {
        self.text
            .chars()
            .next()
            .map(char::is_lowercase)
            .unwrap_or(false)
    }
}
