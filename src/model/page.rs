//! Page-level types.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::region::shift;
use super::{Annotation, Attributes, BoundingBox, Region, RegionType, Word};

/// Resolution assumed when the collaborator does not report one.
pub const DEFAULT_DPI: u32 = 300;

/// A single page: an ordered run of words plus the spans laid over them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Page id (not necessarily contiguous across the document)
    #[serde(rename = "pageId")]
    pub id: i64,

    /// Whether the words come from OCR (vs. born-digital text)
    #[serde(default)]
    pub is_ocred: bool,

    /// Image resolution in dots per inch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,

    /// Average font size in points, if the collaborator measured it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Page bounding box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Words in reading order
    #[serde(default)]
    pub words: Vec<Word>,

    /// Top-level regions, sorted by start offset
    #[serde(default)]
    pub regions: Vec<Region>,

    /// Inline spans (indicators, page numbers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,

    /// Page attributes
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// Words detached from a page together with the annotations inside them.
///
/// Annotation offsets are relative to the first buffered word.
#[derive(Debug, Clone, Default)]
pub struct SpanBuffer {
    /// Detached words
    pub words: Vec<Word>,
    /// Detached annotations, rebased to 0
    pub annotations: Vec<Annotation>,
}

impl SpanBuffer {
    /// Number of buffered words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the buffer holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Index mapping for moving `[from.start, from.end)` back to position `to`.
#[derive(Debug, Clone, Copy)]
pub struct RangeMove {
    to: usize,
    start: usize,
    end: usize,
}

impl RangeMove {
    /// Map a span `[start, end)` through the move.
    ///
    /// Spans that enclose both the destination and the moved range keep their
    /// offsets; spans that straddle a boundary are left untouched.
    pub fn map(&self, start: usize, end: usize) -> (usize, usize) {
        let len = self.end - self.start;
        if start >= self.start && end <= self.end && end > start {
            let delta = self.to as isize - self.start as isize;
            (shift(start, delta), shift(end, delta))
        } else if start >= self.to && end <= self.start {
            (start + len, end + len)
        } else {
            (start, end)
        }
    }
}

impl Page {
    /// Create an empty page.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            is_ocred: false,
            dpi: None,
            font_size: None,
            bounding_box: None,
            words: Vec::new(),
            regions: Vec::new(),
            annotations: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// Create an OCR'd page.
    pub fn ocred(id: i64) -> Self {
        Self {
            is_ocred: true,
            ..Self::new(id)
        }
    }

    /// Add a word and return its index.
    pub fn add_word(&mut self, word: Word) -> usize {
        self.words.push(word);
        self.words.len() - 1
    }

    /// Add a top-level region, keeping regions sorted by start.
    pub fn add_region(&mut self, region: Region) {
        let pos = self
            .regions
            .partition_point(|r| (r.start, r.end) <= (region.start, region.end));
        self.regions.insert(pos, region);
    }

    /// Add an inline annotation.
    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// Image resolution, defaulting to [`DEFAULT_DPI`].
    pub fn dpi(&self) -> u32 {
        self.dpi.filter(|d| *d > 0).unwrap_or(DEFAULT_DPI)
    }

    /// Set a page attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Get a page attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Text of the words in `range`, space separated.
    pub fn text(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.words.len());
        let start = range.start.min(end);
        self.words[start..end]
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Plain text of the whole page.
    pub fn plain_text(&self) -> String {
        self.text(0..self.words.len())
    }

    /// Check if the page has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Average font size in points: the collaborator's figure when present,
    /// otherwise measured over the words.
    pub fn average_font_size(&self) -> Option<f32> {
        if let Some(size) = self.font_size.filter(|s| *s > 0.0) {
            return Some(size);
        }
        let mut stats = FontStatistics::default();
        let dpi = self.dpi();
        for word in &self.words {
            if let Some(size) = word.effective_font_size(dpi) {
                stats.add_size(size);
            }
        }
        stats.analyze();
        stats.average
    }

    /// Annotations lying within `[start, end)`.
    pub fn annotations_within(
        &self,
        start: usize,
        end: usize,
    ) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations
            .iter()
            .filter(move |a| a.is_within(start, end))
    }

    /// Remove all annotations of `kind`.
    pub fn remove_annotations(&mut self, kind: &RegionType) {
        self.annotations.retain(|a| &a.kind != kind);
    }

    /// Detach the words in `range` together with the annotations inside it.
    ///
    /// Spans after the range move down; spans enclosing it shrink. The caller
    /// owns any region covering the range and must detach it beforehand.
    pub fn extract_range(&mut self, range: Range<usize>) -> SpanBuffer {
        let Range { start, end } = range;
        let len = end - start;
        let words: Vec<Word> = self.words.drain(start..end).collect();

        let mut detached = Vec::new();
        let mut kept = Vec::with_capacity(self.annotations.len());
        for mut annotation in self.annotations.drain(..) {
            if annotation.is_within(start, end) && !(annotation.is_empty() && annotation.start == end)
            {
                annotation.start -= start;
                annotation.end -= start;
                detached.push(annotation);
            } else if annotation.start >= start && annotation.start < end {
                log::debug!(
                    "Dropping {} annotation straddling moved words {}..{}",
                    annotation.kind,
                    start,
                    end
                );
            } else {
                let (s, e) = shrink(annotation.start, annotation.end, start, len);
                annotation.start = s;
                annotation.end = e;
                kept.push(annotation);
            }
        }
        self.annotations = kept;

        for region in &mut self.regions {
            region.remap(&|s, e| shrink(s, e, start, len));
        }

        SpanBuffer {
            words,
            annotations: detached,
        }
    }

    /// Splice buffered words in at `at`.
    ///
    /// Spans starting at or after `at` move up; spans strictly enclosing `at`
    /// grow. Returns the offset the buffer's words now start at.
    pub fn insert_buffer(&mut self, at: usize, buffer: SpanBuffer) -> usize {
        let len = buffer.words.len();
        let grow = |s: usize, e: usize| {
            if s >= at {
                (s + len, e + len)
            } else if e > at {
                (s, e + len)
            } else {
                (s, e)
            }
        };

        for annotation in &mut self.annotations {
            let (s, e) = grow(annotation.start, annotation.end);
            annotation.start = s;
            annotation.end = e;
        }
        for region in &mut self.regions {
            region.remap(&grow);
        }

        self.words.splice(at..at, buffer.words);
        for mut annotation in buffer.annotations {
            annotation.start += at;
            annotation.end += at;
            self.annotations.push(annotation);
        }
        at
    }

    /// Move the words in `from` back to position `to` (`to <= from.start`).
    ///
    /// All attached regions and annotations are remapped; the returned move
    /// can be applied to regions the caller detached beforehand.
    pub fn relocate(&mut self, from: Range<usize>, to: usize) -> RangeMove {
        debug_assert!(to <= from.start);
        let mv = RangeMove {
            to,
            start: from.start,
            end: from.end,
        };
        if to == from.start || from.is_empty() {
            return mv;
        }

        self.words[to..from.end].rotate_right(from.end - from.start);
        for annotation in &mut self.annotations {
            let (s, e) = mv.map(annotation.start, annotation.end);
            annotation.start = s;
            annotation.end = e;
        }
        for region in &mut self.regions {
            region.remap(&|s, e| mv.map(s, e));
        }
        mv
    }

    /// Reorder the words of `range` so that position `i` of the range holds
    /// the word previously at `order[i]` (absolute indices).
    ///
    /// Annotations inside the range follow their words when they stay
    /// contiguous and are dropped otherwise.
    pub fn reorder_range(&mut self, range: Range<usize>, order: &[usize]) {
        debug_assert_eq!(order.len(), range.len());
        let mut new_pos: HashMap<usize, usize> = HashMap::with_capacity(order.len());
        for (i, &old) in order.iter().enumerate() {
            new_pos.insert(old, range.start + i);
        }

        let reordered: Vec<Word> = order.iter().map(|&i| self.words[i].clone()).collect();
        self.words.splice(range.clone(), reordered);

        self.annotations.retain_mut(|annotation| {
            if !annotation.is_within(range.start, range.end) || annotation.is_empty() {
                return true;
            }
            let positions: Vec<usize> = (annotation.start..annotation.end)
                .filter_map(|i| new_pos.get(&i).copied())
                .collect();
            let min = positions.iter().copied().min().unwrap_or(annotation.start);
            let max = positions.iter().copied().max().unwrap_or(annotation.start);
            if positions.len() == annotation.len() && max + 1 - min == positions.len() {
                annotation.start = min;
                annotation.end = max + 1;
                true
            } else {
                log::debug!("Dropping {} annotation split by reordering", annotation.kind);
                false
            }
        });
    }
}

/// Remap a span after `len` words at `start` were removed.
fn shrink(s: usize, e: usize, start: usize, len: usize) -> (usize, usize) {
    let end = start + len;
    let map = |i: usize| {
        if i >= end {
            i - len
        } else if i > start {
            start
        } else {
            i
        }
    };
    (map(s), map(e))
}

/// Font size statistics for a page.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Mean font size over all observations
    pub average: Option<f32>,
    /// Most common font size
    pub body_size: Option<f32>,
    /// All observed font sizes with frequency, keyed at 0.1pt precision
    pub size_histogram: HashMap<i32, usize>,
    sum: f32,
    count: usize,
}

impl FontStatistics {
    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        if !size.is_finite() || size <= 0.0 {
            return;
        }
        let key = (size * 10.0) as i32;
        *self.size_histogram.entry(key).or_insert(0) += 1;
        self.sum += size;
        self.count += 1;
    }

    /// Calculate average and body size.
    pub fn analyze(&mut self) {
        if self.count == 0 {
            self.average = None;
            self.body_size = None;
            return;
        }
        self.average = Some(self.sum / self.count as f32);
        self.body_size = self
            .size_histogram
            .iter()
            .max_by_key(|(key, count)| (**count, std::cmp::Reverse(**key)))
            .map(|(key, _)| *key as f32 / 10.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_words(n: usize) -> Page {
        let mut page = Page::new(1);
        for i in 0..n {
            page.add_word(Word::new(format!("w{}", i)));
        }
        page
    }

    #[test]
    fn test_page_new() {
        let page = Page::new(7);
        assert_eq!(page.id, 7);
        assert!(page.is_empty());
        assert_eq!(page.dpi(), DEFAULT_DPI);
        assert!(Page::ocred(1).is_ocred);
    }

    #[test]
    fn test_add_region_keeps_order() {
        let mut page = page_with_words(10);
        page.add_region(Region::new(RegionType::MainText, 5, 10));
        page.add_region(Region::new(RegionType::Heading, 0, 5));
        assert_eq!(page.regions[0].kind, RegionType::Heading);
    }

    #[test]
    fn test_extract_and_insert_buffer() {
        let mut source = page_with_words(6);
        source.add_region(Region::new(RegionType::MainText, 0, 2));
        source.add_region(Region::new(RegionType::PageTitle, 4, 6));
        source.add_annotation(Annotation::new(RegionType::Footnote, 2, 3));

        let buffer = source.extract_range(2..4);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.annotations[0].start, 0);
        assert_eq!(source.words.len(), 4);
        assert_eq!((source.regions[1].start, source.regions[1].end), (2, 4));

        let mut target = page_with_words(3);
        target.add_region(Region::new(RegionType::MainText, 0, 2));
        target.add_region(Region::new(RegionType::Caption, 2, 3));
        let at = target.insert_buffer(2, buffer);
        assert_eq!(at, 2);
        assert_eq!(target.words[2].text, "w2");
        assert_eq!((target.regions[0].start, target.regions[0].end), (0, 2));
        assert_eq!((target.regions[1].start, target.regions[1].end), (4, 5));
        assert_eq!(target.annotations[0].start, 2);
    }

    #[test]
    fn test_relocate_moves_words_back() {
        let mut page = page_with_words(6);
        page.add_region(Region::new(RegionType::Caption, 2, 4));
        page.add_annotation(Annotation::new(RegionType::Footnote, 4, 5));

        let mv = page.relocate(4..6, 2);
        let texts: Vec<&str> = page.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["w0", "w1", "w4", "w5", "w2", "w3"]);
        assert_eq!((page.regions[0].start, page.regions[0].end), (4, 6));
        assert_eq!(page.annotations[0].start, 2);
        assert_eq!(mv.map(0, 6), (0, 6));
    }

    #[test]
    fn test_reorder_range() {
        let mut page = page_with_words(4);
        page.add_annotation(Annotation::new(RegionType::Footnote, 3, 4));
        page.add_annotation(Annotation::new(RegionType::Caption, 1, 3));
        page.reorder_range(0..4, &[3, 0, 1, 2]);
        assert_eq!(page.words[0].text, "w3");
        assert_eq!(page.annotations.len(), 2);
        assert_eq!(page.annotations[0].start, 0);
        assert_eq!((page.annotations[1].start, page.annotations[1].end), (2, 4));
    }

    #[test]
    fn test_font_statistics() {
        let mut stats = FontStatistics::default();
        for _ in 0..10 {
            stats.add_size(10.0);
        }
        stats.add_size(20.0);
        stats.add_size(f32::NAN);
        stats.analyze();
        assert_eq!(stats.body_size, Some(10.0));
        let avg = stats.average.unwrap();
        assert!((avg - 120.0 / 11.0).abs() < 1e-4);
    }
}
