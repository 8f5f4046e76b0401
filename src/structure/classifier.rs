//! Paragraph type classification.
//!
//! A rule cascade that gives every still unclassified paragraph an initial
//! type from its indicator spans, word spacing, lead-in text, indentation,
//! font size and alignment. The first rule that fires wins.

use regex::Regex;

use super::stitcher::StitchConfig;
use super::{region_at_mut, RegionPath};
use crate::error::Result;
use crate::model::{BoundingBox, Page, Region, RegionType, Word};

/// Region attribute the collaborator stores text alignment in.
pub const ORIENTATION_ATTRIBUTE: &str = "textOrientation";

/// Horizontal alignment of a paragraph's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Ragged right
    Left,
    /// Ragged left
    Right,
    /// Centered
    Centered,
    /// Flush both sides
    Justified,
}

impl Orientation {
    /// Parse an alignment attribute value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Orientation::Left),
            "right" => Some(Orientation::Right),
            "center" | "centered" | "centre" => Some(Orientation::Centered),
            "justified" | "justify" | "block" => Some(Orientation::Justified),
            _ => None,
        }
    }
}

/// The evidence a paragraph offers to the classifier.
#[derive(Debug, Clone)]
pub struct ParagraphView<'a> {
    /// Words of the paragraph
    pub words: &'a [Word],
    /// Types of indicator spans inside the paragraph
    pub indicators: Vec<RegionType>,
    /// Alignment reported by the collaborator
    pub orientation: Option<Orientation>,
    /// Bounds of the page's text, for measuring alignment
    pub text_block: Option<BoundingBox>,
}

impl<'a> ParagraphView<'a> {
    /// View over bare words.
    pub fn new(words: &'a [Word]) -> Self {
        Self {
            words,
            indicators: Vec::new(),
            orientation: None,
            text_block: None,
        }
    }

    /// View over a region of `page`.
    pub fn from_region(page: &'a Page, region: &Region, text_block: Option<BoundingBox>) -> Self {
        let end = region.end.min(page.words.len());
        let start = region.start.min(end);
        Self {
            words: &page.words[start..end],
            indicators: page
                .annotations_within(region.start, region.end)
                .map(|a| a.kind.clone())
                .collect(),
            orientation: region.attribute(ORIENTATION_ATTRIBUTE).and_then(Orientation::parse),
            text_block,
        }
    }

    fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Word boxes grouped into lines. A line breaks when a word starts left
    /// of its predecessor or sits below the line's extent.
    fn lines(&self) -> Vec<Vec<BoundingBox>> {
        let mut lines: Vec<Vec<BoundingBox>> = Vec::new();
        for bbox in self.words.iter().filter_map(|w| w.bounding_box) {
            match lines.last_mut() {
                Some(line) if continues_line(line, &bbox) => line.push(bbox),
                _ => lines.push(vec![bbox]),
            }
        }
        lines
    }

    /// Average character width over words with a box.
    fn char_width(&self) -> Option<f32> {
        let (width, chars) = self
            .words
            .iter()
            .filter_map(|w| w.bounding_box.map(|b| (b.width(), w.text.chars().count())))
            .fold((0.0f32, 0usize), |(w, c), (bw, bc)| (w + bw, c + bc));
        (chars > 0 && width > 0.0).then(|| width / chars as f32)
    }
}

fn continues_line(line: &[BoundingBox], bbox: &BoundingBox) -> bool {
    let Some(last) = line.last() else {
        return false;
    };
    let bottom = line.iter().map(|b| b.bottom).fold(f32::NEG_INFINITY, f32::max);
    bbox.left >= last.left && bbox.center_y() <= bottom
}

/// Result of classifying one paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphClass {
    /// Assigned type
    pub kind: RegionType,
    /// Whether the paragraph continues a block from before
    pub continues: bool,
}

impl ParagraphClass {
    fn new(kind: RegionType) -> Self {
        Self {
            kind,
            continues: false,
        }
    }
}

/// Classifier configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Page titles have at most this many lines
    pub page_title_max_lines: usize,
    /// Captions have at most this many lines
    pub caption_max_lines: usize,
    /// Bibliographic references have at most this many lines
    pub bib_ref_max_lines: usize,
    /// A bib-ref indicator needs more words than this
    pub bib_ref_min_words: usize,
    /// Mean word gap (in character widths) that marks wide spacing
    pub wide_spacing_factor: f32,
    /// Largest word gap (in character widths) that marks variable spacing
    pub variable_spacing_factor: f32,
    /// Font ratio above which a paragraph is recognizer noise
    pub artifact_large_ratio: f32,
    /// Font ratio below which a paragraph is recognizer noise
    pub artifact_small_ratio: f32,
    /// Font ratio above which a paragraph is a heading
    pub heading_ratio: f32,
    /// Smallest plausible font size in points
    pub min_font_size: f32,
    /// Largest plausible font size in points
    pub max_font_size: f32,
    /// How far (inches) a first line must stick out to count as exdented
    pub exdent_inches: f32,
    /// Allowed margin difference of centered lines, as a fraction of the text width
    pub centered_tolerance: f32,
    /// Lead-in of captions
    pub caption_pattern: String,
    /// Year-like token
    pub year_pattern: String,
    /// Bridgeable sets deciding continuations
    pub stitch: StitchConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            page_title_max_lines: 3,
            caption_max_lines: 4,
            bib_ref_max_lines: 8,
            bib_ref_min_words: 10,
            wide_spacing_factor: 2.0,
            variable_spacing_factor: 6.0,
            artifact_large_ratio: 2.5,
            artifact_small_ratio: 0.5,
            heading_ratio: 1.2,
            min_font_size: 3.0,
            max_font_size: 96.0,
            exdent_inches: 0.1,
            centered_tolerance: 0.05,
            caption_pattern: r"(?i)^(fig(ure)?|table|diagram|map|plate)\b".to_string(),
            year_pattern: r"\b(1[5-9]|20)\d{2}[a-z]?\b".to_string(),
            stitch: StitchConfig::default(),
        }
    }
}

/// Assigns initial paragraph types.
#[derive(Debug, Clone)]
pub struct ParagraphClassifier {
    config: ClassifierConfig,
    caption: Regex,
    year: Regex,
}

impl ParagraphClassifier {
    /// Create a classifier with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ClassifierConfig::default())
    }

    /// Create a classifier with custom configuration.
    pub fn with_config(config: ClassifierConfig) -> Result<Self> {
        Ok(Self {
            caption: Regex::new(&config.caption_pattern)?,
            year: Regex::new(&config.year_pattern)?,
            config,
        })
    }

    /// Classify every region still typed `paragraph` on the page, outside
    /// tables. Returns the number of regions classified.
    pub fn classify_page(&self, page: &mut Page) -> usize {
        let context = PageContext {
            font_size: page.average_font_size(),
            dpi: page.dpi(),
            text_block: BoundingBox::union_all(page.words.iter().filter_map(|w| w.bounding_box.as_ref())),
        };

        let mut updates = Vec::new();
        self.collect(page, &page.regions, &context, &mut Vec::new(), &mut updates);

        let count = updates.len();
        for (path, class) in updates {
            if let Some(region) = region_at_mut(&mut page.regions, &path) {
                region.kind = class.kind;
                region.continues |= class.continues;
            }
        }
        log::debug!("Page {}: classified {} paragraphs", page.id, count);
        count
    }

    fn collect(
        &self,
        page: &Page,
        regions: &[Region],
        context: &PageContext,
        prefix: &mut RegionPath,
        updates: &mut Vec<(RegionPath, ParagraphClass)>,
    ) {
        let mut previous: Option<RegionType> = None;
        for (i, region) in regions.iter().enumerate() {
            prefix.push(i);
            let kind = if region.kind == RegionType::Paragraph {
                let view = ParagraphView::from_region(page, region, context.text_block);
                let class = self.classify(&view, context.font_size, previous.as_ref(), context.dpi);
                let kind = class.kind.clone();
                updates.push((prefix.clone(), class));
                kind
            } else {
                region.kind.clone()
            };
            if region.kind != RegionType::Table && !region.children.is_empty() {
                self.collect(page, &region.children, context, prefix, updates);
            }
            previous = Some(kind);
            prefix.pop();
        }
    }

    /// Classify one paragraph.
    ///
    /// `page_font_size` is the page's average font size in points and
    /// `previous` the type of the paragraph before this one (`None` at the
    /// top of the page).
    pub fn classify(
        &self,
        view: &ParagraphView<'_>,
        page_font_size: Option<f32>,
        previous: Option<&RegionType>,
        dpi: u32,
    ) -> ParagraphClass {
        let config = &self.config;
        let lines = view.lines();
        let line_count = lines.len().max(1);
        let text = view.text();
        let starts_lower = view.words.first().map(Word::starts_lowercase).unwrap_or(false);

        if let Some(kind) = self.indicator_type(view, &text) {
            let continues = matches!(kind, RegionType::Footnote | RegionType::BibRef)
                && starts_lower
                && self.follows_bridgeable(&kind, previous);
            return ParagraphClass { kind, continues };
        }

        if line_count <= config.page_title_max_lines && self.has_wide_spacing(view, &lines) {
            return ParagraphClass::new(RegionType::PageTitle);
        }

        if line_count <= config.caption_max_lines && self.caption.is_match(&text) {
            return ParagraphClass::new(RegionType::Caption);
        }

        if line_count <= config.bib_ref_max_lines && self.is_exdented(&lines, dpi) && self.year.is_match(&text) {
            return ParagraphClass::new(RegionType::BibRef);
        }

        if let Some(ratio) = self.font_ratio(view, page_font_size, dpi) {
            if ratio > config.artifact_large_ratio || ratio < config.artifact_small_ratio {
                return ParagraphClass::new(RegionType::OcrArtifact);
            }
            if ratio > config.heading_ratio {
                return ParagraphClass::new(RegionType::Heading);
            }
        }

        if self.is_centered(view, &lines) {
            return ParagraphClass::new(RegionType::Heading);
        }

        ParagraphClass {
            kind: RegionType::MainText,
            continues: starts_lower && self.follows_bridgeable(&RegionType::MainText, previous),
        }
    }

    /// First indicator span of a known type; a bib-ref indicator only counts
    /// on long paragraphs with a year in them.
    fn indicator_type(&self, view: &ParagraphView<'_>, text: &str) -> Option<RegionType> {
        view.indicators.iter().find_map(|kind| match kind {
            RegionType::Footnote
            | RegionType::Caption
            | RegionType::PageTitle
            | RegionType::PageNumber
            | RegionType::Table => Some(kind.clone()),
            RegionType::BibRef
                if view.words.len() > self.config.bib_ref_min_words && self.year.is_match(text) =>
            {
                Some(RegionType::BibRef)
            }
            _ => None,
        })
    }

    fn follows_bridgeable(&self, kind: &RegionType, previous: Option<&RegionType>) -> bool {
        match previous {
            None => true,
            Some(prev) => self
                .config
                .stitch
                .rule_for(kind)
                .map_or(false, |rule| rule.is_bridgeable(prev)),
        }
    }

    fn has_wide_spacing(&self, view: &ParagraphView<'_>, lines: &[Vec<BoundingBox>]) -> bool {
        let Some(char_width) = view.char_width() else {
            return false;
        };
        let gaps: Vec<f32> = lines
            .iter()
            .flat_map(|line| line.windows(2).map(|pair| (pair[1].left - pair[0].right).max(0.0)))
            .collect();
        if gaps.is_empty() {
            return false;
        }
        let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
        let max = gaps.iter().copied().fold(0.0f32, f32::max);
        mean > self.config.wide_spacing_factor * char_width
            || max > self.config.variable_spacing_factor * char_width
    }

    fn is_exdented(&self, lines: &[Vec<BoundingBox>], dpi: u32) -> bool {
        let lefts: Vec<f32> = lines
            .iter()
            .filter_map(|line| line.first().map(|b| b.left))
            .collect();
        let Some((first, rest)) = lefts.split_first() else {
            return false;
        };
        if rest.is_empty() {
            return false;
        }
        let body = rest.iter().copied().fold(f32::INFINITY, f32::min);
        body - first > self.config.exdent_inches * dpi as f32
    }

    /// Paragraph font size over the page average, if both are plausible.
    fn font_ratio(&self, view: &ParagraphView<'_>, page_font_size: Option<f32>, dpi: u32) -> Option<f32> {
        let sane = |size: &f32| (self.config.min_font_size..=self.config.max_font_size).contains(size);
        let page = page_font_size.filter(sane)?;
        let sizes: Vec<f32> = view
            .words
            .iter()
            .filter_map(|w| w.effective_font_size(dpi))
            .filter(sane)
            .collect();
        if sizes.is_empty() {
            return None;
        }
        let size = sizes.iter().sum::<f32>() / sizes.len() as f32;
        Some(size / page)
    }

    fn is_centered(&self, view: &ParagraphView<'_>, lines: &[Vec<BoundingBox>]) -> bool {
        if let Some(orientation) = view.orientation {
            return orientation == Orientation::Centered;
        }
        let Some(block) = view.text_block else {
            return false;
        };
        if lines.is_empty() || block.width() <= 0.0 {
            return false;
        }

        let tolerance = self.config.centered_tolerance * block.width();
        let mut widest = 0.0f32;
        for line in lines {
            let Some(extent) = BoundingBox::union_all(line) else {
                continue;
            };
            let left_margin = extent.left - block.left;
            let right_margin = block.right - extent.right;
            if (left_margin - right_margin).abs() > tolerance {
                return false;
            }
            widest = widest.max(extent.width());
        }
        widest < 0.9 * block.width()
    }
}

struct PageContext {
    font_size: Option<f32>,
    dpi: u32,
    text_block: Option<BoundingBox>,
}
