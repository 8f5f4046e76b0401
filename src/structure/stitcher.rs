//! Region continuity stitching.
//!
//! A block split across a page boundary arrives as two regions, the later
//! one flagged `continue`. The stitcher walks back from every flagged region
//! over material that may sit between the halves (running titles, captions,
//! page numbers) and moves the later half's words onto the end of the
//! earlier one. Nested levels are handled from a worklist once the top level
//! is done.

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;

use super::{region_at, region_at_mut, RegionPath};
use crate::model::{Page, Region, RegionType};

/// Which regions a continuation of `target` may join and skip over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRule {
    /// Type of the flagged continuation
    pub target: RegionType,
    /// Types that can receive the continuation
    pub appendable: BTreeSet<RegionType>,
    /// Types that may sit between the two halves
    pub bridgeable: BTreeSet<RegionType>,
}

impl RestoreRule {
    /// Rule whose continuation only joins its own type and bridges nothing.
    pub fn new(target: RegionType) -> Self {
        Self {
            appendable: BTreeSet::from([target.clone()]),
            target,
            bridgeable: BTreeSet::new(),
        }
    }

    /// Add bridgeable types and return self.
    pub fn bridging(mut self, kinds: impl IntoIterator<Item = RegionType>) -> Self {
        self.bridgeable.extend(kinds);
        self
    }

    /// Add appendable types and return self.
    pub fn appending(mut self, kinds: impl IntoIterator<Item = RegionType>) -> Self {
        self.appendable.extend(kinds);
        self
    }

    /// Check if `kind` may sit between the two halves.
    pub fn is_bridgeable(&self, kind: &RegionType) -> bool {
        self.bridgeable.contains(kind)
    }

    /// Index of the region a continuation at the end of `earlier` joins.
    ///
    /// Walks backward over bridgeable types; `None` if the walk hits any
    /// other type or runs out of regions.
    pub fn predecessor<'a, I>(&self, earlier: I) -> Option<usize>
    where
        I: IntoIterator<Item = &'a RegionType>,
        I::IntoIter: DoubleEndedIterator + ExactSizeIterator,
    {
        for (index, kind) in earlier.into_iter().enumerate().rev() {
            if self.appendable.contains(kind) {
                return Some(index);
            }
            if !self.bridgeable.contains(kind) {
                return None;
            }
        }
        None
    }
}

/// Stitcher configuration.
#[derive(Debug, Clone)]
pub struct StitchConfig {
    /// Rules, applied in order
    pub rules: Vec<RestoreRule>,
}

impl Default for StitchConfig {
    fn default() -> Self {
        use RegionType::*;

        Self {
            rules: vec![
                RestoreRule::new(MainText).bridging([Caption, Table, PageTitle, PageNumber, OcrArtifact, Footnote]),
                RestoreRule::new(Footnote).bridging([
                    Caption,
                    Table,
                    PageTitle,
                    PageNumber,
                    OcrArtifact,
                    MainText,
                    Heading,
                ]),
                RestoreRule::new(BibRef).bridging([Caption, Table, PageTitle, PageNumber, OcrArtifact, Footnote]),
            ],
        }
    }
}

impl StitchConfig {
    /// Rule for continuations of `kind`.
    pub fn rule_for(&self, kind: &RegionType) -> Option<&RestoreRule> {
        self.rules.iter().find(|r| &r.target == kind)
    }
}

/// A continuation that could not be joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orphan {
    /// Page the region is on
    pub page_id: i64,
    /// Region type
    #[serde(rename = "type")]
    pub kind: RegionType,
    /// First word index
    pub start: usize,
}

/// Summary of a stitching pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StitchReport {
    /// Number of merges performed
    pub merges: usize,
    /// Continuations left flagged
    pub orphans: Vec<Orphan>,
}

/// Joins regions split across page boundaries.
#[derive(Debug, Clone)]
pub struct RegionStitcher {
    config: StitchConfig,
}

impl Default for RegionStitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionStitcher {
    /// Create a new stitcher with default rules.
    pub fn new() -> Self {
        Self {
            config: StitchConfig::default(),
        }
    }

    /// Create a new stitcher with custom rules.
    pub fn with_config(config: StitchConfig) -> Self {
        Self { config }
    }

    /// Stitch all pages below `cutoff`.
    pub fn stitch(&self, pages: &mut [Page], cutoff: usize) -> StitchReport {
        let limit = cutoff.min(pages.len());
        let pages = &mut pages[..limit];
        let mut report = StitchReport::default();

        for rule in &self.config.rules {
            self.stitch_top_level(pages, rule, &mut report);
        }

        let mut queue: VecDeque<(usize, RegionPath)> = VecDeque::new();
        for (p, page) in pages.iter().enumerate() {
            for (i, region) in page.regions.iter().enumerate() {
                if !region.children.is_empty() {
                    queue.push_back((p, vec![i]));
                }
            }
        }
        while let Some((p, path)) = queue.pop_front() {
            for rule in &self.config.rules {
                self.stitch_children(&mut pages[p], &path, rule, &mut report);
            }
            if let Some(region) = region_at(&pages[p].regions, &path) {
                for (i, child) in region.children.iter().enumerate() {
                    if !child.children.is_empty() {
                        let mut child_path = path.clone();
                        child_path.push(i);
                        queue.push_back((p, child_path));
                    }
                }
            }
        }

        log::info!(
            "Stitched {} continuations over {} pages ({} orphaned)",
            report.merges,
            limit,
            report.orphans.len()
        );
        report
    }

    fn stitch_top_level(&self, pages: &mut [Page], rule: &RestoreRule, report: &mut StitchReport) {
        let mut flat = flatten(pages);
        let mut i = flat.len();
        while i > 0 {
            i -= 1;
            let (pc, rc) = flat[i];
            let later = &pages[pc].regions[rc];
            if !later.continues || later.kind != rule.target {
                continue;
            }

            let view: &[Page] = pages;
            let found = rule.predecessor(flat[..i].iter().map(move |&(p, r)| &view[p].regions[r].kind));
            let merged = match found {
                Some(j) => merge_top_level(pages, flat[j], flat[i]),
                None => false,
            };
            if merged {
                report.merges += 1;
                flat = flatten(pages);
                // Revisit the merged region next; it may continue further up.
                i = found.map_or(i, |j| j + 1);
            } else {
                let later = &pages[pc].regions[rc];
                log::warn!(
                    "Orphaned {} continuation on page {} (words {}..{})",
                    later.kind,
                    pages[pc].id,
                    later.start,
                    later.end
                );
                report.orphans.push(Orphan {
                    page_id: pages[pc].id,
                    kind: later.kind.clone(),
                    start: later.start,
                });
            }
        }
    }

    fn stitch_children(&self, page: &mut Page, path: &[usize], rule: &RestoreRule, report: &mut StitchReport) {
        let Some(parent) = region_at_mut(&mut page.regions, path) else {
            return;
        };
        let mut children = std::mem::take(&mut parent.children);

        let mut i = children.len();
        while i > 0 {
            i -= 1;
            if !children[i].continues || children[i].kind != rule.target {
                continue;
            }
            let words = page.words.len();
            let found = rule
                .predecessor(children[..i].iter().map(|c| &c.kind))
                .filter(|&j| children[j].end <= children[i].start)
                .filter(|&j| within(&children[j], words) && within(&children[i], words));
            match found {
                Some(j) => {
                    let mut moved = children.remove(i);
                    let mv = page.relocate(moved.start..moved.end, children[j].end);
                    for child in children.iter_mut() {
                        child.remap(&|s, e| mv.map(s, e));
                    }
                    moved.remap(&|s, e| mv.map(s, e));
                    absorb(&mut children[j], moved, 0);
                    report.merges += 1;
                    i = j + 1;
                }
                None => {
                    log::warn!(
                        "Orphaned nested {} continuation on page {} (words {}..{})",
                        children[i].kind,
                        page.id,
                        children[i].start,
                        children[i].end
                    );
                    report.orphans.push(Orphan {
                        page_id: page.id,
                        kind: children[i].kind.clone(),
                        start: children[i].start,
                    });
                }
            }
        }

        if let Some(parent) = region_at_mut(&mut page.regions, path) {
            parent.children = children;
        }
    }
}

/// Top-level regions of all pages as `(page, region)` positions in order.
fn flatten(pages: &[Page]) -> Vec<(usize, usize)> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(p, page)| (0..page.regions.len()).map(move |r| (p, r)))
        .collect()
}

/// Move the later region onto the end of the target. Returns `false`,
/// changing nothing, if the two overlap on one page.
fn merge_top_level(pages: &mut [Page], target: (usize, usize), later: (usize, usize)) -> bool {
    let (pa, ra) = target;
    let (pc, rc) = later;
    if !within(&pages[pa].regions[ra], pages[pa].words.len())
        || !within(&pages[pc].regions[rc], pages[pc].words.len())
    {
        log::warn!(
            "Region offsets outside the words of page {} or {}; not merging",
            pages[pa].id,
            pages[pc].id
        );
        return false;
    }
    if pa == pc && pages[pa].regions[ra].end > pages[pc].regions[rc].start {
        return false;
    }

    let mut moved = pages[pc].regions.remove(rc);
    if pa == pc {
        let page = &mut pages[pa];
        let to = page.regions[ra].end;
        let mv = page.relocate(moved.start..moved.end, to);
        moved.remap(&|s, e| mv.map(s, e));
    } else {
        let buffer = pages[pc].extract_range(moved.start..moved.end);
        let at = pages[pa].regions[ra].end;
        pages[pa].insert_buffer(at, buffer);
        moved.offset(at as isize - moved.start as isize);
    }

    log::debug!(
        "Merged {} from page {} into page {} ({} words)",
        moved.kind,
        pages[pc].id,
        pages[pa].id,
        moved.len()
    );
    absorb(&mut pages[pa].regions[ra], moved, pc - pa);
    true
}

/// Check that the region covers an existing, non-inverted word range.
fn within(region: &Region, words: usize) -> bool {
    region.start <= region.end && region.end <= words
}

/// Fold an already relocated region into the target.
fn absorb(target: &mut Region, later: Region, page_offset: usize) {
    target.start = target.start.min(later.start);
    target.end = target.end.max(later.end);
    target.bounding_boxes.append_at(page_offset, &later.bounding_boxes);
    target.children.extend(later.children);
    for (key, value) in later.attributes {
        target.attributes.entry(key).or_insert(value);
    }
}
