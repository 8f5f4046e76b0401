//! Cross-page scoring and sequence repair of page-number hypotheses.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::candidate::{Candidate, CandidateExtractor};
use super::{DigitConfusion, PageNumberConfig};
use crate::error::Result;
use crate::model::{Annotation, Page, RegionType, PAGE_NUMBER_ATTRIBUTE};

/// Fuzziness/ambiguity marker for hypotheses made up by sequence repair.
pub const UNKNOWN: u32 = u32::MAX;

/// Lookup key: a numeric page-number value, regardless of which page
/// proposed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageValue(pub i64);

/// A proposed page number for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hypothesis {
    /// Id of the page the value is proposed for
    pub page_id: i64,
    /// Proposed number, `-1` if undetermined
    pub value: i64,
    /// Ambiguous positions of the source candidate
    pub fuzziness: u32,
    /// Readings of the source candidate
    pub ambiguity: u32,
    /// Support from neighbouring pages
    pub score: u32,
}

impl Hypothesis {
    /// A hypothesis read from a candidate.
    pub fn new(page_id: i64, value: i64, fuzziness: u32, ambiguity: u32) -> Self {
        Self {
            page_id,
            value,
            fuzziness,
            ambiguity,
            score: 0,
        }
    }

    /// The undetermined placeholder for a page.
    pub fn unknown(page_id: i64) -> Self {
        Self {
            page_id,
            value: -1,
            fuzziness: UNKNOWN,
            ambiguity: UNKNOWN,
            score: 0,
        }
    }

    /// A value implied by the neighbours rather than read from the page.
    pub fn extrapolated(page_id: i64, value: i64, score: u32) -> Self {
        Self {
            score,
            ..Self::new(page_id, value, UNKNOWN, UNKNOWN)
        }
    }

    /// Lookup key of the value.
    pub fn key(&self) -> PageValue {
        PageValue(self.value)
    }

    /// Check if a value was determined.
    pub fn is_known(&self) -> bool {
        self.value >= 0
    }

    /// Both values lie on one progression of slope 1 over page ids.
    pub fn is_consistent_with(&self, other: &Hypothesis) -> bool {
        self.value - other.value == self.page_id - other.page_id
    }

    /// The value this hypothesis implies for the page with id `page_id`.
    pub fn expected_on(&self, page_id: i64) -> i64 {
        self.value + (page_id - self.page_id)
    }

    /// Score normalised by how uncertain the reading was; 0 for made-up values.
    pub fn adjusted_score(&self) -> f64 {
        if self.fuzziness == UNKNOWN || self.ambiguity == UNKNOWN {
            return 0.0;
        }
        let uncertainty = self.fuzziness as f64 + self.ambiguity as f64;
        if uncertainty == 0.0 {
            return 0.0;
        }
        self.score as f64 / uncertainty
    }
}

/// Resolves printed page numbers over a run of pages.
#[derive(Debug, Clone)]
pub struct PageNumberResolver {
    config: PageNumberConfig,
    extractor: CandidateExtractor,
}

impl PageNumberResolver {
    /// Create a resolver; without a confusion table OCR'd pages are matched
    /// exactly.
    pub fn new(config: PageNumberConfig, confusion: Option<DigitConfusion>) -> Result<Self> {
        let extractor = CandidateExtractor::new(&config, confusion)?;
        Ok(Self { config, extractor })
    }

    /// Candidate extractor in use.
    pub fn extractor(&self) -> &CandidateExtractor {
        &self.extractor
    }

    /// Resolve and write back page numbers for all pages.
    ///
    /// Every page gets the `pageNumber` attribute (`-1` if undetermined);
    /// the words carrying a resolved number are marked with a `pageNumber`
    /// annotation holding `value` and `score`.
    pub fn resolve(&self, pages: &mut [Page]) -> Vec<Hypothesis> {
        let candidates: Vec<Vec<Candidate>> = pages.iter().map(|p| self.extractor.extract(p)).collect();
        let ids: Vec<i64> = pages.iter().map(|p| p.id).collect();
        let sets = ids
            .iter()
            .zip(&candidates)
            .map(|(id, cands)| hypotheses_for(*id, cands))
            .collect();

        let chosen = self.resolve_hypotheses(&ids, sets);
        for ((page, hypothesis), cands) in pages.iter_mut().zip(&chosen).zip(&candidates) {
            promote(page, hypothesis, cands);
        }

        let resolved = chosen.iter().filter(|h| h.is_known()).count();
        log::info!("Resolved page numbers for {}/{} pages", resolved, chosen.len());
        chosen
    }

    /// Pick one hypothesis per page: score, select, repair, disambiguate.
    pub fn resolve_hypotheses(&self, ids: &[i64], mut sets: Vec<Vec<Hypothesis>>) -> Vec<Hypothesis> {
        sets.resize_with(ids.len(), Vec::new);
        for set in &mut sets {
            set.sort_by(|a, b| a.value.cmp(&b.value).then(a.fuzziness.cmp(&b.fuzziness)));
        }
        score_hypotheses(ids, &mut sets, self.config.max_misses);

        let mut chosen = select_best(ids, &sets);
        repair_sequence(ids, &mut chosen);
        disambiguate(ids, &mut chosen);
        chosen
    }
}

/// One hypothesis per reading of every candidate.
fn hypotheses_for(page_id: i64, candidates: &[Candidate]) -> Vec<Hypothesis> {
    candidates
        .iter()
        .flat_map(|c| {
            c.values
                .iter()
                .map(move |v| Hypothesis::new(page_id, *v, c.fuzziness, c.ambiguity))
        })
        .collect()
}

/// Score every hypothesis by scanning forward and backward for pages
/// holding the value its progression predicts. A hit `l` pages away adds
/// `l`; a scan stops after `max_misses` consecutive misses.
fn score_hypotheses(ids: &[i64], sets: &mut [Vec<Hypothesis>], max_misses: usize) {
    let offered: Vec<BTreeSet<PageValue>> = sets
        .iter()
        .map(|set| set.iter().map(Hypothesis::key).collect())
        .collect();

    for (p, set) in sets.iter_mut().enumerate() {
        for hypothesis in set.iter_mut() {
            let mut score = 0u32;

            let mut misses = 0;
            for q in p + 1..ids.len() {
                if offered[q].contains(&PageValue(hypothesis.expected_on(ids[q]))) {
                    score = score.saturating_add((q - p) as u32);
                    misses = 0;
                } else {
                    misses += 1;
                    if misses >= max_misses {
                        break;
                    }
                }
            }

            misses = 0;
            for q in (0..p).rev() {
                if offered[q].contains(&PageValue(hypothesis.expected_on(ids[q]))) {
                    score = score.saturating_add((p - q) as u32);
                    misses = 0;
                } else {
                    misses += 1;
                    if misses >= max_misses {
                        break;
                    }
                }
            }

            hypothesis.score = score;
        }
    }
}

/// Highest-scoring hypothesis per page, the first one on ties.
fn select_best(ids: &[i64], sets: &[Vec<Hypothesis>]) -> Vec<Hypothesis> {
    ids.iter()
        .zip(sets)
        .map(|(id, set)| {
            let mut best: Option<&Hypothesis> = None;
            for hypothesis in set {
                if best.map_or(true, |b| hypothesis.score > b.score) {
                    best = Some(hypothesis);
                }
            }
            best.cloned().unwrap_or_else(|| Hypothesis::unknown(*id))
        })
        .collect()
}

fn consistent(a: &Hypothesis, b: &Hypothesis) -> bool {
    a.is_known() && b.is_known() && a.is_consistent_with(b)
}

/// Overwrite pages that break an otherwise well-supported progression.
///
/// Runs base correction, then backward and forward extrapolation. Values
/// below 1 are never written.
fn repair_sequence(ids: &[i64], chosen: &mut [Hypothesis]) {
    let n = chosen.len();

    for p in 1..n.saturating_sub(1) {
        let (prev, here, next) = (&chosen[p - 1], &chosen[p], &chosen[p + 1]);
        if !consistent(prev, next) || consistent(here, next) {
            continue;
        }
        let support = prev.score.saturating_add(next.score);
        if support > here.score.saturating_mul(3) {
            let value = prev.expected_on(ids[p]);
            if value >= 1 {
                log::debug!("Page {}: base correction {} -> {}", ids[p], here.value, value);
                chosen[p] = Hypothesis::extrapolated(ids[p], value, support / 3);
            }
        }
    }

    for p in (0..n.saturating_sub(1)).rev() {
        let (here, next) = (&chosen[p], &chosen[p + 1]);
        if next.is_known() && !consistent(here, next) && next.score > here.score.saturating_mul(2) {
            let value = next.expected_on(ids[p]);
            let score = next.score / 2;
            if value >= 1 {
                log::debug!("Page {}: extrapolated backward {} -> {}", ids[p], here.value, value);
                chosen[p] = Hypothesis::extrapolated(ids[p], value, score);
            }
        }
    }

    for p in 1..n {
        let (prev, here) = (&chosen[p - 1], &chosen[p]);
        if prev.is_known() && !consistent(prev, here) && prev.score > here.score.saturating_mul(2) {
            let value = prev.expected_on(ids[p]);
            let score = prev.score / 2;
            if value >= 1 {
                log::debug!("Page {}: extrapolated forward {} -> {}", ids[p], here.value, value);
                chosen[p] = Hypothesis::extrapolated(ids[p], value, score);
            }
        }
    }
}

/// Keep each value on one page only: the claim with the higher adjusted
/// score wins, the earlier page on ties.
fn disambiguate(ids: &[i64], chosen: &mut [Hypothesis]) {
    let mut owner: BTreeMap<i64, usize> = BTreeMap::new();
    for p in 0..chosen.len() {
        if !chosen[p].is_known() {
            continue;
        }
        let value = chosen[p].value;
        let q = match owner.get(&value).copied() {
            Some(q) => q,
            None => {
                owner.insert(value, p);
                continue;
            }
        };
        let (winner, loser) = if chosen[p].adjusted_score() > chosen[q].adjusted_score() {
            (p, q)
        } else {
            (q, p)
        };
        log::debug!(
            "Value {} claimed by pages {} and {}; keeping page {}",
            value,
            ids[q],
            ids[p],
            ids[winner]
        );
        chosen[loser] = Hypothesis::unknown(ids[loser]);
        owner.insert(value, winner);
    }
}

/// Write the resolved number to the page and mark the words carrying it.
fn promote(page: &mut Page, chosen: &Hypothesis, candidates: &[Candidate]) {
    page.remove_annotations(&RegionType::PageNumber);
    if !chosen.is_known() {
        page.set_attribute(PAGE_NUMBER_ATTRIBUTE, "-1");
        return;
    }
    page.set_attribute(PAGE_NUMBER_ATTRIBUTE, chosen.value.to_string());

    let winner = candidates
        .iter()
        .filter(|c| c.reads_as(chosen.value) && !c.is_risky())
        .min_by_key(|c| c.fuzziness);
    if let Some(candidate) = winner {
        page.add_annotation(
            Annotation::new(RegionType::PageNumber, candidate.start, candidate.end)
                .with_attribute("value", chosen.value.to_string())
                .with_attribute("score", chosen.score.to_string()),
        );
    }
}
