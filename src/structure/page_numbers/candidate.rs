//! Page-number candidates: digit-like runs near the page margins and the
//! numeric readings they admit.

use std::collections::BTreeSet;
use std::ops::Range;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::{DigitConfusion, PageNumberConfig};
use crate::error::Result;
use crate::model::Page;

/// One character position of a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigitSlot {
    /// Exactly one reading
    Fixed(char),
    /// Several possible digits, ascending
    Choice(Vec<char>),
}

impl DigitSlot {
    fn from_readings(readings: &BTreeSet<char>) -> Option<Self> {
        let mut digits = readings.iter().copied();
        match readings.len() {
            0 => None,
            1 => digits.next().map(DigitSlot::Fixed),
            _ => Some(DigitSlot::Choice(digits.collect())),
        }
    }

    fn options(&self) -> &[char] {
        match self {
            DigitSlot::Fixed(c) => std::slice::from_ref(c),
            DigitSlot::Choice(cs) => cs,
        }
    }
}

/// A run of margin words that may be the printed page number.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// First word of the run
    pub start: usize,
    /// One past the last word of the run
    pub end: usize,
    /// Matched text, whitespace removed
    pub text: String,
    /// Number of positions with more than one reading
    pub fuzziness: u32,
    /// Number of readings in total (product over positions)
    pub ambiguity: u32,
    /// Distinct numeric readings, ascending
    pub values: Vec<i64>,
}

impl Candidate {
    /// Check if `value` is one of the readings.
    pub fn reads_as(&self, value: i64) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    /// A lone ambiguous glyph that is not a digit itself, most likely a
    /// stray letter rather than a page number.
    pub fn is_risky(&self) -> bool {
        self.text.chars().count() == 1
            && self.fuzziness == 1
            && !self.text.chars().all(|c| c.is_ascii_digit())
    }
}

/// Finds candidates on a page.
///
/// Patterns match whole words only. On OCR'd pages consecutive matching
/// words are read as one space-separated run, since OCR often splits a
/// number in two.
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    fuzzy: Option<(Regex, DigitConfusion)>,
    strict: Regex,
    fallback: Regex,
    margin_tokens: usize,
    max_digits: usize,
}

impl CandidateExtractor {
    /// Build the matchers. Without a confusion table OCR'd pages are matched
    /// with the plain fallback pattern.
    pub fn new(config: &PageNumberConfig, confusion: Option<DigitConfusion>) -> Result<Self> {
        let fuzzy = match confusion {
            Some(table) => Some((Regex::new(&table.fuzzy_pattern())?, table)),
            None => None,
        };
        Ok(Self {
            fuzzy,
            strict: Regex::new(&anchored(&config.strict_pattern))?,
            fallback: Regex::new(&anchored(&config.fallback_pattern))?,
            margin_tokens: config.margin_tokens,
            max_digits: config.max_digits,
        })
    }

    /// Check if OCR'd pages get fuzzy matching.
    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy.is_some()
    }

    /// Candidates within the first or last `margin_tokens` words of the page.
    pub fn extract(&self, page: &Page) -> Vec<Candidate> {
        let count = page.words.len();
        let fuzzy = self.fuzzy.as_ref().filter(|_| page.is_ocred);
        let exact = if page.is_ocred { &self.fallback } else { &self.strict };

        let mut candidates = Vec::new();
        let mut run: Vec<(usize, String)> = Vec::new();
        for (index, word) in page.words.iter().enumerate() {
            let in_margin = index < self.margin_tokens || index + self.margin_tokens >= count;
            let token = if in_margin {
                core(&word.text, fuzzy.map(|(_, table)| table))
            } else {
                None
            };

            match (token, fuzzy) {
                (Some(token), Some((pattern, table))) => {
                    if pattern.is_match(&token) {
                        run.push((index, token));
                    } else {
                        self.flush_run(&mut run, table, &mut candidates);
                    }
                }
                (None, Some((_, table))) => self.flush_run(&mut run, table, &mut candidates),
                (Some(token), None) => {
                    if exact.is_match(&token) {
                        candidates.extend(self.read_exact(index..index + 1, &token));
                    }
                }
                (None, None) => {}
            }
        }
        if let Some((_, table)) = fuzzy {
            self.flush_run(&mut run, table, &mut candidates);
        }

        log::debug!(
            "Page {}: {} page-number candidates",
            page.id,
            candidates.len()
        );
        candidates
    }

    /// Read a run of matching words as one number, or word by word if the
    /// whole run is not a plausible one.
    fn flush_run(
        &self,
        run: &mut Vec<(usize, String)>,
        table: &DigitConfusion,
        out: &mut Vec<Candidate>,
    ) {
        let (Some(first), Some(last)) = (run.first(), run.last()) else {
            return;
        };
        let words = first.0..last.0 + 1;
        let joined = run.iter().map(|(_, t)| t.as_str()).collect::<Vec<_>>().join(" ");

        match self.read_fuzzy(words, &joined, table) {
            Some(candidate) => out.push(candidate),
            None if run.len() > 1 => {
                let single = run.iter().filter_map(|(i, t)| self.read_fuzzy(*i..*i + 1, t, table));
                out.extend(single);
            }
            None => {}
        }
        run.clear();
    }

    /// Reading of an exactly matched run of digits.
    pub fn read_exact(&self, words: Range<usize>, raw: &str) -> Option<Candidate> {
        let text: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if text.is_empty() || text.len() >= self.max_digits || text.starts_with('0') {
            return None;
        }
        let value = text.parse::<i64>().ok()?;
        Some(Candidate {
            start: words.start,
            end: words.end,
            text,
            fuzziness: 0,
            ambiguity: 1,
            values: vec![value],
        })
    }

    /// Readings of a fuzzy match through the confusion table.
    ///
    /// Dropped when a character has no reading, the leading position can
    /// only be `0`, or the run is implausibly long.
    pub fn read_fuzzy(&self, words: Range<usize>, raw: &str, table: &DigitConfusion) -> Option<Candidate> {
        let text: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let count = text.chars().count();
        if count == 0 || count >= self.max_digits {
            return None;
        }

        let slots = text
            .chars()
            .map(|c| table.readings(c).and_then(DigitSlot::from_readings))
            .collect::<Option<Vec<_>>>()?;
        if slots.first() == Some(&DigitSlot::Fixed('0')) {
            return None;
        }

        let fuzziness = slots
            .iter()
            .filter(|s| matches!(s, DigitSlot::Choice(_)))
            .count() as u32;
        let ambiguity = slots
            .iter()
            .fold(1u32, |acc, s| acc.saturating_mul(s.options().len() as u32));

        let readings = if ambiguity == 1 {
            BTreeSet::from([slots.iter().map(|s| s.options()[0]).collect::<String>()])
        } else {
            enumerate(&slots)
        };
        let mut values: Vec<i64> = readings
            .iter()
            .filter(|r| !r.starts_with('0'))
            .filter_map(|r| r.parse().ok())
            .collect();
        values.sort_unstable();
        if values.is_empty() {
            return None;
        }

        Some(Candidate {
            start: words.start,
            end: words.end,
            text,
            fuzziness,
            ambiguity,
            values,
        })
    }
}

/// Wrap a configured pattern so it must match a whole word.
fn anchored(pattern: &str) -> String {
    format!("^(?:{})$", pattern)
}

/// Normalized word text with decoration such as `-12-` or `(12)` trimmed;
/// punctuation the confusion table reads as a digit is kept.
fn core(text: &str, table: Option<&DigitConfusion>) -> Option<String> {
    let text: String = text.nfkc().collect();
    let decoration = |c: char| {
        (c.is_ascii_punctuation() || matches!(c, '\u{2013}' | '\u{2014}'))
            && table.map_or(true, |t| t.readings(c).is_none())
    };
    let trimmed = text.trim_matches(decoration).trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Every digit string the slots admit, in lexicographic order.
fn enumerate(slots: &[DigitSlot]) -> BTreeSet<String> {
    let mut prefixes = BTreeSet::from([String::new()]);
    for slot in slots {
        prefixes = prefixes
            .iter()
            .flat_map(|prefix| {
                slot.options().iter().map(move |d| {
                    let mut s = prefix.clone();
                    s.push(*d);
                    s
                })
            })
            .collect();
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Word;

    fn extractor(table: Option<&str>) -> CandidateExtractor {
        let confusion = table.map(|t| DigitConfusion::parse(t).unwrap());
        CandidateExtractor::new(&PageNumberConfig::default(), confusion).unwrap()
    }

    fn table() -> DigitConfusion {
        DigitConfusion::parse("1 lI\n7 l\n0 oO\n5 S").unwrap()
    }

    #[test]
    fn test_read_fuzzy_counts() {
        let ex = extractor(None);
        let c = ex.read_fuzzy(0..1, "l2", &table()).unwrap();
        assert_eq!(c.fuzziness, 1);
        assert_eq!(c.ambiguity, 2);
        assert_eq!(c.values, vec![12, 72]);

        let c = ex.read_fuzzy(0..1, "I5", &table()).unwrap();
        assert_eq!((c.fuzziness, c.ambiguity), (0, 1));
        assert_eq!(c.values, vec![15]);
    }

    #[test]
    fn test_read_fuzzy_rejections() {
        let ex = extractor(None);
        // untranslatable character
        assert!(ex.read_fuzzy(0..1, "1x", &table()).is_none());
        // leading zero with a single reading
        assert!(ex.read_fuzzy(0..1, "o5", &table()).is_none());
        // six positions
        assert!(ex.read_fuzzy(0..1, "123456", &table()).is_none());
        assert!(ex.read_fuzzy(0..1, "12345", &table()).is_some());
    }

    #[test]
    fn test_enumeration_drops_leading_zero_readings() {
        let confusion = DigitConfusion::parse("0 D\n8 D").unwrap();
        let c = extractor(None).read_fuzzy(0..1, "D4", &confusion).unwrap();
        assert_eq!(c.values, vec![84]);
        assert_eq!(c.ambiguity, 2);
    }

    #[test]
    fn test_extract_only_margins() {
        let mut page = Page::new(1);
        page.add_word(Word::new("12"));
        for _ in 0..60 {
            page.add_word(Word::new("word"));
        }
        page.add_word(Word::new("37"));
        page.words[30].text = "99".to_string();

        let candidates = extractor(None).extract(&page);
        let values: Vec<i64> = candidates.iter().flat_map(|c| c.values.clone()).collect();
        assert_eq!(values, vec![12, 37]);
    }

    #[test]
    fn test_strict_pattern_matches_whole_words() {
        let mut page = Page::new(1);
        for text in ["7", "p.42", "042", "-42-", "1984a", "(43)"] {
            page.add_word(Word::new(text));
        }
        let candidates = extractor(Some("1 l")).extract(&page);
        let found: Vec<(usize, Vec<i64>)> = candidates
            .iter()
            .map(|c| (c.start, c.values.clone()))
            .collect();
        assert_eq!(found, vec![(3, vec![42]), (5, vec![43])]);
    }

    #[test]
    fn test_fuzzy_on_ocred_and_full_width() {
        let mut page = Page::ocred(1);
        page.add_word(Word::new("l3"));
        page.add_word(Word::new("page"));
        page.add_word(Word::new("\u{FF11}\u{FF14}"));
        let candidates = extractor(Some("1 l")).extract(&page);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].values, vec![13]);
        assert_eq!(candidates[1].values, vec![14]);
        assert_eq!((candidates[1].start, candidates[1].end), (2, 3));
        assert!(candidates.iter().all(|c| c.fuzziness == 0));
    }

    #[test]
    fn test_split_number_is_joined_across_words() {
        let mut page = Page::ocred(1);
        for text in ["text", "l", "2"] {
            page.add_word(Word::new(text));
        }
        let candidates = extractor(Some("1 l")).extract(&page);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].values, vec![12]);
        assert_eq!((candidates[0].start, candidates[0].end), (1, 3));
        assert_eq!(candidates[0].text, "l2");
    }

    #[test]
    fn test_letters_inside_words_are_not_candidates() {
        let mut page = Page::ocred(1);
        for text in ["This", "Island", "list"] {
            page.add_word(Word::new(text));
        }
        let candidates = extractor(Some("1 lI\n5 sS\n7 T")).extract(&page);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_overlong_run_falls_back_to_single_words() {
        let mut page = Page::ocred(1);
        for text in ["1", "2", "3", "4", "5", "6"] {
            page.add_word(Word::new(text));
        }
        let candidates = extractor(Some("1 l")).extract(&page);
        let values: Vec<i64> = candidates.iter().flat_map(|c| c.values.clone()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_fallback_without_table() {
        let mut page = Page::ocred(1);
        page.add_word(Word::new("l3"));
        page.add_word(Word::new("7"));
        let candidates = extractor(None).extract(&page);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].values, vec![7]);
        assert_eq!(candidates[0].start, 1);
    }

    #[test]
    fn test_risky_candidate() {
        let ex = extractor(None);
        let c = ex.read_fuzzy(0..1, "l", &table()).unwrap();
        assert!(c.is_risky());
        let c = ex.read_fuzzy(0..1, "5", &table()).unwrap();
        assert!(!c.is_risky());
    }
}
