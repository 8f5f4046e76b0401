//! Digit confusion table: which glyphs OCR tends to produce for each digit.
//!
//! The file format is one record per line, `<digit> <confusable chars>`:
//!
//! ```text
//! // letters OCR confuses with digits
//! 0 oOD
//! 1 lI|i
//! 5 sS
//! ```
//!
//! Blank lines and lines starting with `//` are ignored. Every digit maps to
//! itself whether or not it is listed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Mapping from recognized characters to the digits they may stand for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitConfusion {
    readings: BTreeMap<char, BTreeSet<char>>,
}

impl Default for DigitConfusion {
    /// Table with only the identity readings of `0`-`9`.
    fn default() -> Self {
        let readings = ('0'..='9').map(|d| (d, BTreeSet::from([d]))).collect();
        Self { readings }
    }
}

impl DigitConfusion {
    /// Parse a confusion table from its text form.
    pub fn parse(text: &str) -> Result<Self> {
        let mut table = Self::default();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            let mut chars = line.chars();
            let digit = chars.next().filter(char::is_ascii_digit).ok_or_else(|| Error::InvalidConfig {
                line: number + 1,
                message: format!("expected a digit, found {:?}", line),
            })?;
            let rest = chars.as_str();
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return Err(Error::InvalidConfig {
                    line: number + 1,
                    message: format!("expected whitespace after digit {}", digit),
                });
            }

            for c in rest.chars().filter(|c| !c.is_whitespace()) {
                table.readings.entry(c).or_default().insert(digit);
            }
        }
        Ok(table)
    }

    /// Load a confusion table from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Digits `c` may stand for, `None` if it never stands for one.
    pub fn readings(&self, c: char) -> Option<&BTreeSet<char>> {
        self.readings.get(&c)
    }

    /// Every character with at least one reading.
    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        self.readings.keys().copied()
    }

    /// Regex matching text made up entirely of confusable characters,
    /// optionally split by single spaces (OCR often splits a number in two).
    pub fn fuzzy_pattern(&self) -> String {
        let class: String = self.characters().map(escape_class_char).collect();
        format!("^[{0}]+(?:\\s[{0}]+)*$", class)
    }
}

/// Escape a character for use inside a regex character class.
fn escape_class_char(c: char) -> String {
    match c {
        '\\' | ']' | '[' | '^' | '-' | '&' | '~' => format!("\\{}", c),
        _ => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let table = DigitConfusion::parse("// comment\n\n1 lI\n0 oO\n5 s\n").unwrap();
        assert_eq!(table.readings('l'), Some(&BTreeSet::from(['1'])));
        assert_eq!(table.readings('7'), Some(&BTreeSet::from(['7'])));
        assert_eq!(table.readings('x'), None);
    }

    #[test]
    fn test_shared_confusable() {
        let table = DigitConfusion::parse("1 l\n7 l").unwrap();
        assert_eq!(table.readings('l'), Some(&BTreeSet::from(['1', '7'])));
    }

    #[test]
    fn test_parse_rejects_bad_line() {
        let err = DigitConfusion::parse("1 l\nx abc").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { line: 2, .. }));

        let err = DigitConfusion::parse("12 l").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { line: 1, .. }));
    }

    #[test]
    fn test_fuzzy_pattern_matches_split_numbers() {
        let table = DigitConfusion::parse("1 l]").unwrap();
        let re = regex::Regex::new(&table.fuzzy_pattern()).unwrap();
        assert!(re.is_match("l2 3"));
        assert!(re.is_match("]"));
        assert!(!re.is_match("p. l2 3"));
        assert!(!re.is_match("list"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DigitConfusion::load(dir.path().join("none.txt")),
            Err(Error::Io(_))
        ));
    }
}
