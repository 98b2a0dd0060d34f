use serde::Serialize;

use crate::stream::{AnalyzedUnit, ParsedStream};

/// Inclusive character range in the analyzed text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CharSpan {
    pub start: usize,
    pub end: usize,
}

/// Cumulative character lengths of (blank + wordform), so spans cost O(1) per subsegment.
pub struct SpanIndex {
    prefix: Vec<usize>,
    blanks: Vec<usize>,
}

impl SpanIndex {
    pub fn new(units: &[AnalyzedUnit]) -> Self {
        let mut prefix = Vec::with_capacity(units.len() + 1);
        let mut total = 0usize;
        prefix.push(total);
        for u in units {
            total += u.surface_len();
            prefix.push(total);
        }
        Self {
            prefix,
            blanks: units.iter().map(AnalyzedUnit::blank_len).collect(),
        }
    }

    /// Span of units `start..=last`. The start skips the first unit's blank; the end is the
    /// cumulative length through `last`, minus one.
    pub fn span(&self, start: usize, last: usize) -> CharSpan {
        CharSpan {
            start: self.prefix[start] + self.blanks[start],
            end: self.prefix[last + 1].saturating_sub(1),
        }
    }
}

/// Whether the analyzer's units rebuild the text they were produced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OffsetCheck {
    pub reconstructs: bool,
    /// First character index where the rebuilt text and the original disagree.
    pub mismatch_at: Option<usize>,
}

impl OffsetCheck {
    /// The rebuilt surface must be a prefix of `text`, and whatever follows it whitespace.
    pub fn verify(text: &str, parsed: &ParsedStream) -> Self {
        let rebuilt = parsed.surface();
        let mut original = text.chars();
        for (i, ch) in rebuilt.chars().enumerate() {
            if original.next() != Some(ch) {
                return Self {
                    reconstructs: false,
                    mismatch_at: Some(i),
                };
            }
        }
        let consumed = rebuilt.chars().count();
        match original.position(|c| !c.is_whitespace()) {
            None => Self {
                reconstructs: true,
                mismatch_at: None,
            },
            Some(offset) => Self {
                reconstructs: false,
                mismatch_at: Some(consumed + offset),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::parse_stream;

    #[test]
    fn spans_skip_leading_blank_of_first_unit() {
        let parsed = parse_stream("^the/the<det>$ ^cat/cat<n>$  ^sat/sit<vblex>$").unwrap();
        let idx = SpanIndex::new(&parsed.units);
        assert_eq!(idx.span(0, 0), CharSpan { start: 0, end: 2 });
        assert_eq!(idx.span(1, 1), CharSpan { start: 4, end: 6 });
        assert_eq!(idx.span(2, 2), CharSpan { start: 9, end: 11 });
        assert_eq!(idx.span(1, 2), CharSpan { start: 4, end: 11 });
    }

    #[test]
    fn spans_count_chars_not_bytes() {
        let parsed = parse_stream("^él/él<prn>$ ^comió/comer<vblex>$").unwrap();
        let idx = SpanIndex::new(&parsed.units);
        assert_eq!(idx.span(1, 1), CharSpan { start: 3, end: 7 });
    }

    #[test]
    fn verify_accepts_trailing_whitespace() {
        let parsed = parse_stream("^the/the<det>$ ^cat/cat<n>$").unwrap();
        let check = OffsetCheck::verify("the cat \n", &parsed);
        assert!(check.reconstructs);
        assert_eq!(check.mismatch_at, None);
    }

    #[test]
    fn verify_reports_first_mismatch() {
        let parsed = parse_stream("^the/the<det>$ ^cat/cat<n>$").unwrap();
        let check = OffsetCheck::verify("the  cat", &parsed);
        assert!(!check.reconstructs);
        assert_eq!(check.mismatch_at, Some(4));

        let check = OffsetCheck::verify("the cat sat", &parsed);
        assert!(!check.reconstructs);
        assert_eq!(check.mismatch_at, Some(8));
    }
}
