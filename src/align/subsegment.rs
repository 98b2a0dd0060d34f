use std::collections::HashMap;

use crate::stream::AnalyzedUnit;

/// Contiguous run `start..=last` of an analyzed sequence.
#[derive(Clone, Copy, Debug)]
pub struct Subsegment<'a> {
    pub units: &'a [AnalyzedUnit],
    pub start: usize,
    pub last: usize,
}

impl<'a> Subsegment<'a> {
    /// Surface text of the run. The first unit's blank is left out; inner blanks are kept.
    #[must_use]
    pub fn literal_text(&self) -> String {
        let mut out = String::new();
        for (i, u) in self.units.iter().enumerate() {
            if i != 0 {
                out.push_str(&u.blank);
            }
            out.push_str(&u.unit.wordform);
        }
        out
    }

    #[must_use]
    pub fn reading_keys(&self) -> Vec<String> {
        reading_keys(self.units)
    }
}

#[must_use]
pub fn reading_keys(units: &[AnalyzedUnit]) -> Vec<String> {
    units.iter().map(|u| u.unit.reading_key()).collect()
}

/// All runs of length `1..=max_len`, shortest first, then by start index.
#[must_use]
pub fn enumerate_subsegments(units: &[AnalyzedUnit], max_len: usize) -> Vec<Subsegment<'_>> {
    let mut out = Vec::new();
    for length in 1..=max_len.min(units.len()) {
        for start in 0..=(units.len() - length) {
            let last = start + length - 1;
            out.push(Subsegment {
                units: &units[start..=last],
                start,
                last,
            });
        }
    }
    out
}

/// Target-side candidates keyed by their reading strings. Each key maps to the first candidate
/// in enumeration order, which is the one a linear scan would pick.
pub struct CandidateIndex {
    first: HashMap<Vec<String>, (usize, usize)>,
    count: usize,
}

impl CandidateIndex {
    pub fn build(units: &[AnalyzedUnit], max_len: usize) -> Self {
        let segments = enumerate_subsegments(units, max_len);
        let count = segments.len();
        let mut first = HashMap::with_capacity(count);
        for seg in segments {
            first
                .entry(seg.reading_keys())
                .or_insert((seg.start, seg.last));
        }
        Self { first, count }
    }

    /// Number of candidate subsegments, duplicates included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn first_match(&self, keys: &[String]) -> Option<(usize, usize)> {
        if keys.is_empty() {
            return None;
        }
        self.first.get(keys).copied()
    }
}
