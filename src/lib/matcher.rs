//! Match observed index sequences against the expected barcodes.
//!
//! A barcode matches when the observed sequence starts with it, or when the two differ at no
//! more than `max_mismatches` positions over the length of the barcode.  Insertions and
//! deletions are never tolerated.

use crate::sample_metadata::Barcode;

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum MatchResult {
    /// The observed sequence matched the barcode at `barcode_index`.
    Match { barcode_index: usize },
    NoMatch,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    pub fn is_no_match(&self) -> bool {
        !self.is_match()
    }
}

/// Returns true if `trial` matches `reference` with at most `max_mismatches` mismatches.
///
/// Bases in `trial` beyond the length of `reference` are ignored, and a `trial` shorter than
/// `reference` never matches.
pub fn matches_barcode(trial: &[u8], reference: &[u8], max_mismatches: usize) -> bool {
    if trial.starts_with(reference) {
        return true;
    }
    let mut mismatches = 0;
    for (i, expected) in reference.iter().enumerate() {
        match trial.get(i) {
            None => return false,
            Some(observed) if observed != expected => {
                mismatches += 1;
                if mismatches > max_mismatches {
                    return false;
                }
            }
            Some(_) => (),
        }
    }
    true
}

/// The base trait for all matching algorithms.
pub trait Matcher {
    fn find(&self, observed: &[u8]) -> MatchResult;
}

/// Matches against an ordered list of barcodes, returning the first that matches.
///
/// Priority is positional: an earlier barcode wins even when a later one would match with
/// fewer mismatches.
pub struct FirstMatchMatcher<'a> {
    pub barcodes: &'a [Barcode],
    pub max_mismatches: usize,
}

impl<'a> FirstMatchMatcher<'a> {
    pub fn new(barcodes: &'a [Barcode], max_mismatches: usize) -> Self {
        Self { barcodes, max_mismatches }
    }
}

impl<'a> Matcher for FirstMatchMatcher<'a> {
    fn find(&self, observed: &[u8]) -> MatchResult {
        self.barcodes
            .iter()
            .position(|barcode| matches_barcode(observed, &barcode.sequence, self.max_mismatches))
            .map_or(MatchResult::NoMatch, |barcode_index| MatchResult::Match { barcode_index })
    }
}
