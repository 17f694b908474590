// WHY: Candidate starts come from the position index of the term's first letter,
// so each skip costs O(occurrences(term[0]) * L) instead of O(N * L)

use std::collections::HashMap;
use tracing::debug;

use crate::error::{ElsError, Result};
use crate::result::ElsResult;

/// Positions of every distinct letter in a stripped buffer, each list ascending
#[derive(Debug, Clone, Default)]
pub struct LetterIndex {
    positions: HashMap<char, Vec<usize>>,
}

impl LetterIndex {
    pub fn build(letters: &[char]) -> Self {
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (i, &ch) in letters.iter().enumerate() {
            positions.entry(ch).or_default().push(i);
        }
        debug!(
            "Built letter index: {} letters, {} distinct",
            letters.len(),
            positions.len()
        );
        Self { positions }
    }

    /// Ascending positions of `ch`, empty when the letter never occurs
    pub fn positions(&self, ch: char) -> &[usize] {
        self.positions.get(&ch).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn distinct_letters(&self) -> usize {
        self.positions.len()
    }
}

/// Reject the parameter combinations no skip search can accept
pub fn validate_query(term_len: usize, skip: i64) -> Result<()> {
    if skip == 0 {
        return Err(ElsError::invalid("skip", "must not be zero"));
    }
    if term_len == 0 {
        return Err(ElsError::invalid("term", "must contain at least one letter"));
    }
    Ok(())
}

/// Largest skip magnitude at which a `term_len`-letter term fits in `len` letters
/// `None` means unbounded: a one-letter term reads the same at every skip
pub fn max_feasible_skip(len: usize, term_len: usize) -> Option<usize> {
    if len == 0 {
        return Some(0);
    }
    match term_len {
        0 | 1 => None,
        n => Some((len - 1) / (n - 1)),
    }
}

/// Range of start positions whose last sampled letter stays inside `[0, len)`
/// Returns `None` when no start can fit the term at this skip
fn feasible_starts(len: usize, term_len: usize, skip: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let last = i64::try_from(len).ok()? - 1;
    let reach = i64::try_from(term_len.checked_sub(1)?).ok()?.checked_mul(skip)?;

    // start + reach must also satisfy 0 <= start + reach <= last
    let (lo, hi) = if reach < 0 {
        (reach.checked_neg()?, last)
    } else {
        (0, last.checked_sub(reach)?)
    };
    if lo > hi {
        return None;
    }
    Some((lo as usize, hi as usize))
}

/// Enumerates start positions where sampling at a fixed skip spells a term
pub struct SkipMatcher<'a> {
    letters: &'a [char],
    index: &'a LetterIndex,
}

impl<'a> SkipMatcher<'a> {
    /// `index` must have been built from `letters`
    pub fn new(letters: &'a [char], index: &'a LetterIndex) -> Self {
        Self { letters, index }
    }

    /// All start positions (ascending) at which `term` occurs with `skip`
    pub fn find_matches(&self, term: &[char], skip: i64) -> Result<Vec<usize>> {
        validate_query(term.len(), skip)?;
        Ok(self.scan(term, skip))
    }

    /// Same as `find_matches` without parameter validation
    pub(crate) fn scan(&self, term: &[char], skip: i64) -> Vec<usize> {
        let Some((lo, hi)) = feasible_starts(self.letters.len(), term.len(), skip) else {
            return Vec::new();
        };

        let candidates = self.index.positions(term[0]);
        // WHY: bounds check happens on the candidate slice, before any letter is compared
        let from = candidates.partition_point(|&p| p < lo);
        let to = candidates.partition_point(|&p| p <= hi);

        candidates[from..to]
            .iter()
            .copied()
            .filter(|&start| self.verify(term, start, skip))
            .collect()
    }

    /// Full hit for a start position returned by `scan`
    pub fn build_result(&self, term: &str, term_len: usize, skip: i64, start: usize) -> ElsResult {
        let positions = (0..term_len)
            .map(|j| (start as i64 + j as i64 * skip) as usize)
            .collect();
        ElsResult::from_positions(term.to_string(), skip, start, positions)
    }

    fn verify(&self, term: &[char], start: usize, skip: i64) -> bool {
        let start = start as i64;
        term.iter().enumerate().skip(1).all(|(j, &expected)| {
            let pos = (start + j as i64 * skip) as usize;
            self.letters[pos] == expected
        })
    }
}

/// One-off search that builds a throwaway index over `letters`
pub fn find_matches(letters: &[char], term: &str, skip: i64) -> Result<Vec<usize>> {
    let term: Vec<char> = term.chars().collect();
    validate_query(term.len(), skip)?;
    let index = LetterIndex::build(letters);
    Ok(SkipMatcher::new(letters, &index).scan(&term, skip))
}
