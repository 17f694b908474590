// WHY: Hits and summaries are plain serializable data; the stripped buffer travels with
// the summary by reference so source offsets are never recomputed downstream

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ElsError, Result};
use crate::grid::{self, GridCoord};
use crate::normalizer::StrippedText;
use crate::valuation::Valuation;

/// Reading direction of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    Both,
}

impl Direction {
    /// Signs applied to each skip magnitude, forward first
    pub fn signs(self) -> &'static [i64] {
        match self {
            Direction::Forward => &[1],
            Direction::Backward => &[-1],
            Direction::Both => &[1, -1],
        }
    }

    /// Direction implied by a signed skip
    pub fn of_skip(skip: i64) -> Self {
        if skip < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

/// Half-open run `[start, end)` of letters skipped over between two matched letters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One confirmed occurrence of a term at a skip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElsResult {
    pub term: String,
    pub skip: i64,
    pub start_pos: usize,
    pub letter_positions: Vec<usize>,
    pub intervening_segments: Vec<Segment>,
    #[serde(flatten)]
    pub(crate) valuation: Option<Valuation>,
}

impl ElsResult {
    /// Build a hit, checking every positional invariant against a buffer of `text_len` letters
    pub fn new(term: impl Into<String>, skip: i64, start_pos: usize, text_len: usize) -> Result<Self> {
        let term = term.into();
        let term_len = term.chars().count();
        crate::matcher::validate_query(term_len, skip)?;

        let mut letter_positions = Vec::with_capacity(term_len);
        for j in 0..term_len {
            let pos = i64::try_from(j)
                .ok()
                .and_then(|j| j.checked_mul(skip))
                .and_then(|offset| i64::try_from(start_pos).ok()?.checked_add(offset))
                .filter(|&pos| pos >= 0 && (pos as u64) < text_len as u64)
                .ok_or_else(|| {
                    ElsError::invalid(
                        "start_pos",
                        format!("{term:?} at skip {skip} from {start_pos} leaves a buffer of {text_len} letters"),
                    )
                })?;
            letter_positions.push(pos as usize);
        }

        Ok(Self::from_positions(term, skip, start_pos, letter_positions))
    }

    /// Build a hit from positions already known to be in bounds
    pub(crate) fn from_positions(
        term: String,
        skip: i64,
        start_pos: usize,
        letter_positions: Vec<usize>,
    ) -> Self {
        let intervening_segments = letter_positions
            .windows(2)
            .map(|pair| {
                let (lo, hi) = if pair[0] < pair[1] {
                    (pair[0], pair[1])
                } else {
                    (pair[1], pair[0])
                };
                Segment { start: lo + 1, end: hi }
            })
            .collect();

        Self {
            term,
            skip,
            start_pos,
            letter_positions,
            intervening_segments,
            valuation: None,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::of_skip(self.skip)
    }

    /// Buffer index of the term's final letter
    pub fn last_pos(&self) -> usize {
        self.letter_positions
            .last()
            .copied()
            .unwrap_or(self.start_pos)
    }

    /// Smallest and largest buffer index touched by this hit
    pub fn span(&self) -> (usize, usize) {
        let last = self.last_pos();
        (self.start_pos.min(last), self.start_pos.max(last))
    }

    pub fn valuation(&self) -> Option<Valuation> {
        self.valuation
    }

    pub fn term_value(&self) -> Option<i64> {
        self.valuation.map(|v| v.term_value)
    }

    pub fn skip_value(&self) -> Option<i64> {
        self.valuation.map(|v| v.skip_value)
    }

    pub fn total_value(&self) -> Option<i64> {
        self.valuation.map(|v| v.total_value)
    }

    /// Grid coordinates of every matched letter for a grid `columns` wide
    pub fn row_col_coords(&self, columns: usize) -> Result<Vec<GridCoord>> {
        self.letter_positions
            .iter()
            .map(|&pos| grid::project(pos, columns))
            .collect()
    }

    /// Source byte offsets of every matched letter
    pub fn source_offsets(&self, stripped: &StrippedText) -> Vec<usize> {
        self.letter_positions
            .iter()
            .filter_map(|&pos| stripped.source_offset(pos))
            .collect()
    }

    /// Matched letters as they appear in the source
    pub fn matched_text(&self, stripped: &StrippedText) -> String {
        self.letter_positions
            .iter()
            .filter_map(|&pos| stripped.raw_letters().get(pos))
            .collect()
    }
}

/// Count hits per exact signed skip; skips without hits are absent
pub fn skip_histogram<'a>(results: impl IntoIterator<Item = &'a ElsResult>) -> BTreeMap<i64, usize> {
    let mut histogram = BTreeMap::new();
    for result in results {
        *histogram.entry(result.skip).or_insert(0) += 1;
    }
    histogram
}

/// Orderings callers commonly apply to a result list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// By |skip|, then skip, then start position
    Skip,
    /// By start position, then |skip|
    Position,
    /// By total value (unvalued last), then start position
    Value,
}

/// Result of one search invocation
#[derive(Debug, Clone, Serialize)]
pub struct ElsSearchSummary {
    pub terms: Vec<String>,
    pub results: Vec<ElsResult>,
    /// Number of letters in the stripped buffer
    pub source_text_length: usize,
    pub source_document_ref: Option<String>,
    pub total_hits: usize,
    pub skip_distribution: BTreeMap<i64, usize>,
    /// Skip jobs that actually ran (less than planned when cancelled)
    pub skips_searched: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    #[serde(skip)]
    stripped: Arc<StrippedText>,
}

impl ElsSearchSummary {
    /// Assemble a summary, deriving the counters from `results`
    pub fn from_results(
        stripped: Arc<StrippedText>,
        terms: Vec<String>,
        results: Vec<ElsResult>,
        source_document_ref: Option<String>,
    ) -> Self {
        let skip_distribution = skip_histogram(&results);
        Self {
            terms,
            total_hits: results.len(),
            source_text_length: stripped.len(),
            source_document_ref,
            skip_distribution,
            skips_searched: 0,
            cancelled: false,
            elapsed_ms: 0,
            results,
            stripped,
        }
    }

    /// Copy of this summary holding only the results accepted by `keep`
    pub fn retain_cloned(&self, keep: impl Fn(&ElsResult) -> bool) -> Self {
        let results: Vec<ElsResult> = self.results.iter().filter(|r| keep(r)).cloned().collect();
        let mut filtered = Self::from_results(
            Arc::clone(&self.stripped),
            self.terms.clone(),
            results,
            self.source_document_ref.clone(),
        );
        filtered.skips_searched = self.skips_searched;
        filtered.cancelled = self.cancelled;
        filtered.elapsed_ms = self.elapsed_ms;
        filtered
    }

    /// The stripped buffer every result indexes into
    pub fn stripped(&self) -> &Arc<StrippedText> {
        &self.stripped
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Source byte offsets of every hit, in result order, for highlighting the original
    pub fn highlight_offsets(&self) -> Vec<Vec<usize>> {
        self.results
            .iter()
            .map(|r| r.source_offsets(&self.stripped))
            .collect()
    }

    pub fn sort_by(&mut self, key: SortKey) {
        match key {
            SortKey::Skip => self.results.sort_by(|a, b| {
                (a.skip.unsigned_abs(), a.skip, a.start_pos).cmp(&(b.skip.unsigned_abs(), b.skip, b.start_pos))
            }),
            SortKey::Position => self.results.sort_by(|a, b| {
                (a.start_pos, a.skip.unsigned_abs(), a.skip).cmp(&(b.start_pos, b.skip.unsigned_abs(), b.skip))
            }),
            SortKey::Value => self.results.sort_by(|a, b| {
                let key = |r: &ElsResult| (r.total_value().is_none(), r.total_value(), r.start_pos);
                key(a).cmp(&key(b))
            }),
        }
    }
}
