// WHY: The engine stays generic over any caller-supplied skip list; named progressions
// (primes, Fibonacci, ...) live in the sequences adapter, not here

use std::collections::HashSet;
use std::sync::Arc;

use super::{execute_plan, normalize_terms, SearchContext};
use crate::error::{ElsError, Result};
use crate::normalizer::StrippedText;
use crate::result::{Direction, ElsSearchSummary};

/// Signed skips for an ordered list of magnitudes, duplicates dropped at first repeat
pub fn sequence_plan(skip_sequence: &[usize], direction: Direction) -> Result<Vec<i64>> {
    if skip_sequence.is_empty() {
        return Err(ElsError::invalid("skip_sequence", "must contain at least one skip"));
    }

    let mut seen = HashSet::with_capacity(skip_sequence.len());
    let mut plan = Vec::with_capacity(skip_sequence.len() * direction.signs().len());
    for &magnitude in skip_sequence {
        if magnitude == 0 {
            return Err(ElsError::invalid("skip_sequence", "skips must be positive"));
        }
        let magnitude = i64::try_from(magnitude)
            .map_err(|_| ElsError::invalid("skip_sequence", format!("{magnitude} is too large")))?;
        if !seen.insert(magnitude) {
            continue;
        }
        plan.extend(direction.signs().iter().map(|sign| sign * magnitude));
    }
    Ok(plan)
}

/// Search one term at every skip of a caller-supplied sequence
pub fn search_sequence(
    stripped: &Arc<StrippedText>,
    term: &str,
    skip_sequence: &[usize],
    direction: Direction,
    ctx: &SearchContext<'_>,
) -> Result<ElsSearchSummary> {
    search_sequence_terms(stripped, &[term], skip_sequence, direction, ctx)
}

/// Search several terms at every skip of the same sequence, merged into one summary
pub fn search_sequence_terms(
    stripped: &Arc<StrippedText>,
    terms: &[&str],
    skip_sequence: &[usize],
    direction: Direction,
    ctx: &SearchContext<'_>,
) -> Result<ElsSearchSummary> {
    let normalized = normalize_terms(stripped, terms)?;
    let plan = sequence_plan(skip_sequence, direction)?;
    execute_plan(stripped, normalized, &plan, ctx)
}
