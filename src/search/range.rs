// WHY: Contiguous skip ranges are the common case; backward reading is expressed by
// negating the skip, never by reversing the buffer, so position_map stays valid

use std::sync::Arc;

use super::{execute_plan, normalize_terms, plan_limit, SearchContext};
use crate::error::{ElsError, Result};
use crate::normalizer::StrippedText;
use crate::result::{Direction, ElsSearchSummary};

/// Signed skips for `[min_skip, max_skip]`, each magnitude forward then backward as required
pub fn range_plan(min_skip: usize, max_skip: usize, direction: Direction) -> Result<Vec<i64>> {
    let (min, max) = check_bounds(min_skip, max_skip)?;
    Ok((min..=max)
        .flat_map(|magnitude| direction.signs().iter().map(move |sign| sign * magnitude))
        .collect())
}

fn check_bounds(min_skip: usize, max_skip: usize) -> Result<(i64, i64)> {
    if min_skip == 0 {
        return Err(ElsError::invalid("min_skip", "skip bounds must be at least 1"));
    }
    if max_skip < min_skip {
        return Err(ElsError::invalid(
            "max_skip",
            format!("{max_skip} is below min_skip {min_skip}"),
        ));
    }
    let max = i64::try_from(max_skip)
        .map_err(|_| ElsError::invalid("max_skip", format!("{max_skip} is too large")))?;
    Ok((min_skip as i64, max))
}

/// Search one term across every skip in `[min_skip, max_skip]`
pub fn search_range(
    stripped: &Arc<StrippedText>,
    term: &str,
    min_skip: usize,
    max_skip: usize,
    direction: Direction,
    ctx: &SearchContext<'_>,
) -> Result<ElsSearchSummary> {
    search_terms(stripped, &[term], min_skip, max_skip, direction, ctx)
}

/// Search several terms across the same skip range, merged into one summary
pub fn search_terms(
    stripped: &Arc<StrippedText>,
    terms: &[&str],
    min_skip: usize,
    max_skip: usize,
    direction: Direction,
    ctx: &SearchContext<'_>,
) -> Result<ElsSearchSummary> {
    let normalized = normalize_terms(stripped, terms)?;
    // bounds are checked as given, then narrowed to the skips some term can fit
    check_bounds(min_skip, max_skip)?;
    let plan = match plan_limit(stripped, &normalized) {
        Some(limit) if limit < min_skip => Vec::new(),
        Some(limit) => range_plan(min_skip, max_skip.min(limit), direction)?,
        None => range_plan(min_skip, max_skip, direction)?,
    };
    execute_plan(stripped, normalized, &plan, ctx)
}
