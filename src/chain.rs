// WHY: Chain linking is a strategy chosen by the caller: hits sharing one skip that read
// on through the text, or hits of any skip whose spans touch. Both scan candidates in a
// fixed order so the same input always yields the same chains.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ElsError, Result};
use crate::normalizer::StrippedText;
use crate::result::{skip_histogram, Direction, ElsResult, ElsSearchSummary};
use crate::search::{search_terms, SearchContext};
use crate::valuation::{annotate_summary, ValueFn};

/// Why the members of a chain were grouped together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRule {
    /// Same signed skip, non-overlapping, each next start within `max_gap` of the previous last letter
    SharedSkip,
    /// Any skip or term, spans overlapping or directly adjacent
    AdjacentPosition,
}

/// Limits applied while growing chains
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// Longest chain emitted; at least 2
    pub max_chain_length: usize,
    /// Largest distance from one member's last letter to the next member's start (`SharedSkip` only)
    pub max_gap: usize,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            max_chain_length: 8,
            max_gap: 100,
        }
    }
}

impl ChainOptions {
    fn validate(&self) -> Result<()> {
        if self.max_chain_length < 2 {
            return Err(ElsError::invalid(
                "max_chain_length",
                "a chain needs room for at least 2 members",
            ));
        }
        Ok(())
    }
}

/// An ordered group of linked hits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainResult {
    pub members: Vec<ElsResult>,
    /// Smallest and largest letter index touched by any member
    pub total_span: (usize, usize),
    pub link_rule: LinkRule,
}

impl ChainResult {
    fn new(members: Vec<ElsResult>, link_rule: LinkRule) -> Self {
        let total_span = members.iter().map(ElsResult::span).fold(
            (usize::MAX, 0),
            |(lo, hi), (min, max)| (lo.min(min), hi.max(max)),
        );
        Self {
            members,
            total_span,
            link_rule,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Candidate order: start position, then |skip|, then skip and term for a total order
fn candidate_order(a: &ElsResult, b: &ElsResult) -> Ordering {
    (a.start_pos, a.skip.unsigned_abs(), a.skip, &a.term).cmp(&(
        b.start_pos,
        b.skip.unsigned_abs(),
        b.skip,
        &b.term,
    ))
}

fn links(prev: &ElsResult, next: &ElsResult, rule: LinkRule, options: &ChainOptions) -> bool {
    let (prev_min, prev_max) = prev.span();
    let (next_min, next_max) = next.span();
    match rule {
        LinkRule::SharedSkip => {
            let disjoint = next_min > prev_max || next_max < prev_min;
            disjoint
                && next.skip == prev.skip
                && next.start_pos.abs_diff(prev.last_pos()) <= options.max_gap
        }
        LinkRule::AdjacentPosition => {
            next_min <= prev_max.saturating_add(1) && prev_min <= next_max.saturating_add(1)
        }
    }
}

/// Greedily grow chains over candidates already in `candidate_order`
fn link_candidates(candidates: &[&ElsResult], rule: LinkRule, options: &ChainOptions) -> Vec<ChainResult> {
    let mut used = vec![false; candidates.len()];
    let mut chains = Vec::new();

    for seed in 0..candidates.len() {
        if used[seed] {
            continue;
        }
        let mut members = vec![seed];
        let mut current = seed;

        while members.len() < options.max_chain_length {
            let next = (current + 1..candidates.len())
                .find(|&i| !used[i] && links(candidates[current], candidates[i], rule, options));
            match next {
                Some(i) => {
                    members.push(i);
                    current = i;
                }
                None => break,
            }
        }

        if members.len() >= 2 {
            for &i in &members {
                used[i] = true;
            }
            chains.push(ChainResult::new(
                members.iter().map(|&i| candidates[i].clone()).collect(),
                rule,
            ));
        }
    }
    chains
}

/// Link hits into chains of at least two members
pub fn assemble_chains(results: &[ElsResult], rule: LinkRule, options: &ChainOptions) -> Result<Vec<ChainResult>> {
    options.validate()?;

    let mut candidates: Vec<&ElsResult> = results.iter().collect();
    candidates.sort_by(|a, b| candidate_order(a, b));
    candidates.dedup_by(|a, b| candidate_order(a, b) == Ordering::Equal);

    let chains = match rule {
        LinkRule::SharedSkip => {
            let mut groups: BTreeMap<i64, Vec<&ElsResult>> = BTreeMap::new();
            for candidate in candidates {
                groups.entry(candidate.skip).or_default().push(candidate);
            }
            groups
                .values()
                .flat_map(|group| link_candidates(group, rule, options))
                .collect()
        }
        LinkRule::AdjacentPosition => link_candidates(&candidates, rule, options),
    };

    debug!("Assembled {} chains from {} hits", chains.len(), results.len());
    Ok(chains)
}

/// Chains found in one chain search, with the same counters as a plain search summary
#[derive(Debug, Clone, Serialize)]
pub struct ChainSearchSummary {
    pub terms: Vec<String>,
    pub chains: Vec<ChainResult>,
    pub link_rule: LinkRule,
    pub source_text_length: usize,
    pub source_document_ref: Option<String>,
    pub total_chains: usize,
    /// Hits that ended up in some chain
    pub total_hits: usize,
    pub skip_distribution: BTreeMap<i64, usize>,
    /// Hits found before linking, chained or not
    pub candidate_hits: usize,
    pub skips_searched: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    #[serde(skip)]
    stripped: Arc<StrippedText>,
}

impl ChainSearchSummary {
    pub fn stripped(&self) -> &Arc<StrippedText> {
        &self.stripped
    }

    /// Every chained hit in chain order, as a flat search summary for export
    pub fn members_summary(&self) -> ElsSearchSummary {
        let members = self
            .chains
            .iter()
            .flat_map(|chain| chain.members.iter().cloned())
            .collect();
        let mut flat = ElsSearchSummary::from_results(
            Arc::clone(&self.stripped),
            self.terms.clone(),
            members,
            self.source_document_ref.clone(),
        );
        flat.skips_searched = self.skips_searched;
        flat.cancelled = self.cancelled;
        flat.elapsed_ms = self.elapsed_ms;
        flat
    }
}

/// Parameters of a chain search
#[derive(Debug, Clone)]
pub struct ChainQuery {
    pub terms: Vec<String>,
    pub min_skip: usize,
    pub max_skip: usize,
    pub direction: Direction,
    pub rule: LinkRule,
    pub options: ChainOptions,
}

/// Search every term over the skip range, optionally value the hits, then link them
pub fn search_chain(
    stripped: &Arc<StrippedText>,
    query: &ChainQuery,
    value_fn: Option<&dyn ValueFn>,
    ctx: &SearchContext<'_>,
) -> Result<ChainSearchSummary> {
    query.options.validate()?;
    let terms: Vec<&str> = query.terms.iter().map(String::as_str).collect();
    let mut summary = search_terms(stripped, &terms, query.min_skip, query.max_skip, query.direction, ctx)?;

    // WHY: values are attached before linking so every chain member carries them
    if let Some(value_fn) = value_fn {
        annotate_summary(&mut summary, value_fn);
    }

    let chains = assemble_chains(&summary.results, query.rule, &query.options)?;
    let skip_distribution = skip_histogram(chains.iter().flat_map(|c| c.members.iter()));
    let total_hits = chains.iter().map(ChainResult::len).sum();

    info!(
        "Chain search found {} chains ({} linked hits) from {} hits",
        chains.len(),
        total_hits,
        summary.total_hits
    );

    Ok(ChainSearchSummary {
        terms: summary.terms,
        total_chains: chains.len(),
        chains,
        link_rule: query.rule,
        source_text_length: stripped.len(),
        source_document_ref: summary.source_document_ref,
        total_hits,
        skip_distribution,
        candidate_hits: summary.total_hits,
        skips_searched: summary.skips_searched,
        cancelled: summary.cancelled,
        elapsed_ms: summary.elapsed_ms,
        stripped: Arc::clone(stripped),
    })
}
