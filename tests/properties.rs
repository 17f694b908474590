// Property tests for the engine's invariants
// WHY: small alphabets make hits frequent, so random texts exercise real matches

use els_search::chain::{assemble_chains, ChainOptions, LinkRule};
use els_search::grid::{position_of, project};
use els_search::{
    filter_by_value, annotate_summary, normalize, search_range, Direction, SearchConfig, SearchContext,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn sequential() -> SearchContext<'static> {
    SearchContext {
        config: SearchConfig { parallel: false, threads: 0 },
        ..Default::default()
    }
}

/// Every (skip, start) where sampling spells `term`, by exhaustive scan
fn brute_force(letters: &[char], term: &[char], min: usize, max: usize) -> BTreeSet<(i64, usize)> {
    let mut found = BTreeSet::new();
    let n = letters.len() as i64;
    for magnitude in min..=max {
        for skip in [magnitude as i64, -(magnitude as i64)] {
            for start in 0..n {
                let fits = term.iter().enumerate().all(|(j, &ch)| {
                    let pos = start + j as i64 * skip;
                    pos >= 0 && pos < n && letters[pos as usize] == ch
                });
                if fits {
                    found.insert((skip, start as usize));
                }
            }
        }
    }
    found
}

proptest! {
    /// Property: every buffer letter maps back to the source character it came from
    #[test]
    fn prop_position_map_round_trip(source in "[abAB .,\\-é\n]{0,60}") {
        let stripped = normalize(&source);
        prop_assert_eq!(stripped.position_map().len(), stripped.len());
        for i in 0..stripped.len() {
            let offset = stripped.position_map()[i];
            let ch = source[offset..].chars().next().unwrap();
            prop_assert_eq!(ch, stripped.raw_letters()[i]);
            prop_assert_eq!(stripped.config().fold_letter(ch), stripped.letters()[i]);
        }
        prop_assert!(stripped.position_map().windows(2).all(|w| w[0] < w[1]));
    }

    /// Property: hits are exactly the brute-force matches, each spelling its term
    #[test]
    fn prop_hits_match_brute_force(
        source in "[ab c]{0,60}",
        term in "[ab]{1,4}",
        min in 1usize..4,
        extra in 0usize..5,
    ) {
        let stripped = Arc::new(normalize(&source));
        let summary = search_range(&stripped, &term, min, min + extra, Direction::Both, &sequential()).unwrap();

        let term_chars: Vec<char> = term.chars().collect();
        let expected = brute_force(stripped.letters(), &term_chars, min, min + extra);
        let actual: BTreeSet<(i64, usize)> = summary.results.iter().map(|r| (r.skip, r.start_pos)).collect();
        prop_assert_eq!(actual.len(), summary.results.len());
        prop_assert_eq!(actual, expected);

        for result in &summary.results {
            prop_assert_ne!(result.skip, 0);
            let spelled: String = result.letter_positions.iter().map(|&p| stripped.letters()[p]).collect();
            prop_assert_eq!(&spelled, &result.term);
        }
        prop_assert_eq!(summary.skip_distribution.values().sum::<usize>(), summary.total_hits);
        prop_assert_eq!(summary.total_hits, summary.results.len());
    }

    /// Property: Both is the disjoint union of Forward and Backward
    #[test]
    fn prop_both_is_union_of_directions(
        source in "[abc]{0,50}",
        term in "[abc]{1,3}",
        max in 1usize..8,
    ) {
        let stripped = Arc::new(normalize(&source));
        let ctx = sequential();
        let keys = |direction| -> Vec<(i64, usize)> {
            let mut keys: Vec<_> = search_range(&stripped, &term, 1, max, direction, &ctx)
                .unwrap()
                .results
                .iter()
                .map(|r| (r.skip, r.start_pos))
                .collect();
            keys.sort();
            keys
        };

        let mut union = keys(Direction::Forward);
        union.extend(keys(Direction::Backward));
        union.sort();
        prop_assert_eq!(keys(Direction::Both), union);
    }

    /// Property: the worker pool never changes results or their order
    #[test]
    fn prop_parallel_matches_sequential(source in "[ab]{0,80}", term in "[ab]{2,3}") {
        let stripped = Arc::new(normalize(&source));
        let seq = search_range(&stripped, &term, 1, 10, Direction::Both, &sequential()).unwrap();
        let par = search_range(&stripped, &term, 1, 10, Direction::Both, &SearchContext::default()).unwrap();
        prop_assert_eq!(seq.results, par.results);
    }

    /// Property: chain members are valid hits and every chain has 2..=max members
    #[test]
    fn prop_chains_are_valid(
        source in "[ab]{0,60}",
        max_chain_length in 2usize..5,
        max_gap in 0usize..10,
        adjacent in any::<bool>(),
    ) {
        let stripped = Arc::new(normalize(&source));
        let summary = search_range(&stripped, "ab", 1, 4, Direction::Both, &sequential()).unwrap();
        let rule = if adjacent { LinkRule::AdjacentPosition } else { LinkRule::SharedSkip };
        let options = ChainOptions { max_chain_length, max_gap };
        let chains = assemble_chains(&summary.results, rule, &options).unwrap();

        let mut seen = BTreeSet::new();
        for chain in &chains {
            prop_assert!(chain.len() >= 2 && chain.len() <= max_chain_length);
            for member in &chain.members {
                prop_assert!(summary.results.contains(member));
                prop_assert!(seen.insert((member.skip, member.start_pos)), "hit used twice");
                prop_assert!(chain.total_span.0 <= member.span().0 && member.span().1 <= chain.total_span.1);
            }
        }
    }

    /// Property: row * columns + col == position
    #[test]
    fn prop_grid_projection_inverse(position in 0usize..100_000, columns in 1usize..500) {
        let coord = project(position, columns).unwrap();
        prop_assert!(coord.col < columns);
        prop_assert_eq!(coord.row * columns + coord.col, position);
        prop_assert_eq!(position_of(coord, columns).unwrap(), position);
    }

    /// Property: a value filter returns a subset whose totals are all in tolerance
    #[test]
    fn prop_value_filter_subset(source in "[ab]{0,40}", target in 0i64..20, tolerance in 0u64..5) {
        let stripped = Arc::new(normalize(&source));
        let mut summary = search_range(&stripped, "ab", 1, 6, Direction::Both, &sequential()).unwrap();
        annotate_summary(&mut summary, &|s: &str| s.len() as i64);

        let filtered = filter_by_value(&summary, target, tolerance);
        prop_assert!(filtered.total_hits <= summary.total_hits);
        prop_assert_eq!(filtered.skip_distribution.values().sum::<usize>(), filtered.total_hits);
        for result in &filtered.results {
            let total = result.total_value().unwrap();
            prop_assert!(total.abs_diff(target) <= tolerance);
            prop_assert!(summary.results.contains(result));
        }
    }
}
