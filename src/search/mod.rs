// WHY: Range and sequence searches differ only in how the skip plan is built; both
// hand the plan to one executor that fans (term, skip) jobs out over rayon

use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ElsError, Result};
use crate::matcher::{max_feasible_skip, SkipMatcher};
use crate::normalizer::{NormalizerConfig, StrippedText};
use crate::reader::Document;
use crate::result::{Direction, ElsResult, ElsSearchSummary};

pub mod range;
pub mod sequence;

pub use range::{range_plan, search_range, search_terms};
pub use sequence::{search_sequence, search_sequence_terms, sequence_plan};

/// Execution settings for a search run
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Dispatch skip jobs over a worker pool
    pub parallel: bool,
    /// Worker count for a dedicated pool; 0 uses the shared rayon pool
    pub threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: 0,
        }
    }
}

impl SearchConfig {
    /// Number of workers a parallel run will use
    pub fn effective_threads(&self) -> usize {
        match (self.parallel, self.threads) {
            (false, _) => 1,
            // WHY: the shared rayon pool defaults to one worker per logical CPU
            (true, 0) => num_cpus::get().max(1),
            (true, n) => n,
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running search
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives a notification each time one skip job finishes
pub trait SearchProgress: Sync {
    /// Called once with the number of jobs left after pruning, before any runs
    fn plan_ready(&self, _jobs: usize) {}

    fn skip_completed(&self, skip: i64, hits: usize);
}

impl SearchProgress for indicatif::ProgressBar {
    fn plan_ready(&self, jobs: usize) {
        self.set_length(jobs as u64);
    }

    fn skip_completed(&self, _skip: i64, _hits: usize) {
        self.inc(1);
    }
}

/// Everything a search needs besides the text and the query
#[derive(Clone, Default)]
pub struct SearchContext<'a> {
    pub config: SearchConfig,
    pub cancel: CancelToken,
    pub progress: Option<&'a dyn SearchProgress>,
    pub document_ref: Option<String>,
}

impl<'a> SearchContext<'a> {
    pub fn with_progress(mut self, progress: &'a dyn SearchProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// One unit of work: a term index and a signed skip
type Job = (usize, i64);

/// Normalize caller terms the way the text was stripped, dropping repeats after the first
pub(crate) fn normalize_terms(stripped: &StrippedText, terms: &[&str]) -> Result<Vec<String>> {
    if terms.is_empty() {
        return Err(ElsError::invalid("terms", "at least one term is required"));
    }
    let mut seen = HashSet::with_capacity(terms.len());
    let mut normalized = Vec::with_capacity(terms.len());
    for term in terms {
        let term = stripped.normalize_term(term)?;
        if seen.insert(term.clone()) {
            normalized.push(term);
        }
    }
    Ok(normalized)
}

/// Largest skip magnitude any of `terms` can fit at; `None` when unbounded
pub(crate) fn plan_limit(stripped: &StrippedText, terms: &[String]) -> Option<usize> {
    terms
        .iter()
        .map(|t| max_feasible_skip(stripped.len(), t.chars().count()))
        .try_fold(0usize, |acc, limit| limit.map(|l| acc.max(l)))
}

/// Run every planned skip for every term and merge the hits in plan order
pub(crate) fn execute_plan(
    stripped: &Arc<StrippedText>,
    terms: Vec<String>,
    plan: &[i64],
    ctx: &SearchContext<'_>,
) -> Result<ElsSearchSummary> {
    let start_time = Instant::now();
    let term_chars: Vec<Vec<char>> = terms.iter().map(|t| t.chars().collect()).collect();
    let limits: Vec<Option<usize>> = term_chars
        .iter()
        .map(|t| max_feasible_skip(stripped.len(), t.len()))
        .collect();
    // WHY: a skip too wide for the term can never match, so it is not a job at all
    let jobs: Vec<Job> = (0..terms.len())
        .flat_map(|t| plan.iter().map(move |&skip| (t, skip)))
        .filter(|&(t, skip)| limits[t].map_or(true, |limit| skip.unsigned_abs() <= limit as u64))
        .collect();

    info!(
        "Searching {} letters for {:?} over {} skip jobs ({} pruned, {} workers)",
        stripped.len(),
        terms,
        jobs.len(),
        terms.len() * plan.len() - jobs.len(),
        ctx.config.effective_threads()
    );
    if let Some(progress) = ctx.progress {
        progress.plan_ready(jobs.len());
    }

    let letters = stripped.letters();
    let matcher = SkipMatcher::new(letters, stripped.letter_index());

    // WHY: cancellation is only observed between jobs, so a skip's hits are either all present or absent
    let run_job = |&(term_idx, skip): &Job| -> Option<Vec<ElsResult>> {
        if ctx.cancel.is_cancelled() {
            return None;
        }
        let term = &term_chars[term_idx];
        let hits: Vec<ElsResult> = matcher
            .scan(term, skip)
            .into_iter()
            .map(|start| matcher.build_result(&terms[term_idx], term.len(), skip, start))
            .collect();

        debug!("Skip {} for {:?}: {} hits", skip, terms[term_idx], hits.len());
        if let Some(progress) = ctx.progress {
            progress.skip_completed(skip, hits.len());
        }
        Some(hits)
    };

    let outcomes = dispatch(&jobs, &ctx.config, run_job)?;

    let skips_searched = outcomes.iter().filter(|o| o.is_some()).count();
    let cancelled = skips_searched < jobs.len();
    let results: Vec<ElsResult> = outcomes.into_iter().flatten().flatten().collect();

    let mut summary = ElsSearchSummary::from_results(
        Arc::clone(stripped),
        terms,
        results,
        ctx.document_ref.clone(),
    );
    summary.skips_searched = skips_searched;
    summary.cancelled = cancelled;
    summary.elapsed_ms = start_time.elapsed().as_millis() as u64;

    if cancelled {
        warn!(
            "Search cancelled after {} of {} skip jobs",
            skips_searched,
            jobs.len()
        );
    }
    info!(
        "Search finished: {} hits across {} skips in {}ms",
        summary.total_hits,
        summary.skip_distribution.len(),
        summary.elapsed_ms
    );

    Ok(summary)
}

/// Map `f` over `jobs`, in parallel when configured, preserving job order
fn dispatch<T, F>(jobs: &[Job], config: &SearchConfig, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Job) -> T + Sync + Send,
{
    if !config.parallel || jobs.len() < 2 {
        return Ok(jobs.iter().map(f).collect());
    }
    if config.threads == 0 {
        return Ok(jobs.par_iter().map(f).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| ElsError::WorkerPool(e.to_string()))?;
    Ok(pool.install(|| jobs.par_iter().map(&f).collect()))
}

/// A loaded text plus the settings every search over it shares
/// WHY: replaces a long-lived service object; a new session is built per loaded text
pub struct SearchSession {
    stripped: Arc<StrippedText>,
    document_ref: Option<String>,
    config: SearchConfig,
    cancel: CancelToken,
}

impl SearchSession {
    pub fn new(source: &str, normalizer: NormalizerConfig) -> Self {
        Self {
            stripped: Arc::new(StrippedText::new(source, normalizer)),
            document_ref: None,
            config: SearchConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn from_document(document: &Document, normalizer: NormalizerConfig) -> Self {
        let mut session = Self::new(&document.text, normalizer);
        session.document_ref = document.identifier.clone();
        session
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_document_ref(mut self, document_ref: impl Into<String>) -> Self {
        self.document_ref = Some(document_ref.into());
        self
    }

    pub fn stripped(&self) -> &Arc<StrippedText> {
        &self.stripped
    }

    pub fn document_ref(&self) -> Option<&str> {
        self.document_ref.as_deref()
    }

    /// Token that cancels searches started from this session
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Context carrying this session's settings, for the free search functions
    pub fn context(&self) -> SearchContext<'static> {
        SearchContext {
            config: self.config.clone(),
            cancel: self.cancel.clone(),
            progress: None,
            document_ref: self.document_ref.clone(),
        }
    }

    pub fn search_range(
        &self,
        term: &str,
        min_skip: usize,
        max_skip: usize,
        direction: Direction,
    ) -> Result<ElsSearchSummary> {
        search_range(&self.stripped, term, min_skip, max_skip, direction, &self.context())
    }

    pub fn search_sequence(
        &self,
        term: &str,
        skip_sequence: &[usize],
        direction: Direction,
    ) -> Result<ElsSearchSummary> {
        search_sequence(&self.stripped, term, skip_sequence, direction, &self.context())
    }

    pub fn search_terms(
        &self,
        terms: &[&str],
        min_skip: usize,
        max_skip: usize,
        direction: Direction,
    ) -> Result<ElsSearchSummary> {
        search_terms(&self.stripped, terms, min_skip, max_skip, direction, &self.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingProgress(AtomicUsize);

    impl SearchProgress for CountingProgress {
        fn skip_completed(&self, _skip: i64, _hits: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_progress_called_per_job() {
        let session = SearchSession::new("abcabcabc", NormalizerConfig::default());
        let progress = CountingProgress(AtomicUsize::new(0));
        let ctx = session.context().with_progress(&progress);
        let summary = search_range(session.stripped(), "abc", 1, 4, Direction::Both, &ctx).unwrap();
        assert_eq!(progress.0.load(Ordering::SeqCst), 8);
        assert_eq!(summary.skips_searched, 8);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_cancelled_before_start_returns_empty() {
        let session = SearchSession::new("abcabcabc", NormalizerConfig::default());
        session.cancel_token().cancel();
        let summary = session.search_range("abc", 1, 5, Direction::Forward).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.skips_searched, 0);
        assert_eq!(summary.total_hits, 0);
    }

    struct CancelAfter {
        token: CancelToken,
        remaining: AtomicUsize,
    }

    impl SearchProgress for CancelAfter {
        fn skip_completed(&self, _skip: i64, _hits: usize) {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.token.cancel();
            }
        }
    }

    #[test]
    fn test_cancel_midway_keeps_whole_skips() {
        let text = "abc".repeat(50);
        let session = SearchSession::new(&text, NormalizerConfig::default()).with_config(SearchConfig {
            parallel: false,
            threads: 0,
        });
        let progress = CancelAfter {
            token: session.cancel_token(),
            remaining: AtomicUsize::new(3),
        };
        let ctx = session.context().with_progress(&progress);
        let summary = search_range(session.stripped(), "abc", 1, 10, Direction::Forward, &ctx).unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.skips_searched, 3);
        // sequential plan order: skips 1, 2, 3 ran to completion, nothing after
        assert!(summary.results.iter().all(|r| (1..=3).contains(&r.skip)));
        assert_eq!(summary.skip_distribution.get(&1), Some(&50));
    }

    #[test]
    fn test_dedicated_pool_matches_sequential() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(20);
        let sequential = SearchSession::new(&text, NormalizerConfig::default())
            .with_config(SearchConfig { parallel: false, threads: 0 })
            .search_range("ox", 1, 30, Direction::Both)
            .unwrap();
        let pooled = SearchSession::new(&text, NormalizerConfig::default())
            .with_config(SearchConfig { parallel: true, threads: 3 })
            .search_range("ox", 1, 30, Direction::Both)
            .unwrap();
        assert_eq!(sequential.results, pooled.results);
        assert_eq!(sequential.skip_distribution, pooled.skip_distribution);
    }

    #[test]
    fn test_repeated_terms_searched_once() {
        let session = SearchSession::new("abcabcabc", NormalizerConfig::default());
        let summary = session.search_terms(&["ab", "AB", "a-b", "ca"], 1, 1, Direction::Forward).unwrap();
        assert_eq!(summary.terms, vec!["ab".to_string(), "ca".to_string()]);

        let keys: HashSet<(&str, i64, usize)> = summary
            .results
            .iter()
            .map(|r| (r.term.as_str(), r.skip, r.start_pos))
            .collect();
        assert_eq!(keys.len(), summary.results.len());
        assert_eq!(summary.total_hits, 5);
        assert_eq!(summary.skip_distribution[&1], 5);
    }

    #[test]
    fn test_plan_ready_reports_pruned_job_count() {
        struct Planned(AtomicUsize);
        impl SearchProgress for Planned {
            fn plan_ready(&self, jobs: usize) {
                self.0.store(jobs, Ordering::SeqCst);
            }
            fn skip_completed(&self, _skip: i64, _hits: usize) {}
        }

        let session = SearchSession::new("abcabcabc", NormalizerConfig::default());
        let progress = Planned(AtomicUsize::new(usize::MAX));
        let ctx = session.context().with_progress(&progress);
        // "abc" fits up to skip 4 and "ab" up to skip 8 in 9 letters
        let summary = search_terms(session.stripped(), &["abc", "ab"], 1, 50, Direction::Both, &ctx).unwrap();
        assert_eq!(progress.0.load(Ordering::SeqCst), 8 + 16);
        assert_eq!(summary.skips_searched, 24);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_effective_threads() {
        let config = SearchConfig { parallel: false, threads: 8 };
        assert_eq!(config.effective_threads(), 1);
        assert!(SearchConfig::default().effective_threads() >= 1);
    }
}
