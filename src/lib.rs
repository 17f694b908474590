pub mod chain;
pub mod error;
pub mod export;
pub mod grid;
pub mod matcher;
pub mod normalizer;
pub mod reader;
pub mod result;
pub mod search;
pub mod sequences;
pub mod valuation;

// Re-export main types for convenient access
pub use error::{ElsError, Result};
pub use normalizer::{normalize, CaseMode, NormalizerConfig, StrippedText};
pub use result::{Direction, ElsResult, ElsSearchSummary, Segment, SortKey};

// Re-export search entry points
pub use search::{
    search_range, search_sequence, search_sequence_terms, search_terms, CancelToken, SearchConfig, SearchContext,
    SearchProgress, SearchSession,
};

// Re-export post-processing stages
pub use chain::{assemble_chains, search_chain, ChainOptions, ChainQuery, ChainResult, ChainSearchSummary, LinkRule};
pub use grid::{project, GridCoord, GridView};
pub use valuation::{annotate, annotate_summary, filter_by_value, Calculator, Valuation, ValueFn};
