// WHY: Export formats live outside the engine; summaries are plain data and this module
// only renders them for files and downstream tools

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::chain::ChainSearchSummary;
use crate::normalizer::StrippedText;
use crate::result::{ElsResult, ElsSearchSummary};

/// Column header of the TSV export
pub const TSV_HEADER: &str = "index\tterm\tskip\tstart_pos\tletter_positions\tsource_offsets\tterm_value\tskip_value\ttotal_value";

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One TSV line for a hit
pub fn format_result_line(index: usize, result: &ElsResult, stripped: &StrippedText) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        index,
        result.term,
        result.skip,
        result.start_pos,
        join(&result.letter_positions),
        join(&result.source_offsets(stripped)),
        optional(result.term_value()),
        optional(result.skip_value()),
        optional(result.total_value()),
    )
}

/// Write every hit of `summary` as TSV, header first
pub async fn write_results_tsv(path: &Path, summary: &ElsSearchSummary) -> Result<()> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);

    writer.write_all(TSV_HEADER.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    for (index, result) in summary.results.iter().enumerate() {
        let line = format_result_line(index, result, summary.stripped());
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    Ok(())
}

/// Pretty JSON rendering of a summary
pub fn summary_json(summary: &ElsSearchSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// Statistics for one CLI run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunStats {
    pub document: Option<String>,
    pub source_bytes: u64,
    pub letters: u64,
    pub terms: Vec<String>,
    pub skips_searched: u64,
    pub total_hits: u64,
    pub chains: Option<u64>,
    pub cancelled: bool,
    pub search_time_ms: u64,
    /// Letters scanned per second summed over every skip job
    pub letters_per_sec: f64,
}

impl RunStats {
    pub fn from_summary(summary: &ElsSearchSummary) -> Self {
        let scanned = summary.source_text_length as f64 * summary.skips_searched as f64;
        let letters_per_sec = if summary.elapsed_ms > 0 {
            scanned / (summary.elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };
        Self {
            document: summary.source_document_ref.clone(),
            source_bytes: summary.stripped().source_len() as u64,
            letters: summary.source_text_length as u64,
            terms: summary.terms.clone(),
            skips_searched: summary.skips_searched as u64,
            total_hits: summary.total_hits as u64,
            chains: None,
            cancelled: summary.cancelled,
            search_time_ms: summary.elapsed_ms,
            letters_per_sec,
        }
    }

    pub fn from_chain_summary(summary: &ChainSearchSummary) -> Self {
        let mut stats = Self::from_summary(&summary.members_summary());
        stats.total_hits = summary.candidate_hits as u64;
        stats.chains = Some(summary.total_chains as u64);
        stats
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
