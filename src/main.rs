use anyhow::Result;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use els_search::chain::{search_chain, ChainOptions, ChainQuery, ChainSearchSummary, LinkRule};
use els_search::export::{format_result_line, summary_json, write_results_tsv, RunStats, TSV_HEADER};
use els_search::grid::{project, GridView};
use els_search::normalizer::{CaseMode, NormalizerConfig};
use els_search::reader::{DocumentReader, ReaderConfig};
use els_search::result::{Direction, ElsResult, ElsSearchSummary, SortKey};
use els_search::search::{search_sequence_terms, search_terms, SearchConfig, SearchSession};
use els_search::sequences::{generate, SequenceKind};
use els_search::valuation::{annotate_summary, filter_by_value, Calculator, ValueFn};
use els_search::{ElsError, StrippedText};

#[derive(Parser, Debug)]
#[command(name = "els-search")]
#[command(about = "Equidistant letter sequence search over a text document")]
#[command(version)]
struct Args {
    /// UTF-8 text document to search
    file: PathBuf,

    /// Term to search for (repeat for several terms)
    #[arg(long = "term", required = true)]
    terms: Vec<String>,

    /// Smallest skip magnitude of a range search
    #[arg(long, default_value_t = 1)]
    min_skip: usize,

    /// Largest skip magnitude of a range search
    #[arg(long, default_value_t = 100)]
    max_skip: usize,

    /// Explicit comma-separated skip list, e.g. 3,5,8
    #[arg(long, value_delimiter = ',', conflicts_with = "sequence")]
    skips: Option<Vec<usize>>,

    /// Named skip progression
    #[arg(long, value_enum)]
    sequence: Option<SequenceArg>,

    /// Number of skips taken from the progression
    #[arg(long, default_value_t = 20)]
    sequence_len: usize,

    /// First skip of an arithmetic progression
    #[arg(long, default_value_t = 1)]
    sequence_start: usize,

    /// Step of an arithmetic progression
    #[arg(long, default_value_t = 1)]
    sequence_step: usize,

    #[arg(long, value_enum, default_value_t = DirectionArg::Both)]
    direction: DirectionArg,

    #[arg(long, value_enum, default_value_t = CaseArg::Lower)]
    case: CaseArg,

    /// Treat Hebrew final letter forms as their regular forms
    #[arg(long)]
    fold_finals: bool,

    /// Letter-value table used to annotate hits
    #[arg(long, value_enum, default_value_t = ValuationArg::Off)]
    valuation: ValuationArg,

    /// Keep only hits whose total value is within --tolerance of this value
    #[arg(long, conflicts_with = "chain")]
    target_value: Option<i64>,

    #[arg(long, default_value_t = 0)]
    tolerance: u64,

    /// Link hits into chains instead of listing them
    #[arg(long, value_enum, conflicts_with_all = ["skips", "sequence"])]
    chain: Option<ChainArg>,

    #[arg(long, default_value_t = 8)]
    max_chain_length: usize,

    #[arg(long, default_value_t = 100)]
    max_gap: usize,

    /// Reorder hits before printing
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Grid width used for row:col coordinates
    #[arg(long)]
    columns: Option<usize>,

    /// Print the letters grid around the first hit (width defaults to its skip)
    #[arg(long)]
    grid: bool,

    /// Worker threads (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Use memory-mapped I/O instead of async buffered
    #[arg(long)]
    use_mmap: bool,

    /// Suppress the console progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the summary as JSON instead of TSV lines
    #[arg(long)]
    json: bool,

    /// Also write every hit to this TSV file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Stats output file path
    #[arg(long)]
    stats_out: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
    Forward,
    Backward,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Forward => Direction::Forward,
            DirectionArg::Backward => Direction::Backward,
            DirectionArg::Both => Direction::Both,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CaseArg {
    Preserve,
    Lower,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ValuationArg {
    #[value(name = "none")]
    Off,
    EnglishOrdinal,
    EnglishSumerian,
    HebrewStandard,
}

impl ValuationArg {
    fn calculator(self) -> Option<Calculator> {
        match self {
            ValuationArg::Off => None,
            ValuationArg::EnglishOrdinal => Some(Calculator::EnglishOrdinal),
            ValuationArg::EnglishSumerian => Some(Calculator::EnglishSumerian),
            ValuationArg::HebrewStandard => Some(Calculator::HebrewStandard),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SequenceArg {
    Primes,
    Fibonacci,
    Squares,
    Triangular,
    PowersOfTwo,
    Arithmetic,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ChainArg {
    SharedSkip,
    AdjacentPosition,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Skip,
    Position,
    Value,
}

/// Which skips a run visits
#[derive(Debug, Clone)]
enum SkipSource {
    Range { min: usize, max: usize },
    Sequence(Vec<usize>),
}

enum Outcome {
    Hits(ElsSearchSummary),
    Chains(ChainSearchSummary),
}

#[tokio::main]
async fn main() -> ExitCode {
    // WHY: logs go to stderr so --json output on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let args = Args::parse();

    info!("Starting els-search");
    info!(?args, "Parsed CLI arguments");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ElsError>() {
            Some(els_err) if els_err.is_invalid_parameter() => {
                eprintln!("Rejected input: {els_err}");
                ExitCode::from(2)
            }
            _ => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(args: Args) -> Result<()> {
    if !args.file.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.file.display());
    }
    if args.target_value.is_some() && args.valuation.calculator().is_none() {
        return Err(ElsError::InvalidParameter {
            name: "target_value",
            reason: "filtering by value needs --valuation".to_string(),
        }
        .into());
    }
    // WHY: checked before any output, so a bad width never leaves a half-printed table
    if let Some(columns) = args.columns {
        project(0, columns)?;
    }

    let reader = DocumentReader::new(ReaderConfig {
        use_mmap: args.use_mmap,
        ..Default::default()
    });
    let (document, read_stats) = reader.read_document(&args.file).await?;
    info!("Loaded {} ({} bytes)", read_stats.file_path, read_stats.bytes_read);

    let normalizer = NormalizerConfig {
        case: match args.case {
            CaseArg::Preserve => CaseMode::Preserve,
            CaseArg::Lower => CaseMode::Lower,
        },
        fold_final_forms: args.fold_finals,
        ..Default::default()
    };
    let session = Arc::new(
        SearchSession::from_document(&document, normalizer).with_config(SearchConfig {
            parallel: true,
            threads: args.threads,
        }),
    );
    drop(document);

    // WHY: Ctrl-C stops scheduling new skip jobs; finished skips are still reported
    let token = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling search");
            token.cancel();
        }
    });

    let direction = Direction::from(args.direction);
    let source = skip_source(&args)?;
    // the search sets the bar length once it knows how many skip jobs survive pruning
    let progress = progress_bar(args.no_progress);

    let calculator = args.valuation.calculator();
    let chain = args.chain.map(|rule| ChainQuery {
        terms: args.terms.clone(),
        min_skip: args.min_skip,
        max_skip: args.max_skip,
        direction,
        rule: match rule {
            ChainArg::SharedSkip => LinkRule::SharedSkip,
            ChainArg::AdjacentPosition => LinkRule::AdjacentPosition,
        },
        options: ChainOptions {
            max_chain_length: args.max_chain_length,
            max_gap: args.max_gap,
        },
    });

    let search_session = Arc::clone(&session);
    let search_progress = progress.clone();
    let terms = args.terms.clone();
    let outcome = tokio::task::spawn_blocking(move || -> els_search::Result<Outcome> {
        let ctx = search_session.context().with_progress(&search_progress);
        let value_fn = calculator.map(|calc| move |text: &str| calc.value(text));
        let value_fn = value_fn.as_ref().map(|f| f as &dyn ValueFn);

        if let Some(query) = chain {
            let chains = search_chain(search_session.stripped(), &query, value_fn, &ctx)?;
            return Ok(Outcome::Chains(chains));
        }

        let terms: Vec<&str> = terms.iter().map(String::as_str).collect();
        let mut summary = match source {
            SkipSource::Range { min, max } => {
                search_terms(search_session.stripped(), &terms, min, max, direction, &ctx)?
            }
            SkipSource::Sequence(skips) => {
                search_sequence_terms(search_session.stripped(), &terms, &skips, direction, &ctx)?
            }
        };
        if let Some(value_fn) = value_fn {
            annotate_summary(&mut summary, value_fn);
        }
        Ok(Outcome::Hits(summary))
    })
    .await??;
    progress.finish_and_clear();

    match outcome {
        Outcome::Hits(summary) => report_hits(&args, summary).await,
        Outcome::Chains(chains) => report_chains(&args, chains).await,
    }
}

fn skip_source(args: &Args) -> els_search::Result<SkipSource> {
    if let Some(skips) = &args.skips {
        return Ok(SkipSource::Sequence(skips.clone()));
    }
    if let Some(kind) = args.sequence {
        let kind = match kind {
            SequenceArg::Primes => SequenceKind::Primes,
            SequenceArg::Fibonacci => SequenceKind::Fibonacci,
            SequenceArg::Squares => SequenceKind::Squares,
            SequenceArg::Triangular => SequenceKind::Triangular,
            SequenceArg::PowersOfTwo => SequenceKind::PowersOfTwo,
            SequenceArg::Arithmetic => SequenceKind::Arithmetic {
                start: args.sequence_start,
                step: args.sequence_step,
            },
        };
        return Ok(SkipSource::Sequence(generate(kind, args.sequence_len)?));
    }
    Ok(SkipSource::Range {
        min: args.min_skip,
        max: args.max_skip,
    })
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    // WHY: a bad template is a programming error, but it should never abort a search
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} skips {msg}",
    ) {
        bar.set_style(style.progress_chars("##-"));
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn report_hits(args: &Args, summary: ElsSearchSummary) -> Result<()> {
    let mut summary = match args.target_value {
        Some(target) => filter_by_value(&summary, target, args.tolerance),
        None => summary,
    };
    if let Some(sort) = args.sort {
        summary.sort_by(match sort {
            SortArg::Skip => SortKey::Skip,
            SortArg::Position => SortKey::Position,
            SortArg::Value => SortKey::Value,
        });
    }

    if args.json {
        println!("{}", summary_json(&summary)?);
    } else {
        println!("{}", tsv_header(args.columns));
        for (index, result) in summary.results.iter().enumerate() {
            println!("{}", tsv_line(index, result, summary.stripped(), args.columns)?);
        }
    }

    if args.grid {
        if let Some(first) = summary.results.first() {
            print_grid(summary.stripped(), first, &first.letter_positions, args.columns)?;
        }
    }

    if let Some(path) = &args.output {
        write_results_tsv(path, &summary).await?;
        info!("Wrote {} hits to {}", summary.total_hits, path.display());
    }
    if let Some(path) = &args.stats_out {
        RunStats::from_summary(&summary).write(path).await?;
        info!("Wrote run statistics to {}", path.display());
    }

    if summary.cancelled {
        eprintln!(
            "Search cancelled: {} hits from {} completed skip jobs",
            summary.total_hits, summary.skips_searched
        );
    }
    info!("Reported {} hits", summary.total_hits);
    Ok(())
}

async fn report_chains(args: &Args, chains: ChainSearchSummary) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&chains)?);
    } else {
        println!("{}", tsv_header(args.columns));
        let mut index = 0;
        for (chain_no, chain) in chains.chains.iter().enumerate() {
            println!(
                "# chain {}: {} members, letters {}..={}",
                chain_no,
                chain.len(),
                chain.total_span.0,
                chain.total_span.1
            );
            for member in &chain.members {
                println!("{}", tsv_line(index, member, chains.stripped(), args.columns)?);
                index += 1;
            }
        }
    }

    if args.grid {
        if let Some(chain) = chains.chains.first() {
            let highlight: Vec<usize> = chain
                .members
                .iter()
                .flat_map(|m| m.letter_positions.iter().copied())
                .collect();
            print_grid(chains.stripped(), &chain.members[0], &highlight, args.columns)?;
        }
    }

    if let Some(path) = &args.output {
        write_results_tsv(path, &chains.members_summary()).await?;
        info!("Wrote {} chained hits to {}", chains.total_hits, path.display());
    }
    if let Some(path) = &args.stats_out {
        RunStats::from_chain_summary(&chains).write(path).await?;
        info!("Wrote run statistics to {}", path.display());
    }

    if chains.cancelled {
        eprintln!("Search cancelled: chains were built from completed skip jobs only");
    }
    info!("Reported {} chains", chains.total_chains);
    Ok(())
}

fn tsv_header(columns: Option<usize>) -> String {
    match columns {
        Some(_) => format!("{TSV_HEADER}\tcoords"),
        None => TSV_HEADER.to_string(),
    }
}

fn tsv_line(index: usize, result: &ElsResult, stripped: &StrippedText, columns: Option<usize>) -> Result<String> {
    let line = format_result_line(index, result, stripped);
    let Some(columns) = columns else {
        return Ok(line);
    };
    let coords = result
        .row_col_coords(columns)?
        .iter()
        .map(|c| format!("{}:{}", c.row, c.col))
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("{line}\t{coords}"))
}

fn print_grid(stripped: &StrippedText, anchor: &ElsResult, highlight: &[usize], columns: Option<usize>) -> Result<()> {
    let width = columns.unwrap_or(anchor.skip.unsigned_abs() as usize);
    let view = GridView::new(stripped, width)?;
    let (first, last) = highlight
        .iter()
        .fold((usize::MAX, 0), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let rows = view.window(first, last, 2);

    println!();
    println!("grid: {} columns, rows {}..{}", view.columns(), rows.start, rows.end);
    for line in view.render(highlight, rows) {
        println!("{line}");
    }
    Ok(())
}
