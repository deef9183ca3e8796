//! # fedcorpus CLI Application
//!
//! Command-line interface for building and maintaining the speech corpus.
//!
//! ## Subcommands
//!
//! - `run`: discover speeches and extract them into the corpus ledger
//! - `index`: discovery only, into the index ledger
//! - `extract`: extraction of every entry in an existing index ledger
//! - `stats`: ledger partition under the reprocessing threshold
//! - `reconcile`: one authoritative row per URL, written to a new file
//! - `extract-file`: run the transcript extractor on a saved page
//!
//! Settings come from an optional JSON config file; the shared flags override it.

mod telemetry;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use fedcorpus::config::{CorpusConfig, DateMode};
use fedcorpus::crawler::{CrawlOrchestrator, HttpFetcher, ProcessSummary, RunSummary};
use fedcorpus::extractor::extract_transcript;
use fedcorpus::store::{CorpusStore, IndexLedger};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about = "Build a resumable text corpus of published speeches", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover speeches and extract them into the corpus ledger
    Run(Overrides),

    /// Discover speeches into the index ledger without fetching them
    Index(Overrides),

    /// Extract every entry of the index ledger into the corpus ledger
    Extract(Overrides),

    /// Show how many ledger URLs meet the word-count threshold
    Stats(Overrides),

    /// Write one row per URL, keeping the longest transcript
    Reconcile(ReconcileArgs),

    /// Extract the transcript of a saved HTML page
    ExtractFile(ExtractFileArgs),
}

/// Settings shared by the ledger commands; each overrides the config file
#[derive(Args, Debug, Clone, Default)]
struct Overrides {
    /// First date of the discovery window (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last date of the discovery window (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Minimum word count of a complete transcript
    #[arg(short, long)]
    threshold: Option<usize>,

    /// Rows per durable append
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Corpus ledger path
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Index ledger path; enables the two-stage flow for `run`
    #[arg(short, long)]
    index: Option<PathBuf>,

    /// Keep candidates whose date cannot be determined
    #[arg(long)]
    lenient_dates: bool,
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    /// File to write the reconciled rows to
    #[arg(short, long, required = true)]
    output: PathBuf,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Args, Debug)]
struct ExtractFileArgs {
    /// Saved speech page
    #[arg(required = true)]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing_subscriber(cli.log_dir.as_deref())?;

    match cli.command {
        Some(Commands::Run(overrides)) => {
            let config = load_config(cli.config.as_ref(), &overrides).await?;
            run_command(config).await?;
        }
        Some(Commands::Index(overrides)) => {
            let config = load_config(cli.config.as_ref(), &overrides).await?;
            index_command(config).await?;
        }
        Some(Commands::Extract(overrides)) => {
            let config = load_config(cli.config.as_ref(), &overrides).await?;
            extract_command(config).await?;
        }
        Some(Commands::Stats(overrides)) => {
            let config = load_config(cli.config.as_ref(), &overrides).await?;
            stats_command(config)?;
        }
        Some(Commands::Reconcile(args)) => {
            let config = load_config(cli.config.as_ref(), &args.overrides).await?;
            reconcile_command(config, args.output)?;
        }
        Some(Commands::ExtractFile(args)) => {
            extract_file_command(args).await?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["fedcorpus", "--help"]);
        }
    }

    Ok(())
}

/// Read the config file, if any, then apply command-line overrides
async fn load_config(
    path: Option<&PathBuf>,
    overrides: &Overrides,
) -> anyhow::Result<CorpusConfig> {
    let mut config = match path {
        Some(path) => CorpusConfig::read_config(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CorpusConfig::default(),
    };

    if let Some(start_date) = overrides.start_date {
        config.start_date = start_date;
    }
    if let Some(end_date) = overrides.end_date {
        config.end_date = end_date;
    }
    if let Some(threshold) = overrides.threshold {
        config.reprocess_word_count_threshold = threshold;
    }
    if let Some(batch_size) = overrides.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(corpus) = &overrides.corpus {
        config.corpus_path = corpus.clone();
    }
    if let Some(index) = &overrides.index {
        config.index_path = Some(index.clone());
    }
    if overrides.lenient_dates {
        config.date_mode = DateMode::Lenient;
    }

    config.validate()?;
    Ok(config)
}

fn progress_bar() -> anyhow::Result<ProgressBar> {
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Extracting speeches...");
    Ok(progress_bar)
}

fn orchestrator(config: CorpusConfig) -> anyhow::Result<CrawlOrchestrator<HttpFetcher>> {
    let fetcher = HttpFetcher::new(&config.http)?;
    Ok(CrawlOrchestrator::new(fetcher, config).with_progress(progress_bar()?))
}

fn required_index(config: &CorpusConfig) -> anyhow::Result<PathBuf> {
    config
        .index_path
        .clone()
        .ok_or_else(|| anyhow!("An index ledger is required: pass --index or set index_path"))
}

#[instrument(skip_all)]
async fn run_command(config: CorpusConfig) -> anyhow::Result<()> {
    info!(
        "Crawling {} to {} into {}",
        config.start_date,
        config.end_date,
        config.corpus_path.display()
    );

    let start_time = std::time::Instant::now();
    let mut store = CorpusStore::open(&config.corpus_path, config.reprocess_word_count_threshold)?;
    let mut index = match &config.index_path {
        Some(path) => Some(IndexLedger::open(path)?),
        None => None,
    };

    let summary = orchestrator(config)?
        .run(&mut store, index.as_mut())
        .await?;

    print_run_summary(&summary);
    println!("Finished in {:.2?}", start_time.elapsed());
    Ok(())
}

#[instrument(skip_all)]
async fn index_command(config: CorpusConfig) -> anyhow::Result<()> {
    let mut ledger = IndexLedger::open(required_index(&config)?)?;
    let before = ledger.len();

    let report = orchestrator(config)?.index(&mut ledger).await?;

    println!("Years indexed: {}", report.years_indexed);
    println!("Years failed: {}", report.years_failed);
    println!("New entries: {}", ledger.len() - before);
    println!("Total entries: {}", ledger.len());
    Ok(())
}

#[instrument(skip_all)]
async fn extract_command(config: CorpusConfig) -> anyhow::Result<()> {
    let ledger = IndexLedger::open(required_index(&config)?)?;
    if ledger.is_empty() {
        println!("Index ledger {} has no entries", ledger.path().display());
        return Ok(());
    }

    let mut store = CorpusStore::open(&config.corpus_path, config.reprocess_word_count_threshold)?;
    let summary = orchestrator(config)?
        .extract(ledger.entries(), &mut store)
        .await?;

    print_process_summary(&summary);
    Ok(())
}

fn stats_command(config: CorpusConfig) -> anyhow::Result<()> {
    let store = CorpusStore::open(&config.corpus_path, config.reprocess_word_count_threshold)?;

    println!("Ledger: {}", store.path().display());
    println!("Rows: {}", store.row_count());
    println!(
        "URLs at or above {} words: {}",
        store.threshold(),
        store.satisfied_count()
    );
    println!("URLs below threshold: {}", store.insufficient_count());

    if let Some(path) = &config.index_path {
        let ledger = IndexLedger::open(path)?;
        let pending = ledger
            .entries()
            .iter()
            .filter(|entry| !store.contains(&entry.url))
            .count();
        println!("Index entries: {} ({} pending)", ledger.len(), pending);
    }
    Ok(())
}

fn reconcile_command(config: CorpusConfig, output: PathBuf) -> anyhow::Result<()> {
    let store = CorpusStore::open(&config.corpus_path, config.reprocess_word_count_threshold)?;
    let written = store.export_reconciled(&output)?;
    println!(
        "Wrote {} of {} rows to {}",
        written,
        store.row_count(),
        output.display()
    );
    Ok(())
}

async fn extract_file_command(args: ExtractFileArgs) -> anyhow::Result<()> {
    let html = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let transcript = extract_transcript(&html);

    println!("{}", transcript.text);
    println!();
    println!("Word count: {}", transcript.word_count);
    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    println!("Years indexed: {}", summary.years_indexed);
    println!("Years failed: {}", summary.years_failed);
    println!("Candidates discovered: {}", summary.candidates_discovered);
    print_process_summary(&summary.processed);
}

fn print_process_summary(summary: &ProcessSummary) {
    println!("Skipped (already complete): {}", summary.skipped_satisfied);
    println!("Attempted: {}", summary.attempted);
    println!("Rows written: {}", summary.rows_written);
    println!("Rows below threshold: {}", summary.below_threshold);
    println!("Failures: {}", summary.failures.len());
}
