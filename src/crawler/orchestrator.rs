//! Sequential crawl: discover, skip what is done, fetch, extract, persist in batches

use indicatif::ProgressBar;
use std::collections::HashSet;
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use url::Url;

use crate::config::CorpusConfig;
use crate::crawler::discovery::{DiscoveryReport, YearIndexDiscoverer};
use crate::crawler::error::{CrawlError, ItemError};
use crate::crawler::http::{DocumentSource, ListingSource};
use crate::extractor::extract_transcript;
use crate::record::{IndexEntry, SpeechRecord};
use crate::store::{CorpusStore, IndexLedger};

/// A candidate that could not be turned into a record
#[derive(Debug)]
pub struct ItemFailure {
    pub url: String,
    pub error: ItemError,
}

/// Counters of one extraction stage
#[derive(Debug, Default)]
pub struct ProcessSummary {
    /// Entries skipped because the ledger already holds a complete record
    pub skipped_satisfied: usize,

    /// Entries skipped because their URL was already attempted in this run
    pub skipped_duplicate: usize,

    /// Documents fetched or attempted
    pub attempted: usize,

    /// Rows appended to the corpus ledger
    pub rows_written: usize,

    /// Appended rows whose word count is below the reprocessing threshold
    pub below_threshold: usize,

    /// Per-candidate failures, in processing order
    pub failures: Vec<ItemFailure>,
}

/// Counters of a full run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub years_indexed: usize,
    pub years_failed: usize,
    pub candidates_discovered: usize,
    pub processed: ProcessSummary,
}

/// Drives discovery and extraction against a fetch source and the ledgers
///
/// Work is strictly sequential: one listing or document request is in flight at a
/// time, with randomized pauses between requests. Item failures are collected in the
/// summary; only a ledger write failure ends the run early.
pub struct CrawlOrchestrator<S> {
    source: S,
    config: CorpusConfig,
    progress: ProgressBar,
}

impl<S> CrawlOrchestrator<S>
where
    S: ListingSource + DocumentSource,
{
    pub fn new(source: S, config: CorpusConfig) -> Self {
        Self {
            source,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report extraction progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Discover candidates across the configured years without persisting them
    pub async fn discover(&self, seen: &mut HashSet<String>) -> DiscoveryReport {
        YearIndexDiscoverer::new(&self.source, &self.config)
            .discover(seen)
            .await
    }

    /// Discover candidates into the index ledger, one year at a time
    ///
    /// URLs already in the ledger are not emitted again, so repeated runs only add
    /// newly published entries.
    #[instrument(skip_all, fields(index = %ledger.path().display()))]
    pub async fn index(&self, ledger: &mut IndexLedger) -> Result<DiscoveryReport, CrawlError> {
        let mut seen = ledger.seen_urls();
        let discoverer = YearIndexDiscoverer::new(&self.source, &self.config);

        discoverer
            .discover_with(&mut seen, |year, candidates| {
                let entries: Vec<IndexEntry> =
                    candidates.iter().cloned().map(IndexEntry::from).collect();
                let written = ledger.append(&entries)?;
                info!("Indexed {} new entries for {}", written, year);
                Ok::<(), CrawlError>(())
            })
            .await
    }

    /// Fetch and extract every entry the corpus ledger does not already satisfy
    #[instrument(skip_all, fields(corpus = %store.path().display()))]
    pub async fn extract(
        &self,
        entries: &[IndexEntry],
        store: &mut CorpusStore,
    ) -> Result<ProcessSummary, CrawlError> {
        let batch_size = self.config.batch_size.max(1);
        let threshold = store.threshold();
        let mut summary = ProcessSummary::default();
        let mut attempted = HashSet::new();
        let mut buffer: Vec<SpeechRecord> = Vec::with_capacity(batch_size);

        self.progress.set_length(entries.len() as u64);

        for entry in entries {
            self.progress.inc(1);

            if store.contains(&entry.url) {
                debug!("Skipping satisfied {}", entry.url);
                summary.skipped_satisfied += 1;
                continue;
            }
            if !attempted.insert(entry.url.clone()) {
                summary.skipped_duplicate += 1;
                continue;
            }

            if summary.attempted > 0 {
                tokio::time::sleep(self.config.fetch_delay_ms.sample()).await;
            }
            summary.attempted += 1;
            self.progress.set_message(entry.url.clone());

            let span = info_span!("process_speech", url = %entry.url);
            match self.process_one(entry).instrument(span).await {
                Ok(record) => {
                    if !record.is_complete(threshold) {
                        summary.below_threshold += 1;
                    }
                    buffer.push(record);
                    if buffer.len() >= batch_size {
                        summary.rows_written += flush(store, &mut buffer)?;
                    }
                }
                Err(error) => {
                    warn!("Failed to process {}: {}", entry.url, error);
                    summary.failures.push(ItemFailure {
                        url: entry.url.clone(),
                        error,
                    });
                }
            }
        }

        summary.rows_written += flush(store, &mut buffer)?;
        self.progress.finish_with_message("Extraction finished");

        info!(
            "Extraction done: {} attempted, {} written ({} below threshold), {} skipped, {} failed",
            summary.attempted,
            summary.rows_written,
            summary.below_threshold,
            summary.skipped_satisfied,
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Discover and extract in one pass
    ///
    /// With an index ledger the run is two-staged: discovery appends to the ledger and
    /// extraction then covers every entry it holds, including ones indexed by earlier
    /// runs.
    pub async fn run(
        &self,
        store: &mut CorpusStore,
        index: Option<&mut IndexLedger>,
    ) -> Result<RunSummary, CrawlError> {
        let (report, entries) = match index {
            Some(ledger) => {
                let report = self.index(ledger).await?;
                (report, ledger.entries().to_vec())
            }
            None => {
                let mut seen = HashSet::new();
                let report = self.discover(&mut seen).await;
                let entries = report
                    .candidates
                    .iter()
                    .cloned()
                    .map(IndexEntry::from)
                    .collect::<Vec<_>>();
                (report, entries)
            }
        };

        let processed = self.extract(&entries, store).await?;
        Ok(RunSummary {
            years_indexed: report.years_indexed,
            years_failed: report.years_failed,
            candidates_discovered: report.candidates.len(),
            processed,
        })
    }

    async fn process_one(&self, entry: &IndexEntry) -> Result<SpeechRecord, ItemError> {
        if entry.url.trim().is_empty() {
            return Err(ItemError::Validation("entry has no URL".to_string()));
        }
        Url::parse(&entry.url)
            .map_err(|e| ItemError::Validation(format!("{}: {}", entry.url, e)))?;

        let html = self.source.fetch_document(&entry.url).await?;
        let transcript = extract_transcript(&html);
        if transcript.is_empty() {
            warn!("No transcript text found at {}", entry.url);
        }
        debug!("Extracted {} words", transcript.word_count);

        Ok(SpeechRecord::from_entry(entry, transcript))
    }
}

fn flush(store: &mut CorpusStore, buffer: &mut Vec<SpeechRecord>) -> Result<usize, CrawlError> {
    if buffer.is_empty() {
        return Ok(0);
    }
    let written = store.append(buffer)?;
    info!("Flushed {} rows to {}", written, store.path().display());
    buffer.clear();
    Ok(written)
}
