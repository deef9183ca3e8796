//! # fedcorpus - Resumable Speech Corpus Builder
//!
//! This crate builds a text corpus from an archive of published speeches that is
//! organized by year-indexed listing pages. It discovers speech links on each year's
//! listing, extracts clean transcript text from every speech page, and appends the
//! results to a CSV ledger that makes interrupted runs resumable.
//!
//! ## Features
//!
//! - Layout-tolerant transcript extraction that drops footnotes and page boilerplate
//! - Date and speaker recovery from listing markup, with URL date fallback
//! - Append-only CSV ledger with a word-count threshold for reprocessing short rows
//! - Optional two-stage flow through a discovery-only index ledger
//! - Retrying HTTP fetches with exponential backoff, jitter and polite pacing
//!
//! ## Example
//!
//! ```rust,no_run
//! use fedcorpus::config::CorpusConfig;
//! use fedcorpus::crawler::{CrawlOrchestrator, HttpFetcher};
//! use fedcorpus::store::CorpusStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CorpusConfig::builder()
//!         .reprocess_word_count_threshold(150)
//!         .batch_size(20)
//!         .build();
//!
//!     let fetcher = HttpFetcher::new(&config.http)?;
//!     let mut store = CorpusStore::open(&config.corpus_path, 150)?;
//!     let orchestrator = CrawlOrchestrator::new(fetcher, config);
//!
//!     let summary = orchestrator.run(&mut store, None).await?;
//!     println!("{} rows written", summary.processed.rows_written);
//!     Ok(())
//! }
//! ```

mod error;

pub mod config;
pub mod crawler;
pub mod extractor;
pub mod record;
pub mod store;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::config::{CorpusConfig, DateMode};
    pub use crate::crawler::{CrawlOrchestrator, HttpFetcher};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::record::{IndexEntry, SpeechRecord};
    pub use crate::store::{CorpusStore, IndexLedger};
}
