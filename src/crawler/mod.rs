//! # Speech Archive Crawler Module
//!
//! This module walks the archive's year listing pages, picks out links to individual
//! speeches, and feeds them through extraction into the corpus ledger.
//!
//! ## Key Components
//!
//! - `HttpFetcher`: reqwest client with bounded timeouts and retrying backoff
//! - `ListingSource` / `DocumentSource`: the fetch capabilities the crawl is written
//!   against, so tests can serve canned pages
//! - `YearIndexDiscoverer`: turns listing pages into dated, attributed candidates
//! - `CrawlOrchestrator`: the sequential discover, fetch, extract, persist loop
//!
//! ## Failure handling
//!
//! A year whose listing cannot be fetched is skipped, a speech that cannot be fetched
//! is recorded as a failure in the run summary, and neither stops the crawl. Only a
//! failure to write the ledger aborts, since progress could no longer be saved.

mod discovery;
mod error;
mod http;
mod orchestrator;

pub use discovery::{
    candidates_from_listing, date_from_text, date_from_url, nearest_container,
    speaker_from_text, CandidateAnchor, DiscoveryReport, SpeechUrlPattern, YearIndexDiscoverer,
};
pub use error::{CrawlError, DiscoveryError, FetchError, ItemError, TRANSIENT_STATUSES};
pub use http::{DocumentSource, HttpFetcher, ListingPage, ListingSource};
pub use orchestrator::{CrawlOrchestrator, ItemFailure, ProcessSummary, RunSummary};
