//! # Corpus Store Module
//!
//! Persistent, append-only CSV ledgers that make a crawl resumable.
//!
//! ## Key Components
//!
//! - `CorpusStore`: the speech ledger, partitioned on load into satisfied URLs and URLs
//!   whose transcripts fell below the reprocessing threshold
//! - `IndexLedger`: the discovery-only ledger of the two-stage flow
//! - `reconcile`: reader-side collapse of the ledger to one record per URL
//!
//! Rows are never rewritten in place. Each append is a single buffered write followed
//! by a sync, and a row torn by an interrupted append is repaired the next time the
//! ledger is opened.

mod corpus;
mod error;
mod index;
mod ledger;

pub use corpus::{reconcile, CorpusStore, CORPUS_HEADER};
pub use error::StorageError;
pub use index::{IndexLedger, INDEX_HEADER};
