//! Error types for the crawler module

use crate::error::Error as CrateError;
use crate::store::StorageError;
use thiserror::Error;

/// Status codes worth another attempt
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Failure to fetch one page
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    /// Connection or protocol failure
    #[error("HTTP error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Every allowed attempt failed transiently
    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::Transport { source, .. } => source.is_connect(),
            FetchError::Status { status, .. } => TRANSIENT_STATUSES.contains(status),
            FetchError::RetriesExhausted { .. } => false,
        }
    }
}

/// A year's listing page could not be used; the year is skipped
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The listing page could not be fetched
    #[error("Listing for {year} unavailable: {source}")]
    Fetch {
        year: i32,
        #[source]
        source: FetchError,
    },

    /// The listing page URL is not absolute
    #[error("Listing for {year} has an invalid URL {url}: {source}")]
    InvalidUrl {
        year: i32,
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The page parsed but carries no links at all
    #[error("Listing for {year} at {url} has no anchors")]
    NotReady { year: i32, url: String },
}

/// Failure of a single candidate; the run moves on to the next one
#[derive(Debug, Error)]
pub enum ItemError {
    /// The document page could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The candidate cannot be processed at all
    #[error("Invalid candidate: {0}")]
    Validation(String),
}

/// Run-level error of the crawler
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Ledger could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Storage(e) => e.into(),
            CrawlError::Other(message) => CrateError::Other(message),
        }
    }
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        CrateError::Fetch(err.to_string())
    }
}

impl From<DiscoveryError> for CrateError {
    fn from(err: DiscoveryError) -> Self {
        CrateError::Discovery(err.to_string())
    }
}
