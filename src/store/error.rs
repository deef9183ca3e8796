//! Error types for the store module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for ledger operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<StorageError> for CrateError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => CrateError::Io(e),
            StorageError::Csv(e) => CrateError::Storage(e.to_string()),
        }
    }
}
