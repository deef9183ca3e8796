use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use super::ledger::{append_rows, read_rows, repair_torn_tail};
use super::StorageError;
use crate::record::IndexEntry;

/// Column order of the discovery-only index ledger
pub const INDEX_HEADER: [&str; 4] = ["date", "title", "speaker", "url"];

/// Append-only ledger of discovered listing entries, used by the two-stage flow
#[derive(Debug)]
pub struct IndexLedger {
    path: PathBuf,
    entries: Vec<IndexEntry>,
    urls: HashSet<String>,
}

impl IndexLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        repair_torn_tail(&path)?;

        let mut ledger = Self {
            path,
            entries: Vec::new(),
            urls: HashSet::new(),
        };
        let rows: Vec<IndexEntry> = read_rows(&ledger.path)?;
        for entry in rows {
            ledger.remember(entry);
        }

        info!(
            "Loaded {} index entries from {}",
            ledger.entries.len(),
            ledger.path.display()
        );
        Ok(ledger)
    }

    fn remember(&mut self, entry: IndexEntry) {
        if entry.url.is_empty() || !self.urls.insert(entry.url.clone()) {
            return;
        }
        self.entries.push(entry);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URLs already indexed, for seeding discovery
    pub fn seen_urls(&self) -> HashSet<String> {
        self.urls.clone()
    }

    /// Indexed entries in discovery order, one per URL
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append entries whose URL is not yet indexed; returns how many were written
    pub fn append(&mut self, entries: &[IndexEntry]) -> Result<usize, StorageError> {
        let mut batch_urls = HashSet::new();
        let fresh: Vec<IndexEntry> = entries
            .iter()
            .filter(|entry| {
                !entry.url.is_empty()
                    && !self.urls.contains(&entry.url)
                    && batch_urls.insert(entry.url.as_str())
            })
            .cloned()
            .collect();

        let written = append_rows(&self.path, &INDEX_HEADER, &fresh)?;
        for entry in fresh {
            self.remember(entry);
        }
        Ok(written)
    }
}
