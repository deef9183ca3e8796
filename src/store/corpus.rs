use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::ledger::{append_rows, read_rows, repair_torn_tail, write_rows};
use super::StorageError;
use crate::record::SpeechRecord;

/// Column order of the corpus ledger
pub const CORPUS_HEADER: [&str; 6] = ["date", "title", "speaker", "url", "word_count", "text"];

/// Loosely typed corpus row, so one bad cell never hides the rest of the ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CorpusRow {
    #[serde(default)]
    date: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    speaker: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    word_count: String,
    #[serde(default)]
    text: String,
}

impl CorpusRow {
    fn word_count(&self) -> usize {
        self.word_count.trim().parse().unwrap_or(0)
    }

    fn into_record(self) -> SpeechRecord {
        let word_count = self.word_count();
        SpeechRecord {
            date: NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok(),
            title: self.title,
            speaker: self.speaker,
            url: self.url,
            word_count,
            text: self.text,
        }
    }
}

/// Resumable, append-only ledger of extracted speeches
///
/// On open the existing rows are partitioned into *satisfied* URLs, which have at
/// least one row meeting the word-count threshold, and *insufficient* URLs, whose every
/// row falls short and which are therefore fetched again. Appends only ever add rows at
/// the end of the file.
#[derive(Debug)]
pub struct CorpusStore {
    path: PathBuf,
    threshold: usize,
    satisfied: HashSet<String>,
    insufficient: HashSet<String>,
    rows: usize,
}

impl CorpusStore {
    /// Open (or prepare to create) the ledger at `path`
    pub fn open(path: impl AsRef<Path>, threshold: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        repair_torn_tail(&path)?;

        let mut store = Self {
            path,
            threshold,
            satisfied: HashSet::new(),
            insufficient: HashSet::new(),
            rows: 0,
        };

        let rows: Vec<CorpusRow> = read_rows(&store.path)?;
        for row in &rows {
            store.observe(row.url.trim(), row.word_count());
        }

        info!(
            "Loaded {} rows from {}: {} satisfied, {} below threshold {}",
            store.rows,
            store.path.display(),
            store.satisfied.len(),
            store.insufficient.len(),
            threshold
        );
        Ok(store)
    }

    fn observe(&mut self, url: &str, word_count: usize) {
        if url.is_empty() {
            return;
        }
        self.rows += 1;
        if word_count >= self.threshold {
            self.insufficient.remove(url);
            self.satisfied.insert(url.to_string());
        } else if !self.satisfied.contains(url) {
            self.insufficient.insert(url.to_string());
        }
    }

    /// Whether `url` already has a row meeting the threshold
    pub fn contains(&self, url: &str) -> bool {
        self.satisfied.contains(url)
    }

    /// Whether `url` is known but only with rows below the threshold
    pub fn is_insufficient(&self, url: &str) -> bool {
        self.insufficient.contains(url)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn satisfied_count(&self) -> usize {
        self.satisfied.len()
    }

    pub fn insufficient_count(&self) -> usize {
        self.insufficient.len()
    }

    /// Number of rows with a URL in the ledger
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Durably append a batch of records and fold them into the partition
    pub fn append(&mut self, batch: &[SpeechRecord]) -> Result<usize, StorageError> {
        let written = append_rows(&self.path, &CORPUS_HEADER, batch)?;
        for record in batch {
            self.observe(&record.url, record.word_count);
        }
        debug!("Appended {} rows to {}", written, self.path.display());
        Ok(written)
    }

    /// Every row of the ledger in file order, including superseded ones
    pub fn read_records(&self) -> Result<Vec<SpeechRecord>, StorageError> {
        let rows: Vec<CorpusRow> = read_rows(&self.path)?;
        Ok(rows
            .into_iter()
            .filter(|row| !row.url.trim().is_empty())
            .map(CorpusRow::into_record)
            .collect())
    }

    /// Write the reconciled view of this ledger to `output`
    pub fn export_reconciled(&self, output: impl AsRef<Path>) -> Result<usize, StorageError> {
        let records = reconcile(self.read_records()?);
        write_rows(output.as_ref(), &CORPUS_HEADER, &records)
    }
}

/// Collapse ledger rows to one authoritative record per URL
///
/// The record with the highest word count wins; among equal counts the later row wins.
/// URLs keep the order in which they first appear.
pub fn reconcile(records: impl IntoIterator<Item = SpeechRecord>) -> Vec<SpeechRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut best: Vec<SpeechRecord> = Vec::new();

    for record in records {
        match slots.get(&record.url) {
            Some(&slot) => {
                if record.word_count >= best[slot].word_count {
                    best[slot] = record;
                }
            }
            None => {
                slots.insert(record.url.clone(), best.len());
                best.push(record);
            }
        }
    }
    best
}
