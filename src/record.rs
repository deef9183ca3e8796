//! Records produced and persisted by the pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One extracted speech, as written to the corpus ledger
///
/// `url` is the logical key. `word_count` always equals the token count of `text`
/// at the moment the record is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRecord {
    /// Date of the speech, when one could be derived
    pub date: Option<NaiveDate>,

    /// Title from the listing page
    pub title: String,

    /// Speaker line from the listing page, possibly empty
    pub speaker: String,

    /// Absolute URL of the speech page
    pub url: String,

    /// Number of word tokens in `text`
    pub word_count: usize,

    /// Normalized transcript text
    pub text: String,
}

/// A validated listing entry, as written to the discovery-only index ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub date: Option<NaiveDate>,
    pub title: String,
    pub speaker: String,
    pub url: String,
}

impl SpeechRecord {
    /// Build a record for `entry` from an extracted transcript
    pub fn from_entry(entry: &IndexEntry, transcript: crate::extractor::Transcript) -> Self {
        Self {
            date: entry.date,
            title: entry.title.clone(),
            speaker: entry.speaker.clone(),
            url: entry.url.clone(),
            word_count: transcript.word_count,
            text: transcript.text,
        }
    }

    /// Whether this record meets the given word-count threshold
    pub fn is_complete(&self, threshold: usize) -> bool {
        self.word_count >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Transcript;

    #[test]
    fn test_record_from_entry() {
        let entry = IndexEntry {
            date: NaiveDate::from_ymd_opt(2023, 3, 15),
            title: "Opening Remarks".to_string(),
            speaker: "Chair Jerome H. Powell".to_string(),
            url: "https://www.federalreserve.gov/newsevents/speech/powell20230315a.htm"
                .to_string(),
        };
        let transcript = Transcript {
            text: "Thank you all for coming".to_string(),
            word_count: 5,
        };

        let record = SpeechRecord::from_entry(&entry, transcript);
        assert_eq!(record.url, entry.url);
        assert_eq!(record.date, entry.date);
        assert_eq!(record.word_count, 5);
        assert!(record.is_complete(5));
        assert!(!record.is_complete(6));
    }
}
