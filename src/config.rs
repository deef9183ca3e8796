//! # Run Configuration Module
//!
//! This module provides the configuration of a corpus run: the discovery date window,
//! the reprocessing threshold, checkpoint batch size, the archive's URL conventions,
//! output ledgers, and HTTP politeness settings. It uses a builder pattern for
//! programmatic configuration and can be read from a JSON file.
//!
//! ## Key Components
//!
//! - `CorpusConfig`: The complete run configuration
//! - `CorpusConfigBuilder`: Builder pattern implementation for easier configuration
//! - `HttpConfig`: Timeout, retry and user-agent settings of the fetcher
//! - `DelayRange`: Randomized pacing between requests
//!
//! Every field has a default, so a configuration file only needs the options it
//! changes.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// First year the archive publishes listing pages for
pub const ARCHIVE_FIRST_YEAR: i32 = 1996;

/// How candidates without a derivable date are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    /// Drop candidates without a valid date
    #[default]
    Strict,

    /// Keep them with an empty date
    Lenient,
}

/// Inclusive range of milliseconds to sleep between consecutive requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No pacing at all
    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    /// Pick a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        use rand::Rng;

        let (low, high) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        if low == high {
            return Duration::from_millis(low);
        }
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }
}

/// HTTP settings shared by listing and document fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt on transient failures
    pub max_retries: u32,

    /// Base of the exponential backoff in milliseconds
    pub backoff_factor_ms: u64,

    /// Upper bound of a single backoff sleep in seconds
    pub max_backoff_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
            max_retries: 5,
            backoff_factor_ms: 500,
            max_backoff_secs: 60,
        }
    }
}

impl HttpConfig {
    /// Get the timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration of a corpus run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// First date of the discovery window (inclusive)
    pub start_date: NaiveDate,

    /// Last date of the discovery window (inclusive)
    pub end_date: NaiveDate,

    /// Newest listing year to index, defaults to the year of `end_date`
    pub newest_year: Option<i32>,

    /// Oldest listing year to index, defaults to the year of `start_date`
    pub oldest_year: Option<i32>,

    /// Minimum word count for a ledger row to count as complete
    pub reprocess_word_count_threshold: usize,

    /// Rows per durable append
    pub batch_size: usize,

    /// Scheme and host of the archive
    pub base_url: String,

    /// Path of a year's listing page, `{year}` is substituted
    pub year_url_template: String,

    /// Path prefix shared by all speech pages
    pub speech_path_prefix: String,

    /// Treatment of candidates without a date
    pub date_mode: DateMode,

    /// Corpus ledger (`date,title,speaker,url,word_count,text`)
    pub corpus_path: PathBuf,

    /// Discovery-only ledger (`date,title,speaker,url`); enables the two-stage flow
    pub index_path: Option<PathBuf>,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Pacing between document fetches
    pub fetch_delay_ms: DelayRange,

    /// Pacing between listing pages
    pub listing_delay_ms: DelayRange,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        let today = Local::now().date_naive();
        let start_year = today.year() - 8;
        Self {
            start_date: NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap_or(today),
            end_date: today,
            newest_year: None,
            oldest_year: None,
            reprocess_word_count_threshold: 150,
            batch_size: 20,
            base_url: "https://www.federalreserve.gov".to_string(),
            year_url_template: "/newsevents/speech/{year}-speeches.htm".to_string(),
            speech_path_prefix: "/newsevents/speech/".to_string(),
            date_mode: DateMode::Strict,
            corpus_path: PathBuf::from("fed_speeches_full.csv"),
            index_path: None,
            http: HttpConfig::default(),
            fetch_delay_ms: DelayRange::new(150, 450),
            listing_delay_ms: DelayRange::new(600, 1200),
        }
    }
}

impl CorpusConfig {
    /// Create a new builder
    pub fn builder() -> CorpusConfigBuilder {
        CorpusConfigBuilder::new()
    }

    /// Read a configuration from a JSON file; missing fields take their defaults
    pub async fn read_config(path: impl AsRef<Path>) -> Result<Self> {
        let config = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&config)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no run could satisfy
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(Error::Config(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if !self.year_url_template.contains("{year}") {
            return Err(Error::Config(
                "year_url_template must contain {year}".to_string(),
            ));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base_url {}: {}", self.base_url, e)))?;
        Ok(())
    }

    /// Listing years to index, newest first
    pub fn years(&self) -> Vec<i32> {
        let newest = self.newest_year.unwrap_or(self.end_date.year());
        let oldest = self
            .oldest_year
            .unwrap_or(self.start_date.year())
            .max(ARCHIVE_FIRST_YEAR);
        (oldest..=newest).rev().collect()
    }

    /// Absolute URL of a year's listing page
    pub fn year_url(&self, year: i32) -> String {
        let path = self.year_url_template.replace("{year}", &year.to_string());
        if path.starts_with("http://") || path.starts_with("https://") {
            path
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    /// The discovery window as a range
    pub fn window(&self) -> RangeInclusive<NaiveDate> {
        self.start_date..=self.end_date
    }
}

/// Builder for CorpusConfig
#[derive(Debug, Default)]
pub struct CorpusConfigBuilder {
    config: CorpusConfig,
}

impl CorpusConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CorpusConfig::default(),
        }
    }

    /// Set the first date of the discovery window
    pub fn start_date(mut self, start_date: NaiveDate) -> Self {
        self.config.start_date = start_date;
        self
    }

    /// Set the last date of the discovery window
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.config.end_date = end_date;
        self
    }

    /// Override the listing years to index
    pub fn years(mut self, newest: i32, oldest: i32) -> Self {
        self.config.newest_year = Some(newest);
        self.config.oldest_year = Some(oldest);
        self
    }

    /// Set the reprocessing threshold
    pub fn reprocess_word_count_threshold(mut self, threshold: usize) -> Self {
        self.config.reprocess_word_count_threshold = threshold;
        self
    }

    /// Set the number of rows per durable append
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set the archive's scheme and host
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the listing path template
    pub fn year_url_template(mut self, template: impl Into<String>) -> Self {
        self.config.year_url_template = template.into();
        self
    }

    /// Set the path prefix of speech pages
    pub fn speech_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.speech_path_prefix = prefix.into();
        self
    }

    /// Set the treatment of undated candidates
    pub fn date_mode(mut self, date_mode: DateMode) -> Self {
        self.config.date_mode = date_mode;
        self
    }

    /// Set the corpus ledger path
    pub fn corpus_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.corpus_path = path.into();
        self
    }

    /// Set the index ledger path, enabling the two-stage flow
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = Some(path.into());
        self
    }

    /// Set the HTTP settings
    pub fn http(mut self, http: HttpConfig) -> Self {
        self.config.http = http;
        self
    }

    /// Set the pacing between document fetches
    pub fn fetch_delay(mut self, delay: DelayRange) -> Self {
        self.config.fetch_delay_ms = delay;
        self
    }

    /// Set the pacing between listing pages
    pub fn listing_delay(mut self, delay: DelayRange) -> Self {
        self.config.listing_delay_ms = delay;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CorpusConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = CorpusConfig::default();
        assert_eq!(config.reprocess_word_count_threshold, 150);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.start_date.year(), config.end_date.year() - 8);
        assert_eq!(config.start_date.ordinal(), 1);
        assert_eq!(config.date_mode, DateMode::Strict);
        assert!(config.index_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_years_are_descending() {
        let config = CorpusConfig::builder()
            .start_date(date(2019, 1, 1))
            .end_date(date(2023, 6, 30))
            .build();
        assert_eq!(config.years(), vec![2023, 2022, 2021, 2020, 2019]);

        let config = CorpusConfig::builder()
            .start_date(date(1990, 1, 1))
            .end_date(date(1997, 1, 1))
            .build();
        assert_eq!(config.years(), vec![1997, 1996]);

        let config = CorpusConfig::builder().years(2024, 2022).build();
        assert_eq!(config.years(), vec![2024, 2023, 2022]);
    }

    #[test]
    fn test_year_url() {
        let config = CorpusConfig::builder()
            .base_url("https://www.federalreserve.gov/")
            .build();
        assert_eq!(
            config.year_url(2023),
            "https://www.federalreserve.gov/newsevents/speech/2023-speeches.htm"
        );

        let config = CorpusConfig::builder()
            .year_url_template("http://mirror.test/{year}.htm")
            .build();
        assert_eq!(config.year_url(2001), "http://mirror.test/2001.htm");
    }

    #[test]
    fn test_validation() {
        let config = CorpusConfig::builder()
            .start_date(date(2024, 1, 1))
            .end_date(date(2023, 1, 1))
            .build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = CorpusConfig::builder().batch_size(0).build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = CorpusConfig::builder().year_url_template("/speeches.htm").build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = CorpusConfig::builder().base_url("not a url").build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_window_is_inclusive() {
        let config = CorpusConfig::builder()
            .start_date(date(2011, 1, 1))
            .end_date(date(2011, 12, 31))
            .build();
        assert!(config.window().contains(&date(2011, 1, 1)));
        assert!(config.window().contains(&date(2011, 12, 31)));
        assert!(!config.window().contains(&date(2010, 12, 31)));
    }

    #[test]
    fn test_delay_range_sample() {
        assert_eq!(DelayRange::none().sample(), Duration::ZERO);
        let range = DelayRange::new(10, 20);
        for _ in 0..20 {
            let delay = range.sample();
            assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(20));
        }
        assert_eq!(DelayRange::new(30, 30).sample(), Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_read_config_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        tokio::fs::write(
            &path,
            r#"{
                "start_date": "2011-01-01",
                "end_date": "2012-12-31",
                "reprocess_word_count_threshold": 300,
                "date_mode": "lenient",
                "index_path": "fed_index.csv",
                "http": { "max_retries": 2 }
            }"#,
        )
        .await
        .unwrap();

        let config = CorpusConfig::read_config(&path).await.unwrap();
        assert_eq!(config.start_date, date(2011, 1, 1));
        assert_eq!(config.reprocess_word_count_threshold, 300);
        assert_eq!(config.date_mode, DateMode::Lenient);
        assert_eq!(config.index_path, Some(PathBuf::from("fed_index.csv")));
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.batch_size, 20);
    }

    #[tokio::test]
    async fn test_read_config_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        tokio::fs::write(&path, r#"{ "batch_size": 0 }"#).await.unwrap();
        assert!(CorpusConfig::read_config(&path).await.is_err());
    }
}
