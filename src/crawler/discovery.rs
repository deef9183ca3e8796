//! Discovery of speech pages from the year-indexed listing pages

use chrono::NaiveDate;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::convert::Infallible;
use std::ops::RangeInclusive;
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{CorpusConfig, DateMode};
use crate::crawler::error::DiscoveryError;
use crate::crawler::http::{ListingPage, ListingSource};
use crate::extractor::{DocumentTree, HtmlTree};
use crate::record::IndexEntry;

static TEXT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("date pattern must compile")
});

static URL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{4})(\d{2})(\d{2})[a-z]?\.htm$").expect("url date pattern must compile")
});

/// Words that mark a line as naming the speaker's office
const TITLE_KEYWORDS: &[&str] = &["Chair", "Governor", "President", "Vice Chair"];

/// A link from a listing page believed to reference a speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAnchor {
    /// Absolute URL, fragment removed
    pub href: String,

    /// Rendered text of the nearest meaningful container
    pub container_text: String,

    pub date: Option<NaiveDate>,
    pub speaker: String,
    pub title: String,
}

impl From<CandidateAnchor> for IndexEntry {
    fn from(candidate: CandidateAnchor) -> Self {
        IndexEntry {
            date: candidate.date,
            title: candidate.title,
            speaker: candidate.speaker,
            url: candidate.href,
        }
    }
}

/// Outcome of a discovery pass over several years
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Candidates in listing order, newest year first
    pub candidates: Vec<CandidateAnchor>,

    /// Years whose listing was processed
    pub years_indexed: usize,

    /// Years skipped because their listing was unusable
    pub years_failed: usize,
}

/// Shape of a speech page path: prefix, slug, 8-digit date, optional letter, `.htm`
#[derive(Debug, Clone)]
pub struct SpeechUrlPattern {
    regex: Regex,
}

impl SpeechUrlPattern {
    pub fn new(prefix: &str) -> Self {
        let pattern = format!(r"(?i)^{}[a-z0-9-]*\d{{8}}[a-z]?\.htm$", regex::escape(prefix));
        Self {
            regex: Regex::new(&pattern).expect("escaped prefix must compile"),
        }
    }

    /// Test a URL path such as `/newsevents/speech/powell20230315a.htm`
    pub fn matches_path(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Walks listing pages year by year and collects candidate speeches
pub struct YearIndexDiscoverer<'a, S> {
    source: &'a S,
    config: &'a CorpusConfig,
    pattern: SpeechUrlPattern,
}

impl<'a, S: ListingSource> YearIndexDiscoverer<'a, S> {
    pub fn new(source: &'a S, config: &'a CorpusConfig) -> Self {
        Self {
            source,
            config,
            pattern: SpeechUrlPattern::new(&config.speech_path_prefix),
        }
    }

    /// Discover candidates for one listing year
    ///
    /// URLs are added to `seen` whether or not the candidate is kept.
    #[instrument(skip(self, seen))]
    pub async fn discover_year(
        &self,
        year: i32,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<CandidateAnchor>, DiscoveryError> {
        let url = self.config.year_url(year);
        info!("Indexing {} listing {}", year, url);

        let page = self
            .source
            .fetch_listing(&url)
            .await
            .map_err(|source| DiscoveryError::Fetch { year, source })?;

        let candidates = candidates_from_listing(
            year,
            &page,
            &self.pattern,
            &self.config.window(),
            self.config.date_mode,
            seen,
        )?;
        info!("{}: +{} new links", year, candidates.len());
        Ok(candidates)
    }

    /// Discover candidates across all configured years, newest first
    pub async fn discover(&self, seen: &mut HashSet<String>) -> DiscoveryReport {
        match self
            .discover_with(seen, |_, _| Ok::<(), Infallible>(()))
            .await
        {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    /// Discover across all configured years, handing each year's candidates to
    /// `on_year` as soon as that listing is done
    ///
    /// A failing year is logged and skipped. An error from `on_year` stops the pass.
    pub async fn discover_with<E>(
        &self,
        seen: &mut HashSet<String>,
        mut on_year: impl FnMut(i32, &[CandidateAnchor]) -> Result<(), E>,
    ) -> Result<DiscoveryReport, E> {
        let mut report = DiscoveryReport::default();

        for (i, year) in self.config.years().into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.listing_delay_ms.sample()).await;
            }

            match self.discover_year(year, seen).await {
                Ok(candidates) => {
                    on_year(year, &candidates)?;
                    report.years_indexed += 1;
                    report.candidates.extend(candidates);
                }
                Err(e) => {
                    warn!("Skipping year {}: {}", year, e);
                    report.years_failed += 1;
                }
            }
        }

        info!(
            "Discovery done: {} candidates from {} years ({} failed)",
            report.candidates.len(),
            report.years_indexed,
            report.years_failed
        );
        Ok(report)
    }
}

/// Extract validated candidates from one listing page
pub fn candidates_from_listing(
    year: i32,
    page: &ListingPage,
    pattern: &SpeechUrlPattern,
    window: &RangeInclusive<NaiveDate>,
    date_mode: DateMode,
    seen: &mut HashSet<String>,
) -> Result<Vec<CandidateAnchor>, DiscoveryError> {
    let base = Url::parse(&page.url).map_err(|source| DiscoveryError::InvalidUrl {
        year,
        url: page.url.clone(),
        source,
    })?;

    let document = Html::parse_document(&page.html);
    let tree = HtmlTree::new(&document);
    let anchors = tree.select(tree.root(), "a[href]");
    if anchors.is_empty() {
        return Err(DiscoveryError::NotReady {
            year,
            url: page.url.clone(),
        });
    }

    let mut candidates = Vec::new();
    for anchor in anchors {
        let Some(href) = tree.attr(anchor, "href") else {
            continue;
        };
        let Ok(mut resolved) = base.join(href.trim()) else {
            continue;
        };
        resolved.set_fragment(None);
        if !pattern.matches_path(resolved.path()) {
            continue;
        }

        let href = resolved.to_string();
        if !seen.insert(href.clone()) {
            continue;
        }

        let container = nearest_container(&tree, anchor);
        let container_text = tree.rendered_text(container);

        let date = date_from_text(&container_text).or_else(|| date_from_url(resolved.path()));
        match date {
            Some(date) if !window.contains(&date) => {
                debug!("{} dated {} is outside the window", href, date);
                continue;
            }
            None if date_mode == DateMode::Strict => {
                debug!("Dropping {}: no valid date", href);
                continue;
            }
            _ => {}
        }

        let title = Some(tree.text(anchor))
            .filter(|text| !text.is_empty())
            .or_else(|| tree.attr(anchor, "title").map(|t| t.trim().to_string()))
            .unwrap_or_default();

        candidates.push(CandidateAnchor {
            speaker: speaker_from_text(&container_text),
            href,
            container_text,
            date,
            title,
        });
    }

    Ok(candidates)
}

/// Nearest ancestor with text, by priority: `li`, row `div`, `article`, parent
pub fn nearest_container<T: DocumentTree>(tree: &T, anchor: T::Node) -> T::Node {
    let ancestors = tree.ancestors(anchor);

    let list_item = ancestors
        .iter()
        .copied()
        .find(|&node| tree.tag_name(node) == "li");
    let row = ancestors.iter().copied().find(|&node| {
        tree.tag_name(node) == "div"
            && tree
                .attr(node, "class")
                .is_some_and(|class| class.contains("row"))
    });
    let article = ancestors
        .iter()
        .copied()
        .find(|&node| tree.tag_name(node) == "article");
    let parent = tree.parent(anchor);

    [list_item, row, article, parent]
        .into_iter()
        .flatten()
        .find(|node| !tree.rendered_text(*node).is_empty())
        .unwrap_or(anchor)
}

/// First `M/D/YYYY` date in the text, if it is a real calendar date
pub fn date_from_text(text: &str) -> Option<NaiveDate> {
    let captures = TEXT_DATE_RE.captures(text)?;
    let month = captures[1].parse().ok()?;
    let day = captures[2].parse().ok()?;
    let year = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Date from the `YYYYMMDD` token at the end of a speech URL
pub fn date_from_url(url: &str) -> Option<NaiveDate> {
    let captures = URL_DATE_RE.captures(url)?;
    let year = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let day = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Speaker from the container's rendered lines
///
/// Per line, in order: a "by " prefix, a "speaker:" label, then an office keyword.
pub fn speaker_from_text(text: &str) -> String {
    const LABEL: &str = "speaker:";

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("by ") {
            return line[3..].trim().to_string();
        }
        if let Some(pos) = lower.find(LABEL) {
            return line[pos + LABEL.len()..].trim().to_string();
        }
        if TITLE_KEYWORDS.iter().any(|keyword| line.contains(keyword)) {
            return line.to_string();
        }
    }
    String::new()
}
