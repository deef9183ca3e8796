//! Text normalization helpers shared by extraction and record building

use regex::Regex;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-zÀ-ÖØ-öø-ÿ0-9’']+").expect("word pattern must compile")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

static BRACKET_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[\d+\]\s*").expect("bracket pattern must compile"));

static PAREN_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)\s*").expect("paren pattern must compile"));

/// Count maximal runs of word characters (Latin letters with diacritics, digits,
/// apostrophes)
pub fn count_words(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

/// Collapse every whitespace run to a single space and trim both ends
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Replace `[12]` and `(12)` footnote markers, with their surrounding whitespace, by a
/// single space
pub fn strip_footnote_markers(text: &str) -> String {
    let text = BRACKET_MARKER_RE.replace_all(text, " ");
    PAREN_MARKER_RE.replace_all(&text, " ").into_owned()
}

/// Paragraphs that are page furniture rather than speech body
pub fn is_boilerplate(text: &str) -> bool {
    if text == "PDF" {
        return true;
    }
    let lower = text.to_lowercase();
    lower.contains("watch live") || lower.starts_with("share")
}
