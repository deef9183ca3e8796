//! Main-body detection and paragraph filtering for speech pages

use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use tracing::debug;

use super::text::{collapse_whitespace, count_words, is_boilerplate, strip_footnote_markers};
use super::tree::{DocumentTree, HtmlTree};
use super::Transcript;

/// Stable marker of the page's content region
const CONTENT_ROOT_SELECTOR: &str = "#content";

/// Footer node after which nothing is speech body
const LAST_UPDATE_SELECTOR: &str = "#lastUpdate";

/// Content-column layouts seen across the archive, most specific first
pub const MAIN_BODY_SELECTORS: &[&str] = &[
    "#content div.col-xs-12.col-sm-8.col-md-8",
    "#content div.col-sm-8.col-md-8",
    "#content div.col-sm-8",
    "#content article",
    "div.col-xs-12.col-sm-8.col-md-8",
    "div.col-sm-8.col-md-8",
    "div.col-sm-8",
    "article",
];

/// Minimum word tokens of a substantive paragraph
pub const SUBSTANTIVE_MIN_WORDS: usize = 25;

/// Threshold of the fallback pass for atypical layouts
pub const RELAXED_MIN_WORDS: usize = 5;

static FOOTNOTE_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^fn\d+$").expect("footnote pattern must compile"));

/// A subtree competing to be the speech body
#[derive(Debug, Clone, Copy)]
pub struct MainBodyCandidate<N> {
    /// Root of the candidate subtree
    pub node: N,

    /// Number of substantive paragraphs inside `node`
    pub score: usize,
}

/// Extract the transcript from raw page markup
pub fn extract_transcript(html: &str) -> Transcript {
    let document = Html::parse_document(html);
    extract_from_tree(&HtmlTree::new(&document))
}

/// Extract the transcript from any parsed document
pub fn extract_from_tree<T: DocumentTree>(tree: &T) -> Transcript {
    let root = tree
        .select_first(tree.root(), CONTENT_ROOT_SELECTOR)
        .unwrap_or_else(|| tree.root());
    let body = pick_main_body(tree, root);
    let stop = tree.select_first(root, LAST_UPDATE_SELECTOR);

    let mut parts = collect_paragraphs(tree, body, stop, SUBSTANTIVE_MIN_WORDS);
    if parts.is_empty() {
        debug!("No substantive paragraphs, retrying with relaxed threshold");
        parts = collect_paragraphs(tree, body, stop, RELAXED_MIN_WORDS);
    }

    let text = collapse_whitespace(&strip_footnote_markers(&parts.join(" ")));
    let word_count = count_words(&text);
    Transcript { text, word_count }
}

/// Whether a paragraph's text counts as speech body at the given length threshold
pub fn is_substantive(text: &str, min_words: usize) -> bool {
    !text.is_empty() && !is_boilerplate(text) && count_words(text) >= min_words
}

/// Every distinct subtree matched by the layout selectors, scored
fn main_body_candidates<T: DocumentTree>(
    tree: &T,
    root: T::Node,
) -> Vec<MainBodyCandidate<T::Node>> {
    let mut nodes: Vec<T::Node> = Vec::new();
    for selector in MAIN_BODY_SELECTORS {
        for node in tree.select(root, selector) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
    }

    nodes
        .into_iter()
        .map(|node| MainBodyCandidate {
            node,
            score: score_subtree(tree, node),
        })
        .collect()
}

/// Highest-scoring candidate, earliest on ties; the root when nothing matched
fn pick_main_body<T: DocumentTree>(tree: &T, root: T::Node) -> T::Node {
    let mut best: Option<MainBodyCandidate<T::Node>> = None;
    for candidate in main_body_candidates(tree, root) {
        match best {
            Some(current) if current.score >= candidate.score => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|candidate| candidate.node).unwrap_or(root)
}

fn score_subtree<T: DocumentTree>(tree: &T, node: T::Node) -> usize {
    tree.select(node, "p")
        .into_iter()
        .filter(|p| !has_footnote_anchor(tree, *p))
        .filter(|p| is_substantive(&tree.text(*p), SUBSTANTIVE_MIN_WORDS))
        .count()
}

fn has_footnote_anchor<T: DocumentTree>(tree: &T, paragraph: T::Node) -> bool {
    tree.select(paragraph, "a[name]").into_iter().any(|anchor| {
        tree.attr(anchor, "name")
            .is_some_and(|name| FOOTNOTE_ANCHOR_RE.is_match(&name))
    })
}

fn collect_paragraphs<T: DocumentTree>(
    tree: &T,
    body: T::Node,
    stop: Option<T::Node>,
    min_words: usize,
) -> Vec<String> {
    let mut parts = Vec::new();
    for paragraph in tree.select(body, "p") {
        if stop.is_some_and(|stop| tree.is_within(paragraph, stop)) {
            break;
        }
        if has_footnote_anchor(tree, paragraph) {
            continue;
        }
        let text = tree.text(paragraph);
        if is_substantive(&text, min_words) {
            parts.push(text);
        }
    }
    parts
}
