//! # Transcript Extraction Module
//!
//! This module turns the raw markup of a speech page into clean transcript text.
//! It is a pure transformation: no network, no clock, no shared state, so the same
//! markup always yields byte-identical text and word count.
//!
//! ## Key Components
//!
//! - `DocumentTree`: the small tree capability the heuristics are written against
//! - `HtmlTree`: a `DocumentTree` backed by the `scraper` HTML parser
//! - `extract_transcript`: parse markup and run the main-body heuristics
//! - Text helpers for word counting, footnote stripping and whitespace cleanup
//!
//! ## Heuristics
//!
//! Pages in the archive use several layouts. Rather than trusting one selector, every
//! known content-column layout is tried and the subtree holding the most
//! "substantive paragraphs" wins. Paragraphs are then walked in document order until
//! the "last updated" footer, dropping footnote bodies and boilerplate such as share
//! buttons and PDF links.

mod content_extraction;
mod text;
mod tree;

pub use content_extraction::{
    extract_from_tree, extract_transcript, is_substantive, MainBodyCandidate,
    MAIN_BODY_SELECTORS, RELAXED_MIN_WORDS, SUBSTANTIVE_MIN_WORDS,
};
pub use text::{collapse_whitespace, count_words, is_boilerplate, strip_footnote_markers};
pub use tree::{DocumentTree, HtmlTree};

use serde::{Deserialize, Serialize};

/// Clean text extracted from one document page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Normalized transcript text
    pub text: String,

    /// Number of word tokens in `text`
    pub word_count: usize,
}

impl Transcript {
    /// True when no paragraph survived extraction
    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}
