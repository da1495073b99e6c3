//! Pattern text normalization
//!
//! Surface-text cleanup and whole-word matching shared by all extractors.
//! Whole-word matching matters for short tokens: a bare substring search for
//! "s" would hit the inside of every plural.

use std::ops::Range;

use regex::{Regex, RegexBuilder};

use relpat_core::{RelpatError, Result, Sentence, TokenId};

/// Lower-case a token's surface text and collapse embedded newlines
pub fn surface_form(text: &str) -> String {
    text.replace(['\r', '\n'], " ").to_lowercase()
}

/// Join the surface forms of the given tokens with single spaces
pub fn render_tokens(sentence: &Sentence, ids: &[TokenId]) -> String {
    ids.iter()
        .filter_map(|&id| sentence.token(id))
        .map(|t| surface_form(&t.text))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive whole-word matcher for a literal token text
#[derive(Debug, Clone)]
pub struct WholeWord {
    regex: Regex,
}

impl WholeWord {
    pub fn new(word: &str) -> Result<Self> {
        let pattern = format!(r"\b{}\b", regex::escape(&surface_form(word)));
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RelpatError::MalformedInput(format!("unmatchable token {word:?}: {e}")))?;
        Ok(Self { regex })
    }

    /// Byte offset of the first whole-word occurrence
    pub fn find(&self, haystack: &str) -> Option<usize> {
        self.regex.find(haystack).map(|m| m.start())
    }

    /// Byte ranges of the whole-word occurrences, left to right
    pub fn ranges<'h>(&'h self, haystack: &'h str) -> impl Iterator<Item = Range<usize>> + 'h {
        self.regex.find_iter(haystack).map(|m| m.range())
    }
}
