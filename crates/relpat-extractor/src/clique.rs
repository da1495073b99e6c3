//! Clique-based pattern extraction
//!
//! Every maximal clique of the sentence graph marks a stretch of the
//! sentence. When that stretch covers both entities it is rendered at up to
//! three abstraction levels: literal words, word classes for adjectives and
//! other nouns, and finally with those classes removed.

use relpat_core::{EntityPair, PatternRecord, RelpatError, Result, Sentence, TokenId};

use crate::graph::SentenceGraph;
use crate::normalize::surface_form;
use crate::PatternExtractor;

const ADJECTIVE_PLACEHOLDER: &str = "<adj>";
const NOUN_PLACEHOLDER: &str = "<noun>";

/// Degree of lexical generalization applied to a clique pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AbstractionLevel {
    /// Lower-cased words
    Literal,
    /// Adjectives and other nouns replaced by `<adj>` / `<noun>`
    WordClass,
    /// Word-class placeholders removed
    Stripped,
}

impl AbstractionLevel {
    /// Levels emitted for a covered span of `span_len` tokens.
    ///
    /// Abstract variants of long spans would collect frequency from
    /// unrelated contexts, so they are limited to short spans.
    pub fn for_span(span_len: usize) -> Vec<Self> {
        let mut levels = vec![Self::Literal];
        if span_len < 7 {
            levels.push(Self::WordClass);
        }
        if span_len < 10 {
            levels.push(Self::Stripped);
        }
        levels
    }
}

/// Extracts multi-level patterns from the spans of maximal cliques
#[derive(Debug, Clone, Copy, Default)]
pub struct CliqueExtractor;

impl CliqueExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Render a covered span as parallel literal and word-class streams.
    ///
    /// Returns `None` when the span is empty or either entity is missing.
    fn render_span(
        sentence: &Sentence,
        covered: &[TokenId],
        w1: TokenId,
        w2: TokenId,
    ) -> Option<(Vec<String>, Vec<String>)> {
        let mut literal = Vec::with_capacity(covered.len());
        let mut classes = Vec::with_capacity(covered.len());
        let (mut found1, mut found2) = (false, false);

        for &id in covered {
            let token = sentence.token(id)?;
            let word = surface_form(&token.text);

            if !found1 && id == w1 {
                found1 = true;
                literal.push("X".to_string());
                classes.push("X".to_string());
            } else if !found2 && id == w2 {
                found2 = true;
                literal.push("Y".to_string());
                classes.push("Y".to_string());
            } else if token.is_adjective() {
                literal.push(word);
                classes.push(ADJECTIVE_PLACEHOLDER.to_string());
            } else if token.is_noun() {
                literal.push(word);
                classes.push(NOUN_PLACEHOLDER.to_string());
            } else {
                classes.push(word.clone());
                literal.push(word);
            }
        }

        if literal.is_empty() || !(found1 && found2) {
            return None;
        }
        Some((literal, classes))
    }
}

impl PatternExtractor for CliqueExtractor {
    fn name(&self) -> &'static str {
        "clique"
    }

    fn try_extract(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        pair: &EntityPair,
    ) -> Result<Vec<PatternRecord>> {
        let (w1, w2) = sentence.resolve_pair(pair)?;

        let cliques = graph.maximal_cliques();
        if cliques.is_empty() {
            return Err(RelpatError::NoClique);
        }

        let mut records = Vec::new();
        for clique in &cliques {
            let Some(&source) = clique.first() else {
                continue;
            };
            let target = clique.get(1).copied().unwrap_or(source);
            let covered = sentence.tokens_covering(source, target);

            // The first clique whose span misses an entity ends the scan
            if !covered.contains(&w1) || !covered.contains(&w2) {
                tracing::debug!(
                    clique = ?clique,
                    emitted = records.len(),
                    "Clique span does not cover both entities, stopping"
                );
                break;
            }

            let Some((literal, classes)) = Self::render_span(sentence, &covered, w1, w2) else {
                break;
            };

            for level in AbstractionLevel::for_span(covered.len()) {
                let pattern = match level {
                    AbstractionLevel::Literal => literal.join(" "),
                    AbstractionLevel::WordClass => classes.join(" "),
                    AbstractionLevel::Stripped => classes
                        .iter()
                        .filter(|w| *w != ADJECTIVE_PLACEHOLDER && *w != NOUN_PLACEHOLDER)
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(" "),
                };
                records.push(PatternRecord::new(
                    pair.first.as_str(),
                    pair.second.as_str(),
                    pattern,
                    sentence.text.as_str(),
                ));
            }
        }

        Ok(records)
    }
}

// ============================================================================
// Tests
// ============================================================================
