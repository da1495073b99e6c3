//! Subtree pattern mining
//!
//! Enumerates every connected token subset that contains both entities and
//! renders it as a pattern. The search is exponential in sentence length, so
//! sentences longer than [`MAX_SUBSET_TOKENS`] are never mined.
//!
//! Duplicate records are intentional: the same pattern reached through
//! different subsets counts once per subset, which downstream consumers
//! read as pattern frequency.

use relpat_core::{EntityPair, PatternRecord, RelpatError, Result, Sentence, TokenId};

use crate::graph::SentenceGraph;
use crate::normalize::{render_tokens, WholeWord};
use crate::PatternExtractor;

/// Hard ceiling on sentence length for subset enumeration
pub const MAX_SUBSET_TOKENS: usize = 30;

/// Patterns need at least the two entities and one connecting token
const MIN_PATTERN_TOKENS: usize = 3;

const COORDINATION_LABEL: &str = "conj";
const COORDINATOR: &str = "and";
const FULL_STOP: &str = ".";

/// Miner for connected token subsets up to `max_hops` tokens
#[derive(Debug, Clone, Copy)]
pub struct SubtreeMiner {
    max_hops: usize,
    num_skips: usize,
}

impl Default for SubtreeMiner {
    fn default() -> Self {
        Self::new(5, 0)
    }
}

impl SubtreeMiner {
    pub fn new(max_hops: usize, num_skips: usize) -> Self {
        Self {
            max_hops,
            num_skips,
        }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Skips allowed within a subtree. Carried in the configuration but not
    /// applied: patterns are rendered without gaps.
    pub fn num_skips(&self) -> usize {
        self.num_skips
    }

    /// Filter one subset; returns its vertices in sentence order if it
    /// yields a pattern.
    ///
    /// Members without a dependency edge are not graph vertices and drop out
    /// of the subgraph, so a subset padded with them renders the same pattern
    /// as the bare one and is counted again.
    fn accept(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        members: &[TokenId],
        targets: (TokenId, TokenId),
    ) -> Option<Vec<TokenId>> {
        let mut vertices: Vec<TokenId> =
            members.iter().copied().filter(|&id| graph.contains(id)).collect();
        if !graph.is_connected(&vertices) {
            return None;
        }

        for edge in graph.induced_edges(&vertices) {
            if edge.label != COORDINATION_LABEL {
                continue;
            }
            for id in sentence.tokens_between(edge.governor, edge.dependent) {
                let is_and = sentence.token(id).is_some_and(|t| t.text == COORDINATOR);
                if is_and && !vertices.contains(&id) {
                    vertices.push(id);
                }
            }
        }

        if vertices.len() < MIN_PATTERN_TOKENS || vertices.len() > self.max_hops {
            return None;
        }

        for &id in &vertices {
            let token = sentence.token(id)?;
            if token.is_noun() && id != targets.0 && id != targets.1 {
                return None;
            }
            if token.text == FULL_STOP {
                return None;
            }
        }

        vertices.sort_by_key(|&id| (sentence.token(id).map(|t| t.begin), id));
        Some(vertices)
    }

    fn render(
        &self,
        sentence: &Sentence,
        vertices: &[TokenId],
        targets: (TokenId, TokenId),
        matchers: (&WholeWord, &WholeWord),
    ) -> Option<PatternRecord> {
        let text = render_tokens(sentence, vertices);

        // A missing match sorts before any found one
        let w1_first = matchers.0.find(&text) < matchers.1.find(&text);
        let (first, second, first_word, second_word) = if w1_first {
            (targets.0, targets.1, matchers.0, matchers.1)
        } else {
            (targets.1, targets.0, matchers.1, matchers.0)
        };

        // Y never lands on the X just inserted, even for a target spelled "x"
        let mut pattern = text;
        let first_range = first_word.ranges(&pattern).next();
        let placed_x = first_range.as_ref().map(|range| range.start..range.start + 1);
        if let Some(range) = first_range {
            pattern.replace_range(range, "X");
        }
        let second_range = second_word
            .ranges(&pattern)
            .find(|range| Some(range) != placed_x.as_ref());
        if let Some(range) = second_range {
            pattern.replace_range(range, "Y");
        }

        Some(PatternRecord::new(
            sentence.token(first)?.lemma.as_str(),
            sentence.token(second)?.lemma.as_str(),
            pattern.trim(),
            sentence.text.as_str(),
        ))
    }
}

impl PatternExtractor for SubtreeMiner {
    fn name(&self) -> &'static str {
        "subtree"
    }

    fn try_extract(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        pair: &EntityPair,
    ) -> Result<Vec<PatternRecord>> {
        let (w1, w2) = sentence.resolve_pair(pair)?;

        let token_count = sentence.tokens.len();
        if token_count > MAX_SUBSET_TOKENS {
            return Err(RelpatError::CapacityExceeded {
                tokens: token_count,
                limit: MAX_SUBSET_TOKENS,
            });
        }

        let text_of = |id: TokenId| {
            sentence
                .token(id)
                .map(|t| t.text.as_str())
                .ok_or_else(|| RelpatError::MalformedInput(format!("no token {id}")))
        };
        let m1 = WholeWord::new(text_of(w1)?)?;
        let m2 = WholeWord::new(text_of(w2)?)?;

        let others: Vec<TokenId> = (0..token_count)
            .map(TokenId)
            .filter(|&id| id != w1 && id != w2)
            .collect();

        let mut records = Vec::new();
        let max_extra = self
            .max_hops
            .saturating_sub(2)
            .min(others.len());
        let mut members = Vec::with_capacity(self.max_hops);

        for extra in 1..=max_extra {
            for mask in Combinations::new(others.len(), extra) {
                members.clear();
                members.extend([w1, w2]);
                members.extend(
                    others
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, &id)| id),
                );

                if let Some(vertices) = self.accept(sentence, graph, &members, (w1, w2)) {
                    records.extend(self.render(sentence, &vertices, (w1, w2), (&m1, &m2)));
                }
            }
        }

        tracing::debug!(
            tokens = token_count,
            max_hops = self.max_hops,
            records = records.len(),
            "Subtree mining finished"
        );
        Ok(records)
    }
}

/// All `k`-element subsets of `n` indices as bitmasks, in increasing
/// numeric order (Gosper's hack).
struct Combinations {
    mask: u64,
    limit: u64,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        debug_assert!(n < 64);
        Self {
            mask: (1u64 << k) - 1,
            limit: 1u64 << n,
            done: k == 0 || k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.done {
            return None;
        }

        let current = self.mask;
        let lowest = current & current.wrapping_neg();
        let ripple = current + lowest;
        let next = (((ripple ^ current) >> 2) / lowest) | ripple;
        if next >= self.limit {
            self.done = true;
        } else {
            self.mask = next;
        }
        Some(current)
    }
}

// ============================================================================
// Tests
// ============================================================================
