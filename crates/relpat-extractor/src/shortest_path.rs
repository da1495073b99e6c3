//! Shortest-path pattern extraction
//!
//! Renders the interior of the shortest dependency path between the two
//! entities, optionally extended by a preposition governing the first
//! entity and a coordinator attached to it.

use relpat_core::{EntityPair, PatternRecord, RelpatError, Result, Sentence, TokenId};

use crate::graph::{DependencyEdge, SentenceGraph};
use crate::normalize::render_tokens;
use crate::PatternExtractor;

const PREPOSITION_OBJECT: &str = "pobj";
const COORDINATOR: &str = "cc";

/// Extracts at most one pattern per sentence from the shortest path
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPathExtractor;

impl ShortestPathExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Single-record form of [`PatternExtractor::try_extract`]
    pub fn try_extract_one(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        pair: &EntityPair,
    ) -> Result<Option<PatternRecord>> {
        let (n1, n2) = sentence.resolve_pair(pair)?;

        let paths = graph.shortest_paths();
        if paths.path_count() == 0 {
            return Err(RelpatError::NoPath);
        }
        let path = paths.path(n1, n2).ok_or(RelpatError::NoPath)?;

        // endpoints are the entities themselves
        let interior = if path.len() > 2 { &path[1..path.len() - 1] } else { &[][..] };
        let span = render_tokens(sentence, interior);

        let path_edges: Vec<&DependencyEdge> = path
            .windows(2)
            .filter_map(|w| graph.edge_between(w[0], w[1]))
            .collect();
        let (prepender, mut postpender) = modifiers(sentence, n1, &path_edges);

        if span.is_empty() && postpender.is_empty() {
            return Ok(None);
        }
        if !span.is_empty() && !postpender.is_empty() {
            postpender.push(' ');
        }

        let (t1, t2) = match (sentence.token(n1), sentence.token(n2)) {
            (Some(t1), Some(t2)) => (t1, t2),
            _ => return Err(RelpatError::MalformedInput("unresolved token".to_string())),
        };

        let record = if t1.begin < t2.begin {
            PatternRecord::new(
                t1.lemma.as_str(),
                t2.lemma.as_str(),
                format!("{prepender}X {postpender}{span} Y"),
                sentence.text.as_str(),
            )
        } else {
            // TODO: decide whether prepender/postpender belong in the reversed rendering
            PatternRecord::new(
                t2.lemma.as_str(),
                t1.lemma.as_str(),
                format!("Y {span} X"),
                sentence.text.as_str(),
            )
        };

        Ok(Some(record))
    }
}

/// Scan every dependency of the sentence for the first entity's modifiers.
///
/// A `pobj` edge whose dependent is the entity contributes its governor
/// (unless that edge is already on the path); a `cc` edge governed by the
/// entity contributes its dependent. Later edges overwrite earlier ones.
fn modifiers(
    sentence: &Sentence,
    entity: TokenId,
    path_edges: &[&DependencyEdge],
) -> (String, String) {
    let mut prepender = String::new();
    let mut postpender = String::new();

    for dependency in &sentence.dependencies {
        let (Some(governor), Some(dependent)) = (
            sentence.endpoint(dependency.governor),
            sentence.endpoint(dependency.dependent),
        ) else {
            continue;
        };

        if dependency.label == PREPOSITION_OBJECT && dependent == entity {
            let edge = DependencyEdge::new(governor, dependent, dependency.label.as_str());
            if !path_edges.contains(&&edge) {
                if let Some(token) = sentence.token(governor) {
                    prepender = format!("{} ", token.text);
                }
            }
        }
        if dependency.label == COORDINATOR && governor == entity {
            if let Some(token) = sentence.token(dependent) {
                postpender = token.text.clone();
            }
        }
    }

    (prepender, postpender)
}

impl PatternExtractor for ShortestPathExtractor {
    fn name(&self) -> &'static str {
        "shortest_path"
    }

    fn try_extract(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        pair: &EntityPair,
    ) -> Result<Vec<PatternRecord>> {
        Ok(self
            .try_extract_one(sentence, graph, pair)?
            .into_iter()
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use relpat_core::{SentenceBuilder, Token};

    fn chased() -> Sentence {
        SentenceBuilder::new()
            .token("The", "DT", "the")
            .token("cat", "NN", "cat")
            .token("chased", "VBD", "chase")
            .token("the", "DT", "the")
            .token("small", "JJ", "small")
            .token("mouse", "NN", "mouse")
            .token("quickly", "RB", "quickly")
            .token(".", ".", ".")
            .dep(2, 1, "nsubj")
            .dep(2, 5, "dobj")
            .dep(5, 4, "amod")
            .build()
    }

    fn extract(sentence: &Sentence, pair: (&str, &str)) -> Vec<PatternRecord> {
        let graph = GraphBuilder::default().build(sentence).unwrap();
        ShortestPathExtractor.extract(sentence, &graph, &EntityPair::new(pair.0, pair.1))
    }

    #[test]
    fn test_simple_path() {
        let sentence = chased();
        let records = extract(&sentence, ("cat", "mouse"));
        assert_eq!(
            records,
            vec![PatternRecord::new("cat", "mouse", "X chased Y", sentence.text.clone())]
        );
    }

    #[test]
    fn test_caller_order_does_not_matter() {
        let sentence = chased();
        assert_eq!(extract(&sentence, ("mouse", "cat")), extract(&sentence, ("cat", "mouse")));
    }

    #[test]
    fn test_adjacent_entities_without_modifiers_are_skipped() {
        let sentence = SentenceBuilder::new()
            .token("apple", "NN", "apple")
            .token("pie", "NN", "pie")
            .dep(1, 0, "nn")
            .build();
        assert!(extract(&sentence, ("apple", "pie")).is_empty());
    }

    #[test]
    fn test_postpender_only() {
        let sentence = SentenceBuilder::new()
            .token("salt", "NN", "salt")
            .token("and", "CC", "and")
            .token("pepper", "NN", "pepper")
            .dep(0, 2, "conj")
            .dep(0, 1, "cc")
            .build();
        let records = extract(&sentence, ("salt", "pepper"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pattern, "X and Y");
    }

    #[test]
    fn test_prepender_and_postpender() {
        // "in Paris and the city of London": pobj attaches "in" to Paris
        let sentence = SentenceBuilder::new()
            .token("in", "IN", "in")
            .token("Paris", "NNP", "Paris")
            .token("and", "CC", "and")
            .token("the", "DT", "the")
            .token("city", "NN", "city")
            .token("of", "IN", "of")
            .token("London", "NNP", "London")
            .dep(0, 1, "pobj")
            .dep(1, 2, "cc")
            .dep(1, 4, "conj")
            .dep(4, 3, "det")
            .dep(4, 5, "prep")
            .dep(5, 6, "pobj")
            .build();
        let records = extract(&sentence, ("Paris", "London"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pattern, "in X and city of Y");
        assert_eq!(records[0].entity1, "Paris");
        assert_eq!(records[0].entity2, "London");
    }

    #[test]
    fn test_pobj_on_path_is_not_prepended() {
        // "from Rome came pilgrims": the pobj edge of Rome is the first path edge
        let sentence = SentenceBuilder::new()
            .token("from", "IN", "from")
            .token("Rome", "NNP", "Rome")
            .token("came", "VBD", "come")
            .token("pilgrims", "NNS", "pilgrim")
            .dep(2, 0, "prep")
            .dep(0, 1, "pobj")
            .dep(2, 3, "nsubj")
            .build();
        let records = extract(&sentence, ("Rome", "pilgrim"));
        assert_eq!(records[0].pattern, "X from came Y");
    }

    #[test]
    fn test_disconnected_entities() {
        let sentence = SentenceBuilder::new()
            .token("cats", "NNS", "cat")
            .token("sleep", "VBP", "sleep")
            .token("dogs", "NNS", "dog")
            .token("bark", "VBP", "bark")
            .dep(1, 0, "nsubj")
            .dep(3, 2, "nsubj")
            .build();
        let graph = GraphBuilder::default().build(&sentence).unwrap();
        let err = ShortestPathExtractor
            .try_extract(&sentence, &graph, &EntityPair::new("cat", "dog"))
            .unwrap_err();
        assert!(matches!(err, RelpatError::NoPath));
    }

    #[test]
    fn test_reversed_offsets_drop_modifiers() {
        // tokens listed out of offset order: the first resolved token starts later
        let token = |text: &str, begin: usize, pos: &str| Token {
            text: text.to_string(),
            begin,
            end: begin + text.len(),
            lemma: text.to_lowercase(),
            pos: pos.to_string(),
            named_entity: None,
        };
        let sentence = Sentence {
            text: "mice and cats hate".to_string(),
            tokens: vec![
                token("cats", 9, "NNS"),
                token("hate", 14, "VBP"),
                token("mice", 0, "NNS"),
                token("and", 5, "CC"),
            ],
            dependencies: vec![
                relpat_core::Dependency::new(1, 0, "nsubj"),
                relpat_core::Dependency::new(1, 2, "dobj"),
                relpat_core::Dependency::new(0, 3, "cc"),
            ],
        };
        let records = extract(&sentence, ("cats", "mice"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pattern, "Y hate X");
        assert_eq!(records[0].entity1, "mice");
        assert_eq!(records[0].entity2, "cats");
    }
}
