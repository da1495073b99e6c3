//! Per-sentence extraction pipeline
//!
//! Builds the sentence graph and runs the configured extractor(s) for one
//! entity pair, or for every entity pair in the sentence when none is
//! given. The pipeline holds only configuration; each call builds its own
//! graph and buffers, so calls are independent and may run in any order on
//! any thread.

use relpat_core::{
    Document, EntityPair, ExtractionStrategy, ExtractorConfig, PatternRecord, Sentence,
};

use crate::clique::CliqueExtractor;
use crate::graph::{GraphBuilder, SentenceGraph};
use crate::metrics::ExtractionStats;
use crate::shortest_path::ShortestPathExtractor;
use crate::subtree::SubtreeMiner;
use crate::PatternExtractor;

/// Records produced by one invocation plus its counters
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub records: Vec<PatternRecord>,
    pub stats: ExtractionStats,
}

impl ExtractionReport {
    /// Append another report's records and counters
    pub fn merge(&mut self, other: ExtractionReport) {
        self.records.extend(other.records);
        self.stats.merge(&other.stats);
    }
}

/// Pattern extraction pipeline with configuration fixed at construction
#[derive(Debug, Clone)]
pub struct PatternPipeline {
    config: ExtractorConfig,
    builder: GraphBuilder,
    subtree: SubtreeMiner,
    shortest_path: ShortestPathExtractor,
    clique: CliqueExtractor,
}

impl Default for PatternPipeline {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl PatternPipeline {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            builder: GraphBuilder::new(config.selection),
            subtree: SubtreeMiner::new(config.max_hops, config.num_skips),
            shortest_path: ShortestPathExtractor::new(),
            clique: CliqueExtractor::new(),
            config,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn graph_builder(&self) -> &GraphBuilder {
        &self.builder
    }

    fn extractors(&self) -> Vec<&dyn PatternExtractor> {
        match self.config.strategy {
            ExtractionStrategy::Subtree => vec![&self.subtree],
            ExtractionStrategy::ShortestPath => vec![&self.shortest_path],
            ExtractionStrategy::Clique => vec![&self.clique],
            ExtractionStrategy::All => vec![&self.subtree, &self.shortest_path, &self.clique],
        }
    }

    /// Entity pairs for sentence-only mode.
    ///
    /// Distinct lemmas of entity-class tokens in first-occurrence order,
    /// combined into every unordered pair.
    pub fn candidate_pairs(&self, sentence: &Sentence) -> Vec<EntityPair> {
        let selection = self.builder.selection();
        let mut lemmas: Vec<&str> = Vec::new();
        for token in sentence.tokens.iter().filter(|t| selection.matches(t)) {
            if !lemmas.contains(&token.lemma.as_str()) {
                lemmas.push(token.lemma.as_str());
            }
        }

        let mut pairs = Vec::new();
        for (i, first) in lemmas.iter().enumerate() {
            for second in &lemmas[i + 1..] {
                pairs.push(EntityPair::new(*first, *second));
            }
        }
        pairs
    }

    /// Extract patterns from one sentence.
    ///
    /// With a pair, only that pair is extracted; without one, every
    /// candidate pair is.
    pub fn process_sentence(
        &self,
        sentence: &Sentence,
        pair: Option<&EntityPair>,
    ) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        report.stats.sentences = 1;

        let graph = match self.builder.try_build(sentence) {
            Ok(graph) => graph,
            Err(e) => {
                tracing::debug!(tokens = sentence.tokens.len(), "Skipping sentence: {}", e);
                report.stats.sentences_without_graph = 1;
                return report;
            }
        };

        match pair {
            Some(pair) => self.run_pair(sentence, &graph, pair, &mut report),
            None => {
                for pair in self.candidate_pairs(sentence) {
                    self.run_pair(sentence, &graph, &pair, &mut report);
                }
            }
        }

        report
    }

    /// Extract patterns from every sentence of a document
    pub fn process_document(
        &self,
        document: &Document,
        pair: Option<&EntityPair>,
    ) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        for sentence in &document.sentences {
            report.merge(self.process_sentence(sentence, pair));
        }

        tracing::debug!(
            sentences = report.stats.sentences,
            without_graph = report.stats.sentences_without_graph,
            records = report.records.len(),
            "Document processed"
        );
        report
    }

    fn run_pair(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        pair: &EntityPair,
        report: &mut ExtractionReport,
    ) {
        report.stats.pairs += 1;
        for extractor in self.extractors() {
            match extractor.try_extract(sentence, graph, pair) {
                Ok(records) => {
                    report.stats.add_records(extractor.name(), records.len());
                    report.records.extend(records);
                }
                Err(e) => {
                    tracing::debug!(
                        extractor = extractor.name(),
                        first = %pair.first,
                        second = %pair.second,
                        "No patterns: {}",
                        e
                    );
                    report.stats.add_skip(e.kind());
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use relpat_core::{EntitySelection, SentenceBuilder};

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

    fn pipeline(strategy: ExtractionStrategy) -> PatternPipeline {
        PatternPipeline::new(ExtractorConfig {
            strategy,
            ..Default::default()
        })
    }

    #[test]
    fn test_targeted_shortest_path() {
        let report = pipeline(ExtractionStrategy::ShortestPath)
            .process_sentence(&chased(), Some(&EntityPair::new("cat", "mouse")));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].pattern, "X chased Y");
        assert_eq!(report.stats.records["shortest_path"], 1);
        assert_eq!(report.stats.pairs, 1);
    }

    #[test]
    fn test_sentence_only_mode_uses_candidate_pairs() {
        let sentence = chased();
        let pipeline = pipeline(ExtractionStrategy::Subtree);
        assert_eq!(
            pipeline.candidate_pairs(&sentence),
            vec![EntityPair::new("cat", "mouse")]
        );

        let report = pipeline.process_sentence(&sentence, None);
        assert_eq!(report.records.len(), 16);
        assert_eq!(report.stats.pairs, 1);
    }

    #[test]
    fn test_all_strategies() {
        let report = pipeline(ExtractionStrategy::All)
            .process_sentence(&chased(), Some(&EntityPair::new("cat", "mouse")));
        assert_eq!(report.stats.records["subtree"], 16);
        assert_eq!(report.stats.records["shortest_path"], 1);
        // first clique {cat, chased} does not reach the mouse
        assert_eq!(report.stats.records["clique"], 0);
        assert_eq!(report.records.len(), 17);
    }

    #[test]
    fn test_sentence_without_graph_is_skipped() {
        let pipeline = PatternPipeline::new(ExtractorConfig {
            selection: EntitySelection::ProperNoun,
            ..Default::default()
        });
        let report = pipeline.process_sentence(&chased(), Some(&EntityPair::new("cat", "mouse")));
        assert!(report.records.is_empty());
        assert_eq!(report.stats.sentences_without_graph, 1);
        assert_eq!(report.stats.pairs, 0);
    }

    #[test]
    fn test_document_continues_after_skipped_sentence() {
        let filler = SentenceBuilder::new()
            .token("Hello", "UH", "hello")
            .build();
        let document = Document {
            sentences: vec![filler, chased()],
        };
        let report = pipeline(ExtractionStrategy::ShortestPath)
            .process_document(&document, Some(&EntityPair::new("cat", "mouse")));

        assert_eq!(report.stats.sentences, 2);
        assert_eq!(report.stats.sentences_without_graph, 1);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_skip_reasons_are_counted() {
        let report = pipeline(ExtractionStrategy::All)
            .process_sentence(&chased(), Some(&EntityPair::new("cat", "dog")));
        assert!(report.records.is_empty());
        assert_eq!(report.stats.skipped["unresolvable_entity"], 3);
    }
}
