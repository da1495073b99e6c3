//! Relpat Extractor - Dependency-graph pattern mining
//!
//! Turns an annotated sentence into an undirected dependency graph and
//! renders generalized syntactic patterns connecting two entity tokens:
//! - Subtree mining: every small connected token subset containing both entities
//! - Shortest path: the single shortest connecting path with modifiers
//! - Cliques: maximal cliques rendered at several abstraction levels

use relpat_core::{EntityPair, PatternRecord, Result, Sentence};

/// Trait for pattern extractors.
///
/// `try_extract` reports why nothing was produced; `extract` is the host
/// boundary and never fails.
pub trait PatternExtractor: Send + Sync {
    /// Name used in logs and counters
    fn name(&self) -> &'static str;

    fn try_extract(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        pair: &EntityPair,
    ) -> Result<Vec<PatternRecord>>;

    fn extract(
        &self,
        sentence: &Sentence,
        graph: &SentenceGraph,
        pair: &EntityPair,
    ) -> Vec<PatternRecord> {
        match self.try_extract(sentence, graph, pair) {
            Ok(records) => records,
            Err(e) => {
                tracing::debug!(extractor = self.name(), reason = e.kind(), "{}", e);
                Vec::new()
            }
        }
    }
}

pub mod clique;
pub mod graph;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod shortest_path;
pub mod subtree;

pub use clique::{AbstractionLevel, CliqueExtractor};
pub use graph::{AllPairsShortestPaths, DependencyEdge, GraphBuilder, SentenceGraph};
pub use metrics::ExtractionStats;
pub use normalize::WholeWord;
pub use pipeline::{ExtractionReport, PatternPipeline};
pub use shortest_path::ShortestPathExtractor;
pub use subtree::SubtreeMiner;
