//! Extraction counters
//!
//! Tracks how many sentences were processed, how many records each
//! extractor emitted and why extractors came back empty. Counters from
//! independent invocations merge, so a host can aggregate them per batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counters for one or more pipeline invocations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Sentences handed to the pipeline
    pub sentences: usize,
    /// Sentences skipped because they had too few entity tokens
    pub sentences_without_graph: usize,
    /// Entity pairs attempted
    pub pairs: usize,
    /// Records emitted, per extractor
    pub records: BTreeMap<String, usize>,
    /// Empty extractions, per reason
    pub skipped: BTreeMap<String, usize>,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count records emitted by an extractor
    pub fn add_records(&mut self, extractor: &str, count: usize) {
        *self.records.entry(extractor.to_string()).or_default() += count;
    }

    /// Count an extraction that produced nothing
    pub fn add_skip(&mut self, reason: &str) {
        *self.skipped.entry(reason.to_string()).or_default() += 1;
    }

    /// Total records across all extractors
    pub fn total_records(&self) -> usize {
        self.records.values().sum()
    }

    /// Average records per sentence that had a graph
    pub fn records_per_sentence(&self) -> f32 {
        let with_graph = self.sentences.saturating_sub(self.sentences_without_graph);
        if with_graph == 0 {
            0.0
        } else {
            self.total_records() as f32 / with_graph as f32
        }
    }

    /// Fold another set of counters into this one
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.sentences += other.sentences;
        self.sentences_without_graph += other.sentences_without_graph;
        self.pairs += other.pairs;
        for (name, count) in &other.records {
            self.add_records(name, *count);
        }
        for (reason, count) in &other.skipped {
            *self.skipped.entry(reason.clone()).or_default() += count;
        }
    }
}
