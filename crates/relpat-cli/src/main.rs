//! Relpat CLI - Command-line interface
//!
//! Usage:
//!   relpat extract --input corpus.jsonl --output patterns.tsv
//!   relpat extract --strategy all --max-hops 6 < corpus.jsonl
//!   relpat inspect --input corpus.jsonl
//!
//! Input is JSON Lines; each line holds one document and an optional entity
//! pair: `{"sentences": [...], "pair": ["cat", "mouse"]}`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use relpat_core::{
    AppConfig, Document, EntityPair, EntitySelection, ExtractionStrategy, LoggingConfig, Sentence,
};
use relpat_extractor::{ExtractionReport, GraphBuilder, PatternPipeline, SentenceGraph};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "relpat")]
#[command(about = "Dependency-graph relation pattern miner")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract patterns and write them as TSV rows
    Extract {
        /// JSON Lines input, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// TSV output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// subtree, shortest_path, clique or all
        #[arg(long)]
        strategy: Option<ExtractionStrategy>,

        /// noun, common_noun, proper_noun or named_entity
        #[arg(long)]
        selection: Option<EntitySelection>,

        /// Largest token subset mined for a subtree pattern
        #[arg(long)]
        max_hops: Option<usize>,

        /// Skip tolerance for subtree mining
        #[arg(long)]
        num_skips: Option<usize>,

        /// Print extraction counters as JSON to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Print graph summaries for each sentence as JSON
    Inspect {
        /// JSON Lines input, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// noun, common_noun, proper_noun or named_entity
        #[arg(long)]
        selection: Option<EntitySelection>,
    },
}

/// One input line
#[derive(Debug, Deserialize)]
struct Request {
    #[serde(flatten)]
    document: Document,

    /// Target lemmas; every candidate pair is tried when absent
    #[serde(default)]
    pair: Option<(String, String)>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    init_tracing(&config.logging);

    match cli.command {
        Commands::Extract {
            input,
            output,
            strategy,
            selection,
            max_hops,
            num_skips,
            stats,
        } => {
            let mut extractor = config.extractor;
            if let Some(strategy) = strategy {
                extractor.strategy = strategy;
            }
            if let Some(selection) = selection {
                extractor.selection = selection;
            }
            if let Some(max_hops) = max_hops {
                extractor.max_hops = max_hops;
            }
            if let Some(num_skips) = num_skips {
                extractor.num_skips = num_skips;
            }

            tracing::info!(
                strategy = %extractor.strategy,
                selection = %extractor.selection,
                max_hops = extractor.max_hops,
                "Starting extraction"
            );

            let pipeline = PatternPipeline::new(extractor);
            let report = extract(&pipeline, &input, output.as_deref())?;

            tracing::info!(
                sentences = report.stats.sentences,
                records = report.stats.total_records(),
                "Extraction finished"
            );
            if stats {
                eprintln!("{}", serde_json::to_string_pretty(&report.stats)?);
            }
        }
        Commands::Inspect { input, selection } => {
            let builder = GraphBuilder::new(selection.unwrap_or(config.extractor.selection));
            inspect(&builder, &input)?;
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_input(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("Failed to open input {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parse input lines, logging and skipping the ones that do not decode
fn requests(reader: Box<dyn BufRead>) -> impl Iterator<Item = anyhow::Result<Request>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(anyhow::Error::from(e).context("Failed to read input"))),
            };
            if line.trim().is_empty() {
                return None;
            }
            match serde_json::from_str::<Request>(&line) {
                Ok(request) => Some(Ok(request)),
                Err(e) => {
                    tracing::warn!(line = index + 1, "Skipping malformed input: {}", e);
                    None
                }
            }
        })
}

fn extract(
    pipeline: &PatternPipeline,
    input: &str,
    output: Option<&Path>,
) -> anyhow::Result<ExtractionReport> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut total = ExtractionReport::default();
    for request in requests(open_input(input)?) {
        let request = request?;
        let pair = request.pair.map(|(first, second)| EntityPair::new(first, second));

        let report = pipeline.process_document(&request.document, pair.as_ref());
        for record in &report.records {
            writeln!(writer, "{}", record.to_tsv()).context("Failed to write output")?;
        }
        total.stats.merge(&report.stats);
    }

    writer.flush().context("Failed to write output")?;
    Ok(total)
}

// ============================================================================
// Inspect
// ============================================================================

#[derive(Debug, Serialize)]
struct SentenceSummary {
    text: String,
    vertices: usize,
    /// (governor, label, dependent) surface triples
    edges: Vec<(String, String, String)>,
    cliques: Vec<Vec<String>>,
    entity_heads: Vec<EntityHead>,
}

#[derive(Debug, Serialize)]
struct EntityHead {
    mention: String,
    label: String,
    head: String,
}

fn inspect(builder: &GraphBuilder, input: &str) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();

    for request in requests(open_input(input)?) {
        for sentence in &request?.document.sentences {
            let Some(graph) = builder.build(sentence) else {
                tracing::info!(text = %sentence.text, "No graph for sentence");
                continue;
            };
            let summary = summarize(sentence, &graph);
            writeln!(stdout, "{}", serde_json::to_string(&summary)?)?;
        }
    }

    Ok(())
}

fn summarize(sentence: &Sentence, graph: &SentenceGraph) -> SentenceSummary {
    let word = |id| {
        sentence
            .token(id)
            .map(|t| t.text.clone())
            .unwrap_or_default()
    };

    let edges = graph
        .edges()
        .map(|e| (word(e.governor), e.label.clone(), word(e.dependent)))
        .collect();

    let cliques = graph
        .maximal_cliques()
        .into_iter()
        .map(|clique| clique.into_iter().map(word).collect())
        .collect();

    let entity_heads = mentions(sentence)
        .into_iter()
        .filter_map(|(begin, end, label)| {
            let head = graph.entity_head(sentence, begin, end)?;
            Some(EntityHead {
                mention: sentence.text.get(begin..end)?.to_string(),
                label,
                head: word(head),
            })
        })
        .collect();

    SentenceSummary {
        text: sentence.text.clone(),
        vertices: graph.vertex_count(),
        edges,
        cliques,
        entity_heads,
    }
}

/// Runs of adjacent tokens sharing a named-entity label, as offset spans
fn mentions(sentence: &Sentence) -> Vec<(usize, usize, String)> {
    let mut spans: Vec<(usize, usize, String)> = Vec::new();
    let mut previous: Option<&str> = None;

    for token in &sentence.tokens {
        let label = token
            .named_entity
            .as_deref()
            .filter(|l| !l.is_empty() && *l != "O");
        match label {
            Some(label) if previous == Some(label) => {
                if let Some(last) = spans.last_mut() {
                    last.1 = token.end;
                }
            }
            Some(label) => spans.push((token.begin, token.end, label.to_string())),
            None => {}
        }
        previous = label;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use relpat_core::SentenceBuilder;

    #[test]
    fn test_request_line() {
        let line = r#"{"sentences": [{"text": "", "tokens": []}], "pair": ["cat", "mouse"]}"#;
        let request: Request = serde_json::from_str(line).unwrap();
        assert_eq!(request.document.sentences.len(), 1);
        assert_eq!(request.pair, Some(("cat".to_string(), "mouse".to_string())));

        let request: Request = serde_json::from_str(r#"{"sentences": []}"#).unwrap();
        assert!(request.pair.is_none());
    }

    #[test]
    fn test_mentions_and_heads() {
        let sentence = SentenceBuilder::new()
            .token("New", "NNP", "New")
            .entity("LOCATION")
            .token("York", "NNP", "York")
            .entity("LOCATION")
            .token("hosts", "VBZ", "host")
            .entity("O")
            .token("Tom", "NNP", "Tom")
            .entity("PERSON")
            .dep(1, 0, "nn")
            .dep(2, 1, "nsubj")
            .dep(2, 3, "dobj")
            .build();

        assert_eq!(
            mentions(&sentence),
            vec![(0, 8, "LOCATION".to_string()), (15, 18, "PERSON".to_string())]
        );

        let graph = GraphBuilder::default().build(&sentence).unwrap();
        let summary = summarize(&sentence, &graph);
        assert_eq!(summary.vertices, 4);
        assert_eq!(
            summary.edges[1],
            ("hosts".to_string(), "nsubj".to_string(), "York".to_string())
        );
        assert_eq!(summary.entity_heads[0].mention, "New York");
        assert_eq!(summary.entity_heads[0].head, "York");
        assert_eq!(summary.entity_heads[1].head, "Tom");
    }
}
