//! Relpat Core - Annotated sentence model, pattern records, shared types
//!
//! This crate defines the abstractions shared by the pattern extractors:
//! - The annotated-sentence contract (tokens, dependencies, sentences)
//! - Entity pairs and entity-class selection
//! - Pattern records (the unit of output)
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConfigError, ExtractionStrategy, ExtractorConfig, LoggingConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Error taxonomy for pattern extraction.
///
/// None of these are fatal: extractors recover locally and hand the caller an
/// empty record list. The variants exist so skip reasons can be logged and
/// counted.
#[derive(Error, Debug)]
pub enum RelpatError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Sentence has {tokens} tokens, subset search is capped at {limit}")]
    CapacityExceeded { tokens: usize, limit: usize },

    #[error("Entity pair did not resolve to exactly two tokens (matched {matched})")]
    UnresolvableEntity { matched: usize },

    #[error("Sentence has {found} entity-class tokens, at least {required} are required")]
    GraphAbsent { found: usize, required: usize },

    #[error("No path connects the entity pair")]
    NoPath,

    #[error("Graph has no maximal clique")]
    NoClique,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelpatError {
    /// Short stable name, used as a counter key
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::UnresolvableEntity { .. } => "unresolvable_entity",
            Self::GraphAbsent { .. } => "graph_absent",
            Self::NoPath => "no_path",
            Self::NoClique => "no_clique",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

impl From<ConfigError> for RelpatError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelpatError>;

// ============================================================================
// Annotated Sentence Model
// ============================================================================

/// Index of a token inside its sentence's token list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub usize);

impl TokenId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A token as produced by the upstream annotation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface text
    pub text: String,

    /// Character offset where the token starts
    pub begin: usize,

    /// Character offset one past the token end
    pub end: usize,

    /// Dictionary base form
    pub lemma: String,

    /// Part-of-speech tag (Penn Treebank style)
    pub pos: String,

    /// Named-entity label, if the tagger assigned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_entity: Option<String>,
}

impl Token {
    /// Noun-class tokens carry a POS tag starting with `N`
    pub fn is_noun(&self) -> bool {
        self.pos.starts_with('N')
    }

    pub fn is_adjective(&self) -> bool {
        self.pos == "JJ"
    }
}

/// A binary dependency relation as delivered by the parser.
///
/// Either endpoint may be missing; the graph builder drops such edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub governor: Option<TokenId>,
    pub dependent: Option<TokenId>,
    pub label: String,
}

impl Dependency {
    pub fn new(governor: usize, dependent: usize, label: impl Into<String>) -> Self {
        Self {
            governor: Some(TokenId(governor)),
            dependent: Some(TokenId(dependent)),
            label: label.into(),
        }
    }
}

/// An annotated sentence: ordered tokens plus sentence-scoped dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Covered text of the sentence
    pub text: String,

    /// Tokens in document order
    pub tokens: Vec<Token>,

    /// Dependencies scoped to this sentence
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Sentence {
    /// Look up a token by id
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0)
    }

    /// Iterate tokens with their ids
    pub fn tokens_with_ids(&self) -> impl Iterator<Item = (TokenId, &Token)> {
        self.tokens.iter().enumerate().map(|(i, t)| (TokenId(i), t))
    }

    /// Resolve a dependency endpoint, treating out-of-range ids as missing
    pub fn endpoint(&self, id: Option<TokenId>) -> Option<TokenId> {
        id.filter(|id| id.0 < self.tokens.len())
    }

    /// Resolve a lemma pair against the tokens, first match by lemma.
    ///
    /// Every token whose lemma equals either lemma is collected in token
    /// order. The pair resolves only if exactly two tokens matched; the first
    /// returned id is the earlier of the two in the token list. Repeated
    /// lemmas are not disambiguated.
    pub fn resolve_pair(&self, pair: &EntityPair) -> Result<(TokenId, TokenId)> {
        let matched: Vec<TokenId> = self
            .tokens_with_ids()
            .filter(|(_, t)| t.lemma == pair.first || t.lemma == pair.second)
            .map(|(id, _)| id)
            .collect();

        match matched.as_slice() {
            [a, b] => Ok((*a, *b)),
            _ => Err(RelpatError::UnresolvableEntity {
                matched: matched.len(),
            }),
        }
    }

    /// Tokens lying strictly between two tokens by character offset
    pub fn tokens_between(&self, a: TokenId, b: TokenId) -> Vec<TokenId> {
        let (Some(ta), Some(tb)) = (self.token(a), self.token(b)) else {
            return Vec::new();
        };
        let (left, right) = if ta.begin <= tb.begin { (ta, tb) } else { (tb, ta) };

        self.tokens_with_ids()
            .filter(|(_, t)| t.begin >= left.end && t.end <= right.begin)
            .map(|(id, _)| id)
            .collect()
    }

    /// Tokens covered by the span from one token to another, inclusive
    pub fn tokens_covering(&self, a: TokenId, b: TokenId) -> Vec<TokenId> {
        let (Some(ta), Some(tb)) = (self.token(a), self.token(b)) else {
            return Vec::new();
        };
        let (left, right) = if ta.begin <= tb.begin { (ta, tb) } else { (tb, ta) };

        self.tokens_with_ids()
            .filter(|(_, t)| t.begin >= left.begin && t.end <= right.end)
            .map(|(id, _)| id)
            .collect()
    }
}

/// A document: a sequence of annotated sentences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub sentences: Vec<Sentence>,
}

/// Builder that assigns offsets and sentence text from a word list
#[derive(Debug, Default)]
pub struct SentenceBuilder {
    sentence: Sentence,
}

impl SentenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token, separated from the previous one by a single space
    pub fn token(mut self, text: &str, pos: &str, lemma: &str) -> Self {
        if !self.sentence.tokens.is_empty() {
            self.sentence.text.push(' ');
        }
        let begin = self.sentence.text.len();
        self.sentence.text.push_str(text);
        self.sentence.tokens.push(Token {
            text: text.to_string(),
            begin,
            end: self.sentence.text.len(),
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            named_entity: None,
        });
        self
    }

    /// Tag the most recently added token with a named-entity label
    pub fn entity(mut self, label: &str) -> Self {
        if let Some(last) = self.sentence.tokens.last_mut() {
            last.named_entity = Some(label.to_string());
        }
        self
    }

    /// Add a dependency between two token indices
    pub fn dep(mut self, governor: usize, dependent: usize, label: &str) -> Self {
        self.sentence
            .dependencies
            .push(Dependency::new(governor, dependent, label));
        self
    }

    pub fn build(self) -> Sentence {
        self.sentence
    }
}

// ============================================================================
// Entity Selection
// ============================================================================

/// Which tokens count as candidate relation endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySelection {
    /// Any noun (NN, NNS, NNP, NNPS, ...)
    #[default]
    Noun,
    /// Common nouns (NN, NNS)
    CommonNoun,
    /// Proper nouns (NNP, NNPS)
    ProperNoun,
    /// Tokens labelled by the named-entity tagger
    NamedEntity,
}

impl EntitySelection {
    /// Test whether a token belongs to the selected entity class
    pub fn matches(&self, token: &Token) -> bool {
        match self {
            Self::Noun => token.is_noun(),
            Self::CommonNoun => matches!(token.pos.as_str(), "NN" | "NNS"),
            Self::ProperNoun => matches!(token.pos.as_str(), "NNP" | "NNPS"),
            Self::NamedEntity => token
                .named_entity
                .as_deref()
                .is_some_and(|label| !label.is_empty() && label != "O"),
        }
    }

    /// Count the sentence tokens of the selected class
    pub fn count(&self, sentence: &Sentence) -> usize {
        sentence.tokens.iter().filter(|t| self.matches(t)).count()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noun => "NOUN",
            Self::CommonNoun => "COMMONNOUN",
            Self::ProperNoun => "PROPERNOUN",
            Self::NamedEntity => "NAMEDENTITY",
        }
    }
}

impl std::fmt::Display for EntitySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntitySelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "noun" => Ok(Self::Noun),
            "commonnoun" => Ok(Self::CommonNoun),
            "propernoun" => Ok(Self::ProperNoun),
            "namedentity" => Ok(Self::NamedEntity),
            _ => Err(ConfigError::InvalidValue {
                key: "selection".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Entity Pairs and Pattern Records
// ============================================================================

/// Two literal lemmas supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityPair {
    pub first: String,
    pub second: String,
}

impl EntityPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }
}

/// A rendered pattern connecting two entities in a sentence
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternRecord {
    pub entity1: String,
    pub entity2: String,
    pub pattern: String,
    pub sentence: String,
}

impl PatternRecord {
    pub fn new(
        entity1: impl Into<String>,
        entity2: impl Into<String>,
        pattern: impl Into<String>,
        sentence: impl Into<String>,
    ) -> Self {
        Self {
            entity1: entity1.into(),
            entity2: entity2.into(),
            pattern: pattern.into(),
            sentence: sentence.into(),
        }
    }

    /// Render as one tab-separated row; tabs and newlines inside fields become spaces
    pub fn to_tsv(&self) -> String {
        [&self.entity1, &self.entity2, &self.pattern, &self.sentence]
            .iter()
            .map(|field| field.replace(['\t', '\n', '\r'], " "))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

// ============================================================================
// Tests
// ============================================================================
