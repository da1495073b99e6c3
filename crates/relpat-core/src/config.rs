//! Relpat Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! defaults matching the extractor's documented contract. Configuration is
//! fixed when an extractor is constructed, never per call.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::EntitySelection;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Pattern extraction settings
    pub extractor: ExtractorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(selection) = std::env::var("RELPAT_SELECTION") {
            config.extractor.selection = selection.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RELPAT_SELECTION".to_string(),
                value: selection.clone(),
            })?;
        }
        if let Ok(hops) = std::env::var("RELPAT_MAX_HOPS") {
            config.extractor.max_hops = hops.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RELPAT_MAX_HOPS".to_string(),
                value: hops,
            })?;
        }
        if let Ok(skips) = std::env::var("RELPAT_NUM_SKIPS") {
            config.extractor.num_skips = skips.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RELPAT_NUM_SKIPS".to_string(),
                value: skips,
            })?;
        }
        if let Ok(strategy) = std::env::var("RELPAT_STRATEGY") {
            config.extractor.strategy = strategy.parse()?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = matches!(json.to_lowercase().as_str(), "1" | "true");
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = ExtractorConfig::default();

        // Only override if env values differ from defaults
        if env_config.extractor.selection != defaults.selection {
            self.extractor.selection = env_config.extractor.selection;
        }
        if env_config.extractor.max_hops != defaults.max_hops {
            self.extractor.max_hops = env_config.extractor.max_hops;
        }
        if env_config.extractor.num_skips != defaults.num_skips {
            self.extractor.num_skips = env_config.extractor.num_skips;
        }
        if env_config.extractor.strategy != defaults.strategy {
            self.extractor.strategy = env_config.extractor.strategy;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        Ok(self)
    }
}

/// Extractor configuration, fixed at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Which tokens count as entities when building graphs
    pub selection: EntitySelection,

    /// Largest token subset the subtree miner renders
    pub max_hops: usize,

    /// Skips allowed inside a subtree (reserved, not applied yet)
    pub num_skips: usize,

    /// Which extractor(s) the pipeline runs
    pub strategy: ExtractionStrategy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            selection: EntitySelection::Noun,
            max_hops: 5,
            num_skips: 0,
            strategy: ExtractionStrategy::Subtree,
        }
    }
}

/// Pattern extractors selectable by the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    #[default]
    Subtree,
    ShortestPath,
    Clique,
    /// Run all three extractors and concatenate their records
    All,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subtree => "subtree",
            Self::ShortestPath => "shortest_path",
            Self::Clique => "clique",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExtractionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "subtree" | "subtrees" => Ok(Self::Subtree),
            "shortestpath" | "path" => Ok(Self::ShortestPath),
            "clique" | "cliques" => Ok(Self::Clique),
            "all" => Ok(Self::All),
            _ => Err(ConfigError::InvalidValue {
                key: "strategy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
