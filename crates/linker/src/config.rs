use anyhow::{Context, Result};
use kb::{KnowledgeBaseSettings, RetryConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "ENTITY_LINKING_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    pub tokenizer: TokenizerConfig,
    pub classifier: ClassifierConfig,
    pub knowledge_base: KnowledgeBaseSettings,
    pub retry: RetryConfig,
    pub concurrency: ConcurrencyConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    FixedLength,
    MorphPattern,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Graph,
    WithContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub kind: TokenizerKind,
    pub max_length: usize,
    /// Morph tokenizer only: take the allow-list from ground-truth mentions
    /// of the loaded sentences instead of the built-in one.
    pub learn_patterns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    pub graph_depth: usize,
    pub similarity_threshold: f64,
    pub early_exit: bool,
    /// Characters of an article kept for the context score.
    pub max_article_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_file: PathBuf,
    pub sequences: usize,
    pub report_dir: PathBuf,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            kind: TokenizerKind::FixedLength,
            max_length: 2,
            learn_patterns: false,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Graph,
            graph_depth: typegraph::DEFAULT_DEPTH,
            similarity_threshold: 0.2,
            early_exit: true,
            max_article_len: 5000,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { workers: 8 }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("data/tokens-with-entities-and-tags.tsv"),
            sequences: 1000,
            report_dir: PathBuf::from("reports"),
        }
    }
}

impl LinkerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        let config: Self = serde_json::from_str(&text)
            .context(format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Config from the file named by `ENTITY_LINKING_CONFIG`, defaults otherwise.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tokenizer.max_length == 0 {
            anyhow::bail!("tokenizer.max_length must be at least 1");
        }
        if self.concurrency.workers == 0 {
            anyhow::bail!("concurrency.workers must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.classifier.similarity_threshold) {
            anyhow::bail!(
                "classifier.similarity_threshold must be within [0, 1], got {}",
                self.classifier.similarity_threshold
            );
        }
        Ok(())
    }
}
