pub mod aligner;
pub mod batch;
pub mod classifier;
pub mod config;
pub mod metrics;
pub mod morph;
pub mod scoring;
pub mod span;
pub mod tokenizer;

pub use aligner::{ResultRow, align};
pub use batch::{BatchOutcome, BatchRunner};
pub use classifier::{Acceptance, EntityClassifier};
pub use config::{ClassifierKind, LinkerConfig, TokenizerKind};
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use morph::{LexiconAnalyzer, MorphAnalyzer};
pub use scoring::{ConfidenceScorer, ContextScorer, GraphPathScorer};
pub use span::{ClassificationResult, ProbeForm, TokensGroup};
pub use tokenizer::{FixedLengthTokenizer, MorphPatternTokenizer, SpanTokenizer};
