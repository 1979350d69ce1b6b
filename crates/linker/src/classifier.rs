use ingest::TokensSequence;
use kb::{ArticleSource, KbError, KnowledgeBaseApi};
use std::sync::Arc;
use tracing::{debug, info, warn};
use typegraph::GraphExpander;

use crate::aligner::{ResultRow, align};
use crate::config::{ClassifierKind, LinkerConfig, TokenizerKind};
use crate::metrics::{RunMetrics, TimedOperation};
use crate::morph::MorphAnalyzer;
use crate::scoring::{ConfidenceScorer, ContextScorer, GraphPathScorer};
use crate::span::{ClassificationResult, TokensGroup};
use crate::tokenizer::{FixedLengthTokenizer, MorphPatternTokenizer, SpanTokenizer};

/// Acceptance policy on top of ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acceptance {
    /// Best confidence must be strictly above this to be accepted.
    pub threshold: Option<f64>,
    /// Stop at the first candidate above the threshold.
    pub early_exit: bool,
}

impl Acceptance {
    pub fn rank_only() -> Self {
        Self {
            threshold: None,
            early_exit: false,
        }
    }

    pub fn threshold(threshold: f64, early_exit: bool) -> Self {
        Self {
            threshold: Some(threshold),
            early_exit,
        }
    }

    fn accepts(&self, confidence: f64) -> bool {
        self.threshold.is_none_or(|t| confidence > t)
    }
}

/// Tokenize, expand and score every candidate, keep the best one per span,
/// then align spans onto tokens.
pub struct EntityClassifier {
    tokenizer: Arc<dyn SpanTokenizer>,
    expander: GraphExpander,
    scorer: Arc<dyn ConfidenceScorer>,
    acceptance: Acceptance,
    metrics: Arc<RunMetrics>,
}

impl EntityClassifier {
    pub fn new(
        tokenizer: Arc<dyn SpanTokenizer>,
        expander: GraphExpander,
        scorer: Arc<dyn ConfidenceScorer>,
        acceptance: Acceptance,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        Self {
            tokenizer,
            expander,
            scorer,
            acceptance,
            metrics,
        }
    }

    /// Wire up the configured strategies. `patterns` overrides the morph
    /// tokenizer's allow-list; `articles` is needed by the context variant.
    pub fn from_config(
        config: &LinkerConfig,
        kb: Arc<dyn KnowledgeBaseApi>,
        articles: Option<Arc<dyn ArticleSource>>,
        analyzer: Arc<dyn MorphAnalyzer>,
        patterns: Option<Vec<Vec<String>>>,
        metrics: Arc<RunMetrics>,
    ) -> anyhow::Result<Self> {
        let tokenizer: Arc<dyn SpanTokenizer> = match config.tokenizer.kind {
            TokenizerKind::FixedLength => Arc::new(FixedLengthTokenizer::new(
                kb.clone(),
                config.tokenizer.max_length,
                metrics.clone(),
            )),
            TokenizerKind::MorphPattern => Arc::new(MorphPatternTokenizer::new(
                kb.clone(),
                config.tokenizer.max_length,
                patterns.unwrap_or_else(MorphPatternTokenizer::default_patterns),
                metrics.clone(),
            )),
        };

        let (scorer, acceptance) = match config.classifier.kind {
            ClassifierKind::Graph => {
                let scorer: Arc<dyn ConfidenceScorer> = Arc::new(GraphPathScorer);
                (scorer, Acceptance::rank_only())
            }
            ClassifierKind::WithContext => {
                let articles = articles
                    .ok_or_else(|| anyhow::anyhow!("with_context classifier needs an article source"))?;
                let scorer: Arc<dyn ConfidenceScorer> =
                    Arc::new(ContextScorer::new(articles, analyzer, config.classifier.max_article_len));
                (
                    scorer,
                    Acceptance::threshold(config.classifier.similarity_threshold, config.classifier.early_exit),
                )
            }
        };

        let expander = GraphExpander::new(kb, config.classifier.graph_depth);
        Ok(Self::new(tokenizer, expander, scorer, acceptance, metrics))
    }

    pub fn describe(&self) -> String {
        format!(
            "tokenizer={}, scorer={}, graph_depth={}, threshold={}",
            self.tokenizer.describe(),
            self.scorer.name(),
            self.expander.depth(),
            self.acceptance
                .threshold
                .map(|t| t.to_string())
                .unwrap_or_else(|| "none".to_string()),
        )
    }

    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    /// Best qualifying candidate of one span. Candidates whose lookups fail
    /// are skipped; only fatal errors are returned.
    pub async fn classify_span(
        &self,
        sequence: &TokensSequence,
        group: &TokensGroup,
    ) -> Result<ClassificationResult, KbError> {
        let mut best: Option<(&str, f64)> = None;

        for candidate in &group.candidates {
            self.metrics.record_candidate();

            let graph = match self.expander.expand(candidate).await {
                Ok(graph) => graph,
                Err(e) => {
                    self.lookup_failed(sequence, candidate, e)?;
                    continue;
                }
            };
            if !graph.contains_target() {
                continue;
            }

            let confidence = match self.scorer.confidence(sequence, candidate, &graph).await {
                Ok(Some(confidence)) => confidence,
                Ok(None) => continue,
                Err(e) => {
                    self.lookup_failed(sequence, candidate, e)?;
                    continue;
                }
            };

            // strict comparison keeps the first-seen candidate on ties
            if best.is_none_or(|(_, score)| confidence > score) {
                best = Some((candidate.as_str(), confidence));
            }

            if self.acceptance.early_exit && self.acceptance.threshold.is_some() && self.acceptance.accepts(confidence) {
                break;
            }
        }

        Ok(match best {
            Some((entity, score)) if self.acceptance.accepts(score) => ClassificationResult::entity(entity, score),
            Some((entity, score)) => {
                debug!(sequence = sequence.id, entity, score, "Best candidate below threshold");
                ClassificationResult::no_entity()
            }
            None => ClassificationResult::no_entity(),
        })
    }

    /// Classify every span of `sequence` and align the decisions onto its
    /// tokens. Only fatal knowledge-base errors are returned.
    pub async fn classify_sequence(&self, sequence: &TokensSequence) -> Result<Vec<ResultRow>, KbError> {
        let timer = TimedOperation::start();

        let groups = self.tokenizer.tokenize(sequence).await?;
        let mut results = Vec::with_capacity(groups.len());
        for group in &groups {
            results.push(self.classify_span(sequence, group).await?);
        }

        let accepted = results.iter().filter(|r| r.is_entity()).count();
        let rows = align(sequence, &groups, &results);

        let elapsed = timer.elapsed();
        self.metrics.record_sequence(elapsed, groups.len(), accepted);
        info!(
            sequence = sequence.id,
            spans = groups.len(),
            accepted,
            elapsed_ms = elapsed.as_millis() as u64,
            "Sequence done"
        );
        Ok(rows)
    }

    fn lookup_failed(&self, sequence: &TokensSequence, candidate: &str, error: KbError) -> Result<(), KbError> {
        if error.is_fatal() {
            return Err(error);
        }
        warn!(sequence = sequence.id, candidate, error = %error, "Candidate lookup failed, skipping");
        self.metrics.record_lookup_failure();
        Ok(())
    }
}
