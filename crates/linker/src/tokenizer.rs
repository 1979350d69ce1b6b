use async_trait::async_trait;
use ingest::{TokensSequence, entity_tag_patterns};
use kb::{KbError, KnowledgeBaseApi, is_queryable};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::metrics::RunMetrics;
use crate::span::{ProbeForm, TokensGroup};

/// Noun/adjective phrase shapes worth probing, as coarse tag sequences.
pub const DEFAULT_PATTERNS: &[&[&str]] = &[
    &["subst"],
    &["ign"],
    &["adj", "subst"],
    &["subst", "adj"],
    &["subst", "subst"],
    &["subst", "ign"],
    &["ign", "subst"],
    &["ign", "ign"],
    &["adj", "adj", "subst"],
    &["subst", "adj", "subst"],
    &["subst", "prep", "subst"],
];

/// Turns a sentence into candidate spans. Only fatal knowledge-base errors
/// are returned; a failed probe just yields no span.
#[async_trait]
pub trait SpanTokenizer: Send + Sync {
    async fn tokenize(&self, sequence: &TokensSequence) -> Result<Vec<TokensGroup>, KbError>;

    fn describe(&self) -> String;
}

/// Shared probing of one range: surface text first, then the lemma text when
/// every token has a lemma and the lemma text differs.
#[derive(Clone)]
struct SpanProber {
    kb: Arc<dyn KnowledgeBaseApi>,
    metrics: Arc<RunMetrics>,
}

impl SpanProber {
    async fn probe(
        &self,
        sequence: &TokensSequence,
        start: usize,
        end: usize,
        out: &mut Vec<TokensGroup>,
    ) -> Result<(), KbError> {
        let surface = sequence.surface_text(start, end);
        if let Some(group) = self.lookup(sequence.id, start, end, &surface, ProbeForm::Surface).await? {
            out.push(group);
        }

        if let Some(lemma) = sequence.lemma_text(start, end).filter(|l| *l != surface) {
            if let Some(group) = self.lookup(sequence.id, start, end, &lemma, ProbeForm::Lemma).await? {
                out.push(group);
            }
        }
        Ok(())
    }

    async fn lookup(
        &self,
        sequence_id: usize,
        start: usize,
        end: usize,
        text: &str,
        form: ProbeForm,
    ) -> Result<Option<TokensGroup>, KbError> {
        if !is_queryable(text) {
            return Ok(None);
        }

        self.metrics.record_probe();
        match self.kb.candidate_entities(text).await {
            Ok(candidates) if candidates.is_empty() => Ok(None),
            Ok(candidates) => Ok(Some(TokensGroup::new(start, end, text, candidates).with_form(form))),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(sequence = sequence_id, text, error = %e, "Candidate lookup failed");
                self.metrics.record_lookup_failure();
                Ok(None)
            }
        }
    }
}

/// Every window of exactly `max_length` tokens whose end leaves at least one
/// token after it.
pub struct FixedLengthTokenizer {
    prober: SpanProber,
    max_length: usize,
}

impl FixedLengthTokenizer {
    pub fn new(kb: Arc<dyn KnowledgeBaseApi>, max_length: usize, metrics: Arc<RunMetrics>) -> Self {
        Self {
            prober: SpanProber { kb, metrics },
            max_length,
        }
    }

    /// Start positions `x` with `x + L <= len - 1`.
    pub fn windows(&self, len: usize) -> Vec<(usize, usize)> {
        if self.max_length == 0 {
            return Vec::new();
        }
        (0..len)
            .take_while(|x| x + self.max_length < len)
            .map(|x| (x, x + self.max_length))
            .collect()
    }
}

#[async_trait]
impl SpanTokenizer for FixedLengthTokenizer {
    async fn tokenize(&self, sequence: &TokensSequence) -> Result<Vec<TokensGroup>, KbError> {
        let mut groups = Vec::new();
        for (start, end) in self.windows(sequence.len()) {
            self.prober.probe(sequence, start, end, &mut groups).await?;
        }
        Ok(groups)
    }

    fn describe(&self) -> String {
        format!("fixed_length(max_length={})", self.max_length)
    }
}

/// Windows of 1..=`max_length` tokens whose coarse tag sequence is one of
/// the allowed patterns. Other windows are never probed.
pub struct MorphPatternTokenizer {
    prober: SpanProber,
    max_length: usize,
    patterns: HashSet<Vec<String>>,
}

impl MorphPatternTokenizer {
    pub fn new(
        kb: Arc<dyn KnowledgeBaseApi>,
        max_length: usize,
        patterns: Vec<Vec<String>>,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        Self {
            prober: SpanProber { kb, metrics },
            max_length,
            patterns: patterns.into_iter().collect(),
        }
    }

    pub fn default_patterns() -> Vec<Vec<String>> {
        DEFAULT_PATTERNS
            .iter()
            .map(|p| p.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    /// Distinct tag patterns of ground-truth entity spans no longer than
    /// `max_length`, in first-seen order.
    pub fn learned_patterns(sequences: &[TokensSequence], max_length: usize) -> Vec<Vec<String>> {
        let mut seen = HashSet::new();
        entity_tag_patterns(sequences)
            .into_iter()
            .filter(|p| !p.is_empty() && p.len() <= max_length)
            .filter(|p| seen.insert(p.clone()))
            .collect()
    }

    pub fn matches(&self, tags: &[&str]) -> bool {
        self.patterns
            .iter()
            .any(|p| p.len() == tags.len() && p.iter().zip(tags).all(|(a, b)| a == b))
    }

    /// Ranges to probe, shorter spans first.
    pub fn windows(&self, sequence: &TokensSequence) -> Vec<(usize, usize)> {
        let len = sequence.len();
        let mut windows = Vec::new();
        for span_len in 1..=self.max_length.min(len) {
            for start in 0..=(len - span_len) {
                let end = start + span_len;
                let Some(tags) = sequence.coarse_tags(start, end) else {
                    continue;
                };
                if self.matches(&tags) {
                    windows.push((start, end));
                }
            }
        }
        windows
    }
}

#[async_trait]
impl SpanTokenizer for MorphPatternTokenizer {
    async fn tokenize(&self, sequence: &TokensSequence) -> Result<Vec<TokensGroup>, KbError> {
        let mut groups = Vec::new();
        for (start, end) in self.windows(sequence) {
            self.prober.probe(sequence, start, end, &mut groups).await?;
        }
        Ok(groups)
    }

    fn describe(&self) -> String {
        format!(
            "morph_pattern(max_length={}, patterns={})",
            self.max_length,
            self.patterns.len()
        )
    }
}
