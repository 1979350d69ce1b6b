use ingest::{SkippedSequence, TokensSequence};
use kb::KbError;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::aligner::ResultRow;
use crate::classifier::EntityClassifier;

#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    /// Rows of every classified sentence, in submission order.
    pub rows: Vec<ResultRow>,
    pub classified: usize,
    pub skipped: Vec<SkippedSequence>,
}

/// Classifies sentences on a bounded pool of tokio tasks. Workers share only
/// the classifier; results come back in submission order.
pub struct BatchRunner {
    classifier: Arc<EntityClassifier>,
    workers: usize,
}

impl BatchRunner {
    pub fn new(classifier: Arc<EntityClassifier>, workers: usize) -> Self {
        Self {
            classifier,
            workers: workers.max(1),
        }
    }

    /// A sentence whose task fails is skipped and reported. A fatal
    /// knowledge-base error aborts the whole batch.
    pub async fn run(&self, sequences: Vec<TokensSequence>) -> Result<BatchOutcome, KbError> {
        let total = sequences.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        info!(sequences = total, workers = self.workers, "Starting batch");

        let mut handles = Vec::with_capacity(total);
        for sequence in sequences {
            let classifier = self.classifier.clone();
            let semaphore = semaphore.clone();
            let id = sequence.id;

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| KbError::Lookup(format!("worker pool closed: {}", e)))?;
                classifier.classify_sequence(&sequence).await
            });
            handles.push((id, handle));
        }

        let mut outcome = BatchOutcome::default();
        let mut pending = handles.into_iter();
        while let Some((id, handle)) = pending.next() {
            let reason = match handle.await {
                Ok(Ok(rows)) => {
                    outcome.classified += 1;
                    outcome.rows.extend(rows);
                    continue;
                }
                Ok(Err(e)) if e.is_fatal() => {
                    error!(sequence = id, error = %e, "Knowledge base unavailable, aborting batch");
                    for (_, handle) in pending {
                        handle.abort();
                    }
                    return Err(e);
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("worker failed: {}", e),
            };

            warn!(sequence = id, reason = %reason, "Skipping sequence");
            self.classifier.metrics().record_skipped();
            outcome.skipped.push(SkippedSequence {
                id,
                line: None,
                reason,
            });
        }

        info!(
            classified = outcome.classified,
            skipped = outcome.skipped.len(),
            rows = outcome.rows.len(),
            "Batch finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Acceptance;
    use crate::metrics::RunMetrics;
    use crate::scoring::GraphPathScorer;
    use crate::tokenizer::FixedLengthTokenizer;
    use async_trait::async_trait;
    use ingest::Token;
    use kb::{EntityId, InMemoryKnowledgeBase, KnowledgeBaseApi};
    use std::time::Duration;
    use typegraph::GraphExpander;

    /// Slows down lookups for long words so early sentences finish last;
    /// panics on "boom".
    struct SlowKb(InMemoryKnowledgeBase);

    #[async_trait]
    impl KnowledgeBaseApi for SlowKb {
        async fn parent_types(&self, entity: &str) -> Result<Vec<EntityId>, KbError> {
            self.0.parent_types(entity).await
        }

        async fn candidate_entities(&self, text: &str) -> Result<Vec<EntityId>, KbError> {
            if text.contains("boom") {
                panic!("lookup exploded");
            }
            tokio::time::sleep(Duration::from_millis(5 * text.len() as u64)).await;
            self.0.candidate_entities(text).await
        }
    }

    fn runner(kb: Arc<dyn KnowledgeBaseApi>, workers: usize) -> BatchRunner {
        let metrics = RunMetrics::new();
        let classifier = EntityClassifier::new(
            Arc::new(FixedLengthTokenizer::new(kb.clone(), 1, metrics.clone())),
            GraphExpander::new(kb, 5),
            Arc::new(GraphPathScorer),
            Acceptance::rank_only(),
            metrics,
        );
        BatchRunner::new(Arc::new(classifier), workers)
    }

    fn sentence(id: usize, first: &str) -> TokensSequence {
        TokensSequence::new(id, vec![Token::new(first, None), Token::new(".", None)])
    }

    #[tokio::test]
    async fn test_results_in_submission_order() {
        let kb = SlowKb(InMemoryKnowledgeBase::new().with_candidates("Kraków", &["Q31487"]).with_parents("Q31487", &["Q5"]));
        let runner = runner(Arc::new(kb), 4);
        let sequences = vec![
            sentence(0, "aaaaaaaaaaaaaaaa"),
            sentence(1, "Kraków"),
            sentence(2, "b"),
        ];

        let outcome = runner.run(sequences).await.unwrap();
        assert_eq!(outcome.classified, 3);
        let ids: Vec<_> = outcome.rows.iter().map(|r| (r.sequence_id, r.position)).collect();
        assert_eq!(ids, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
        assert!(outcome.rows[2].predicted);
    }

    #[tokio::test]
    async fn test_failed_sequence_is_skipped() {
        let runner = runner(Arc::new(SlowKb(InMemoryKnowledgeBase::new())), 2);
        let sequences = vec![sentence(0, "a"), sentence(1, "boom"), sentence(2, "c")];

        let outcome = runner.run(sequences).await.unwrap();
        assert_eq!(outcome.classified, 2);
        assert_eq!(outcome.rows.len(), 4);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].id, 1);
        assert_eq!(outcome.skipped[0].line, None);
        assert_eq!(runner.classifier.metrics().snapshot().sequences_skipped, 1);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_batch() {
        let runner = runner(Arc::new(InMemoryKnowledgeBase::new().unavailable()), 2);
        let err = runner.run(vec![sentence(0, "a"), sentence(1, "b")]).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let runner = runner(Arc::new(InMemoryKnowledgeBase::new()), 8);
        let outcome = runner.run(Vec::new()).await.unwrap();
        assert_eq!(outcome.classified, 0);
        assert!(outcome.rows.is_empty());
    }
}
