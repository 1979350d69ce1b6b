use ingest::TokensSequence;
use kb::EntityId;
use serde::Serialize;
use tracing::warn;

use crate::span::{ClassificationResult, TokensGroup};

/// Per-token outcome of one sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub sequence_id: usize,
    pub position: usize,
    pub token: String,
    pub truth_entity: Option<EntityId>,
    pub predicted_entity: Option<EntityId>,
    /// Token is part of a ground-truth mention.
    pub ground_truth: bool,
    /// Token was claimed by an accepted span.
    pub predicted: bool,
    /// Predicted entity equals the ground-truth entity, both absent included.
    pub correct_predict: bool,
}

/// Project span decisions onto tokens.
///
/// Spans are visited by descending score; ties keep discovery order. An
/// accepted span claims its whole range only if no token in it is claimed
/// yet, otherwise it claims nothing. Exactly one row per token, in order.
pub fn align(
    sequence: &TokensSequence,
    groups: &[TokensGroup],
    results: &[ClassificationResult],
) -> Vec<ResultRow> {
    if groups.len() != results.len() {
        warn!(
            sequence = sequence.id,
            groups = groups.len(),
            results = results.len(),
            "Span and result counts differ, extra entries ignored"
        );
    }

    let mut order: Vec<(&TokensGroup, &ClassificationResult)> = groups.iter().zip(results).collect();
    order.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

    let mut claimed: Vec<Option<&EntityId>> = vec![None; sequence.len()];
    for (group, result) in order {
        let Some(entity) = &result.entity else {
            continue;
        };
        if group.start >= group.end || group.end > sequence.len() {
            continue;
        }

        let range = &mut claimed[group.start..group.end];
        if range.iter().all(Option::is_none) {
            range.fill(Some(entity));
        }
    }

    sequence
        .tokens
        .iter()
        .zip(claimed)
        .enumerate()
        .map(|(position, (token, predicted))| ResultRow {
            sequence_id: sequence.id,
            position,
            token: token.surface.clone(),
            truth_entity: token.entity_id.clone(),
            predicted_entity: predicted.cloned(),
            ground_truth: token.entity_id.is_some(),
            predicted: predicted.is_some(),
            correct_predict: predicted.map(String::as_str) == token.entity_id.as_deref(),
        })
        .collect()
}
