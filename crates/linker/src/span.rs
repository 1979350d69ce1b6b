use kb::EntityId;
use serde::Serialize;

/// Which form of the span text was sent to the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeForm {
    Surface,
    Lemma,
}

/// Candidate span `[start, end)` of one sentence with the entities its text
/// matched, in the knowledge base's relevance order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokensGroup {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub candidates: Vec<EntityId>,
    pub form: ProbeForm,
}

impl TokensGroup {
    pub fn new(start: usize, end: usize, text: impl Into<String>, candidates: Vec<EntityId>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            candidates,
            form: ProbeForm::Surface,
        }
    }

    pub fn with_form(mut self, form: ProbeForm) -> Self {
        self.form = form;
        self
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &TokensGroup) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Outcome for one span: the chosen entity, or `None` for "no entity".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub entity: Option<EntityId>,
    pub score: f64,
}

impl ClassificationResult {
    pub fn entity(entity: impl Into<EntityId>, score: f64) -> Self {
        Self {
            entity: Some(entity.into()),
            score,
        }
    }

    pub fn no_entity() -> Self {
        Self {
            entity: None,
            score: 0.0,
        }
    }

    pub fn is_entity(&self) -> bool {
        self.entity.is_some()
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::no_entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let a = TokensGroup::new(2, 5, "a b c", vec![]);
        let b = TokensGroup::new(4, 7, "c d e", vec![]);
        let c = TokensGroup::new(5, 6, "d", vec![]);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.len(), 3);
    }
}
