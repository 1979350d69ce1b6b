use kb::{KbError, KnowledgeBaseApi};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::graph::TypeGraph;
use crate::target::DISAMBIGUATION_PAGE;

pub const DEFAULT_DEPTH: usize = 5;

/// Builds bounded ancestor-type graphs level by level over a knowledge base.
///
/// Graphs are built fresh on every call; memoization of lookups is the
/// knowledge base's business.
#[derive(Clone)]
pub struct GraphExpander {
    kb: Arc<dyn KnowledgeBaseApi>,
    depth: usize,
}

impl GraphExpander {
    pub fn new(kb: Arc<dyn KnowledgeBaseApi>, depth: usize) -> Self {
        Self { kb, depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Breadth-first expansion of `root` for `depth` levels.
    ///
    /// Every frontier member is asked for its parents; each parent gets an
    /// edge from the child and joins the next frontier. An entity may be
    /// expanded again on a later level. The disambiguation page is never
    /// expanded. Any lookup error aborts the expansion.
    pub async fn expand(&self, root: &str) -> Result<TypeGraph, KbError> {
        let mut graph = TypeGraph::new(root);
        let mut frontier = vec![root.to_string()];

        for level in 0..self.depth {
            if frontier.is_empty() {
                break;
            }

            let mut next = Vec::new();
            let mut queued = HashSet::new();

            for entity in &frontier {
                if entity == DISAMBIGUATION_PAGE {
                    continue;
                }

                for parent in self.kb.parent_types(entity).await? {
                    graph.add_edge(entity, &parent);
                    if queued.insert(parent.clone()) {
                        next.push(parent);
                    }
                }
            }

            debug!(root, level, frontier = next.len(), "Expanded level");
            frontier = next;
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb::InMemoryKnowledgeBase;

    /// Q2616791 (Nowy Targ) -> Q515 (city) -> Q486972 (human settlement) -> Q2221906
    fn city_kb() -> InMemoryKnowledgeBase {
        InMemoryKnowledgeBase::new()
            .with_parents("Q2616791", &["Q515", "Q3957"])
            .with_parents("Q515", &["Q486972"])
            .with_parents("Q3957", &["Q486972"])
            .with_parents("Q486972", &["Q2221906"])
            .with_parents("Q2221906", &["Q58415929"])
    }

    fn build(kb: InMemoryKnowledgeBase, depth: usize) -> (Arc<InMemoryKnowledgeBase>, GraphExpander) {
        let kb = Arc::new(kb);
        (kb.clone(), GraphExpander::new(kb, depth))
    }

    #[tokio::test]
    async fn test_depth_zero_is_root_only() {
        let (kb, expander) = build(city_kb(), 0);
        let graph = expander.expand("Q2616791").await.unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(kb.parent_calls(), 0);
    }

    #[tokio::test]
    async fn test_depth_bounds_bfs_levels() {
        for depth in 0..6 {
            let (_, expander) = build(city_kb(), depth);
            let graph = expander.expand("Q2616791").await.unwrap();
            assert!(graph.depth() <= depth);
        }

        let (_, expander) = build(city_kb(), 2);
        let graph = expander.expand("Q2616791").await.unwrap();
        assert!(graph.contains("Q486972"));
        assert!(!graph.contains("Q2221906"));
    }

    #[tokio::test]
    async fn test_shared_node_lengthens_paths_past_depth() {
        // Q1 -> {Q2, Q3}, Q3 -> Q2, Q2 -> Q4
        let kb = InMemoryKnowledgeBase::new()
            .with_parents("Q1", &["Q2", "Q3"])
            .with_parents("Q3", &["Q2"])
            .with_parents("Q2", &["Q4"]);
        let (_, expander) = build(kb, 2);
        let graph = expander.expand("Q1").await.unwrap();

        // Q2 sits on level 1, so Q4 is one level further, yet the edge
        // Q3 -> Q2 makes Q1 -> Q3 -> Q2 -> Q4 a three-hop path.
        assert_eq!(graph.depth(), 2);
        let edges = graph.edges();
        for edge in [("Q1", "Q2"), ("Q1", "Q3"), ("Q3", "Q2"), ("Q2", "Q4")] {
            assert!(edges.contains(&edge), "missing {:?}", edge);
        }
        assert_eq!(graph.edge_count(), 4);
    }

    #[tokio::test]
    async fn test_contains_target_monotonic_in_depth() {
        let mut found = false;
        for depth in 0..6 {
            let (_, expander) = build(city_kb(), depth);
            let graph = expander.expand("Q2616791").await.unwrap();
            if found {
                assert!(graph.contains_target());
            }
            found = graph.contains_target();
        }
        assert!(found);
    }

    #[tokio::test]
    async fn test_score_positive_when_target_found() {
        let (_, expander) = build(city_kb(), 5);
        let graph = expander.expand("Q2616791").await.unwrap();
        assert!(graph.contains_target());
        // two four-node paths: via Q515 and via Q3957
        assert!((graph.score().unwrap() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_disambiguation_page_not_expanded() {
        let kb = InMemoryKnowledgeBase::new()
            .with_parents("Q100", &[DISAMBIGUATION_PAGE])
            .with_parents(DISAMBIGUATION_PAGE, &["Q5"]);
        let (kb, expander) = build(kb, 3);
        let graph = expander.expand("Q100").await.unwrap();

        assert!(graph.contains(DISAMBIGUATION_PAGE));
        assert!(!graph.contains("Q5"));
        assert!(!graph.contains_target());
        assert_eq!(kb.parent_calls(), 1);
    }

    #[tokio::test]
    async fn test_expand_is_idempotent() {
        let (_, expander) = build(city_kb(), 4);
        let first = expander.expand("Q2616791").await.unwrap();
        let second = expander.expand("Q2616791").await.unwrap();

        let mut a: Vec<_> = first.nodes().collect();
        let mut b: Vec<_> = second.nodes().collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_lookup_error_propagates() {
        let kb = city_kb().failing_entity("Q515");
        let (_, expander) = build(kb, 3);
        let err = expander.expand("Q2616791").await.unwrap_err();
        assert!(!err.is_fatal());
    }
}
