use kb::EntityId;
use petgraph::algo::{all_simple_paths, dijkstra};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::target::{TARGET_TYPES, is_target_type};

/// Ancestor-type graph of one candidate entity. Edges point from an entity
/// to each of its direct parent types.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    graph: DiGraph<EntityId, ()>,
    index: HashMap<EntityId, NodeIndex>,
    root: NodeIndex,
}

impl TypeGraph {
    pub fn new(root: &str) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let root_idx = graph.add_node(root.to_string());
        index.insert(root.to_string(), root_idx);
        Self {
            graph,
            index,
            root: root_idx,
        }
    }

    pub fn root(&self) -> &str {
        &self.graph[self.root]
    }

    pub fn add_node(&mut self, entity: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(entity) {
            return idx;
        }

        let idx = self.graph.add_node(entity.to_string());
        self.index.insert(entity.to_string(), idx);
        idx
    }

    /// Add `child -> parent`. Repeated edges collapse into one.
    pub fn add_edge(&mut self, child: &str, parent: &str) {
        let child = self.add_node(child);
        let parent = self.add_node(parent);
        self.graph.update_edge(child, parent, ());
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.index.contains_key(entity)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(String::as_str)
    }

    /// `(child, parent)` pairs.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].as_str(), self.graph[b].as_str()))
            .collect()
    }

    /// Largest number of hops from the root to any node along a shortest path,
    /// i.e. the number of expansion levels used. Longer simple paths may exist
    /// when levels share nodes.
    pub fn depth(&self) -> usize {
        dijkstra(&self.graph, self.root, None, |_| 1usize)
            .into_values()
            .max()
            .unwrap_or(0)
    }

    pub fn contains_target(&self) -> bool {
        self.nodes().any(is_target_type)
    }

    /// Per-target path scores: for each target type present, the sum of
    /// `1 / n` over every simple path from the root, `n` counting nodes.
    pub fn target_scores(&self) -> Vec<(&'static str, f64)> {
        TARGET_TYPES
            .iter()
            .filter_map(|(target, _)| {
                let &idx = self.index.get(*target)?;
                Some((*target, self.paths_score(idx)))
            })
            .collect()
    }

    /// Best per-target score, `None` when the graph holds no target type.
    pub fn score(&self) -> Option<f64> {
        self.target_scores()
            .into_iter()
            .map(|(_, score)| score)
            .reduce(f64::max)
    }

    fn paths_score(&self, target: NodeIndex) -> f64 {
        // the root itself is a one-node path
        if target == self.root {
            return 1.0;
        }

        all_simple_paths::<Vec<_>, _>(&self.graph, self.root, target, 0, None)
            .map(|path| 1.0 / path.len() as f64)
            .sum()
    }
}
