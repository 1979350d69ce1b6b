use anyhow::{Context, Result};
use neo4rs::{Graph, Query};
use std::fmt;
use tracing::info;

use crate::graph::TypeGraph;
use crate::target::target_label;

/// Mirror of expanded type graphs in Neo4j:
/// `(:Entity {id})-[:PARENT_TYPE]->(:Entity {id})`.
pub struct GraphMirror {
    graph: Graph,
}

impl GraphMirror {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context(format!("Failed to connect to Neo4j at {}", uri))?;
        Ok(Self::new(graph))
    }

    /// Initialize schema: create indexes
    pub async fn init_schema(&self) -> Result<()> {
        let query = Query::new(
            "CREATE INDEX entity_id_index IF NOT EXISTS FOR (e:Entity) ON (e.id)".to_string()
        );
        self.graph.run(query).await
            .context("Failed to create index on Entity.id")?;

        info!("Neo4j indexes ready");
        Ok(())
    }

    /// MERGE every node and edge of `graph`; re-saving is a no-op.
    pub async fn save_graph(&self, graph: &TypeGraph) -> Result<()> {
        for write in mirror_writes(graph) {
            self.graph.run(write.query()).await
                .context(format!("Failed to save {}", write))?;
        }

        info!(
            root = graph.root(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Mirrored type graph"
        );
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<MirrorStats> {
        let query = Query::new("MATCH (e:Entity) RETURN count(e) as count".to_string());
        let mut result = self.graph.execute(query).await?;
        let entity_count = if let Some(row) = result.next().await? {
            row.get::<i64>("count").unwrap_or(0) as usize
        } else {
            0
        };

        let query = Query::new("MATCH ()-[r:PARENT_TYPE]->() RETURN count(r) as count".to_string());
        let mut result = self.graph.execute(query).await?;
        let edge_count = if let Some(row) = result.next().await? {
            row.get::<i64>("count").unwrap_or(0) as usize
        } else {
            0
        };

        Ok(MirrorStats {
            entity_count,
            edge_count,
        })
    }
}

#[derive(Debug)]
pub struct MirrorStats {
    pub entity_count: usize,
    pub edge_count: usize,
}

/// One MERGE issued by [`GraphMirror::save_graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum MirrorWrite {
    /// `target` is the target-type label, empty for other entities.
    Entity { id: String, target: String },
    ParentType { child: String, parent: String },
}

impl MirrorWrite {
    fn query(&self) -> Query {
        match self {
            MirrorWrite::Entity { id, target } => Query::new(
                r#"
                MERGE (e:Entity {id: $id})
                SET e.target = $target
                "#.to_string()
            )
            .param("id", id.clone())
            .param("target", target.clone()),
            MirrorWrite::ParentType { child, parent } => Query::new(
                r#"
                MATCH (child:Entity {id: $child_id})
                MATCH (parent:Entity {id: $parent_id})
                MERGE (child)-[:PARENT_TYPE]->(parent)
                "#.to_string()
            )
            .param("child_id", child.clone())
            .param("parent_id", parent.clone()),
        }
    }
}

impl fmt::Display for MirrorWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorWrite::Entity { id, .. } => write!(f, "entity {}", id),
            MirrorWrite::ParentType { child, parent } => write!(f, "edge {} -> {}", child, parent),
        }
    }
}

/// Nodes first, so every edge finds both endpoints.
fn mirror_writes(graph: &TypeGraph) -> Vec<MirrorWrite> {
    let entities = graph.nodes().map(|id| MirrorWrite::Entity {
        id: id.to_string(),
        target: target_label(id).unwrap_or_default().to_string(),
    });
    let edges = graph.edges().into_iter().map(|(child, parent)| MirrorWrite::ParentType {
        child: child.to_string(),
        parent: parent.to_string(),
    });
    entities.chain(edges).collect()
}
