use anyhow::{Context, Result, bail};
use kb::{KnowledgeBaseSettings, RetryConfig, RetryPolicy, open_knowledge_base};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use typegraph::{DEFAULT_DEPTH, GraphExpander, GraphMirror};

/// Expand the entity ids given as arguments and mirror their type graphs
/// into Neo4j (`NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD`).
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let entities: Vec<String> = std::env::args().skip(1).collect();
    if entities.is_empty() {
        bail!("usage: mirror_types <entity id>...");
    }

    let uri = std::env::var("NEO4J_URI").unwrap_or_else(|_| "bolt://localhost:7687".to_string());
    let user = std::env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string());
    let password = std::env::var("NEO4J_PASSWORD").context("NEO4J_PASSWORD is not set")?;

    let kb = open_knowledge_base(
        &KnowledgeBaseSettings::default(),
        RetryPolicy::from_config(&RetryConfig::default()),
    )?;
    let expander = GraphExpander::new(kb, DEFAULT_DEPTH);

    let mirror = GraphMirror::connect(&uri, &user, &password).await?;
    mirror.init_schema().await?;

    for entity in &entities {
        match expander.expand(entity).await {
            Ok(graph) => mirror.save_graph(&graph).await?,
            Err(e) if e.is_fatal() => return Err(e).context("Knowledge base unavailable"),
            Err(e) => warn!(entity = %entity, error = %e, "Expansion failed"),
        }
    }

    let stats = mirror.get_stats().await?;
    info!(entities = stats.entity_count, edges = stats.edge_count, "Mirror updated");
    Ok(())
}
