use anyhow::{Context, Result};
use eval::ClassificationReport;
use ingest::SequenceReader;
use kb::{ArticleSource, RetryPolicy, WikipediaClient, open_knowledge_base};
use linker::{
    BatchRunner, ClassifierKind, EntityClassifier, LexiconAnalyzer, LinkerConfig,
    MorphPatternTokenizer, RunMetrics, TokenizerKind,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Classify the configured input file and write a report directory.
/// Config comes from the JSON file named by `ENTITY_LINKING_CONFIG`.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = LinkerConfig::from_env()?;
    let input = &config.run.input_file;

    println!("=== Entity linking run ===\n");
    println!("Input: {}", input.display());

    let loaded = SequenceReader::read_file(input, config.run.sequences).await?;
    println!(
        "Loaded {} sequences ({} skipped)",
        loaded.sequences.len(),
        loaded.skipped.len()
    );

    let retry = RetryPolicy::from_config(&config.retry);
    let kb = open_knowledge_base(&config.knowledge_base, retry.clone())?;

    let articles: Option<Arc<dyn ArticleSource>> = match config.classifier.kind {
        ClassifierKind::Graph => None,
        ClassifierKind::WithContext => {
            let client: Arc<dyn ArticleSource> = Arc::new(
                WikipediaClient::new(&config.knowledge_base.wikidata, retry)
                    .context("Failed to build Wikipedia client")?,
            );
            Some(client)
        }
    };

    let patterns = (config.tokenizer.kind == TokenizerKind::MorphPattern && config.tokenizer.learn_patterns)
        .then(|| MorphPatternTokenizer::learned_patterns(&loaded.sequences, config.tokenizer.max_length));
    if let Some(patterns) = &patterns {
        info!(patterns = patterns.len(), "Learned tag patterns from input");
    }

    let analyzer = Arc::new(LexiconAnalyzer::from_sequences(&loaded.sequences));
    let metrics = RunMetrics::new();
    let classifier = EntityClassifier::from_config(&config, kb, articles, analyzer, patterns, metrics.clone())?;
    let method = classifier.describe();
    println!("Method: {}\n", method);

    let runner = BatchRunner::new(Arc::new(classifier), config.concurrency.workers);
    let outcome = runner
        .run(loaded.sequences)
        .await
        .context("Classification aborted")?;

    let mut skipped = loaded.skipped;
    skipped.extend(outcome.skipped);

    let report = ClassificationReport::new(
        input.display().to_string(),
        method,
        outcome.classified,
        skipped,
        &outcome.rows,
    )
    .with_metrics(metrics.snapshot());

    println!("{}", report.render());

    let dir = report.write(&config.run.report_dir, &outcome.rows)?;
    println!("Report written to {}", dir.display());
    Ok(())
}
