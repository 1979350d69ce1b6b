use async_trait::async_trait;
use ingest::TokensSequence;
use kb::{ArticleSource, KbError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use typegraph::TypeGraph;

use crate::morph::{MorphAnalyzer, content_lemmas, sentence_content_lemmas};

/// Confidence of one qualifying candidate. `None` leaves the candidate
/// out of the ranking.
#[async_trait]
pub trait ConfidenceScorer: Send + Sync {
    async fn confidence(
        &self,
        sequence: &TokensSequence,
        candidate: &str,
        graph: &TypeGraph,
    ) -> Result<Option<f64>, KbError>;

    fn name(&self) -> &'static str;
}

/// Ranks by the type-graph path score.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphPathScorer;

#[async_trait]
impl ConfidenceScorer for GraphPathScorer {
    async fn confidence(
        &self,
        _sequence: &TokensSequence,
        _candidate: &str,
        graph: &TypeGraph,
    ) -> Result<Option<f64>, KbError> {
        Ok(graph.score())
    }

    fn name(&self) -> &'static str {
        "graph_path"
    }
}

/// Topical overlap between the sentence and the candidate's encyclopedia
/// article: the share of the sentence's noun/adjective lemmas that also
/// occur in the article.
pub struct ContextScorer {
    articles: Arc<dyn ArticleSource>,
    analyzer: Arc<dyn MorphAnalyzer>,
    max_article_len: usize,
}

impl ContextScorer {
    pub fn new(articles: Arc<dyn ArticleSource>, analyzer: Arc<dyn MorphAnalyzer>, max_article_len: usize) -> Self {
        Self {
            articles,
            analyzer,
            max_article_len,
        }
    }

    /// Overlap ratio of `sentence` lemmas found in `article`, 0.0 for a
    /// sentence without content words.
    pub fn similarity(&self, sequence: &TokensSequence, article: &str) -> f64 {
        let sentence = sentence_content_lemmas(self.analyzer.as_ref(), sequence);
        if sentence.is_empty() {
            return 0.0;
        }

        let article = truncate_chars(article, self.max_article_len);
        let article: HashSet<String> = content_lemmas(self.analyzer.as_ref(), article).into_iter().collect();

        let common = sentence.iter().filter(|lemma| article.contains(*lemma)).count();
        common as f64 / sentence.len() as f64
    }
}

#[async_trait]
impl ConfidenceScorer for ContextScorer {
    async fn confidence(
        &self,
        sequence: &TokensSequence,
        candidate: &str,
        _graph: &TypeGraph,
    ) -> Result<Option<f64>, KbError> {
        let Some(article) = self.articles.article_text(candidate).await? else {
            debug!(candidate, "No article, candidate not ranked");
            return Ok(None);
        };
        Ok(Some(self.similarity(sequence, &article)))
    }

    fn name(&self) -> &'static str {
        "context"
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morph::LexiconAnalyzer;
    use ingest::Token;
    use std::collections::HashMap;

    struct FixedArticles(HashMap<String, String>);

    #[async_trait]
    impl ArticleSource for FixedArticles {
        async fn article_text(&self, entity: &str) -> Result<Option<String>, KbError> {
            Ok(self.0.get(entity).cloned())
        }
    }

    fn sentence() -> TokensSequence {
        TokensSequence::new(
            0,
            vec![
                Token::new("Nowy", None).with_grammar("nowy", "adj:sg:nom:m3:pos"),
                Token::new("Targ", None).with_grammar("targ", "subst:sg:nom:m3"),
                Token::new("to", None).with_grammar("to", "pred"),
                Token::new("miasto", None).with_grammar("miasto", "subst:sg:nom:n"),
                Token::new("powiatowe", None).with_grammar("powiatowy", "adj:sg:nom:n:pos"),
            ],
        )
    }

    fn scorer(articles: &[(&str, &str)], max_len: usize) -> ContextScorer {
        let analyzer = Arc::new(LexiconAnalyzer::from_sequences(&[sentence()]));
        let articles = articles.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ContextScorer::new(Arc::new(FixedArticles(articles)), analyzer, max_len)
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("zażółć", 3), "zaż");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn test_context_similarity() {
        let scorer = scorer(&[("Q2616791", "Nowy Targ – miasto powiatowe nad Dunajcem.")], 5000);
        let graph = TypeGraph::new("Q2616791");
        let score = scorer.confidence(&sentence(), "Q2616791", &graph).await.unwrap().unwrap();
        // nowy, targ, miasto, powiatowy all appear in the article
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_article_truncated() {
        let scorer = scorer(&[("Q1", "Nowy Targ miasto powiatowe")], 9);
        let graph = TypeGraph::new("Q1");
        let score = scorer.confidence(&sentence(), "Q1", &graph).await.unwrap().unwrap();
        // only "Nowy Targ" survives truncation: 2 of 4 content lemmas
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_article_not_ranked() {
        let scorer = scorer(&[], 5000);
        let graph = TypeGraph::new("Q1");
        assert_eq!(scorer.confidence(&sentence(), "Q1", &graph).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sentence_without_content_words_scores_zero() {
        let scorer = scorer(&[("Q1", "w Nowym Targu jest rynek")], 5000);
        let sequence = TokensSequence::new(
            1,
            vec![
                Token::new("w", None).with_grammar("w", "prep:loc:nwok"),
                Token::new("jest", None).with_grammar("być", "fin:sg:ter:imperf"),
            ],
        );
        let graph = TypeGraph::new("Q1");

        assert_eq!(scorer.similarity(&sequence, "w Nowym Targu jest rynek"), 0.0);
        assert_eq!(scorer.confidence(&sequence, "Q1", &graph).await.unwrap(), Some(0.0));
    }

    #[tokio::test]
    async fn test_graph_scorer() {
        let mut graph = TypeGraph::new("Q2616791");
        graph.add_edge("Q2616791", "Q2221906");
        let score = GraphPathScorer.confidence(&sentence(), "Q2616791", &graph).await.unwrap();
        assert_eq!(score, Some(0.5));
    }
}
