use ingest::{Token, TokensSequence};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Coarse tag given to words the analyzer does not know.
pub const UNKNOWN_TAG: &str = "ign";

/// Coarse classes that carry the topic of a text: nouns and adjectives.
pub const CONTENT_TAGS: [&str; 2] = ["subst", "adj"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub lemma: String,
    /// Coarse part of speech, e.g. `subst`.
    pub pos: String,
}

/// Morphological analysis of free text.
///
/// One analyzer is built at startup and shared behind an `Arc`.
pub trait MorphAnalyzer: Send + Sync {
    /// One analysis per word, in text order.
    fn analyze(&self, text: &str) -> Vec<Analysis>;
}

/// Analyzer backed by a surface-form lexicon collected from a tagged corpus.
/// The first analysis seen for a form wins.
#[derive(Debug, Default)]
pub struct LexiconAnalyzer {
    lexicon: HashMap<String, Analysis>,
}

impl LexiconAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sequences(sequences: &[TokensSequence]) -> Self {
        let mut analyzer = Self::new();
        for token in sequences.iter().flat_map(|s| &s.tokens) {
            analyzer.learn(token);
        }
        analyzer
    }

    pub fn learn(&mut self, token: &Token) {
        let Some(grammar) = &token.grammar else {
            return;
        };
        self.lexicon
            .entry(token.surface.to_lowercase())
            .or_insert_with(|| Analysis {
                lemma: grammar.lemma.to_lowercase(),
                pos: grammar.pos().to_string(),
            });
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }
}

impl MorphAnalyzer for LexiconAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Analysis> {
        text.unicode_words()
            .map(|word| {
                let word = word.to_lowercase();
                self.lexicon.get(&word).cloned().unwrap_or(Analysis {
                    lemma: word,
                    pos: UNKNOWN_TAG.to_string(),
                })
            })
            .collect()
    }
}

pub fn is_content_tag(pos: &str) -> bool {
    CONTENT_TAGS.contains(&pos)
}

/// Distinct lowercase noun/adjective lemmas of `text`, first occurrence first.
pub fn content_lemmas(analyzer: &dyn MorphAnalyzer, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    analyzer
        .analyze(text)
        .into_iter()
        .filter(|a| is_content_tag(&a.pos))
        .filter(|a| seen.insert(a.lemma.clone()))
        .map(|a| a.lemma)
        .collect()
}

/// Lowercase noun/adjective lemmas of a sentence, one per token occurrence.
/// Tokens without a grammar layer go through `analyzer`.
pub fn sentence_content_lemmas(analyzer: &dyn MorphAnalyzer, sequence: &TokensSequence) -> Vec<String> {
    let mut lemmas = Vec::new();
    for token in &sequence.tokens {
        match &token.grammar {
            Some(grammar) => {
                if is_content_tag(grammar.pos()) {
                    lemmas.push(grammar.lemma.to_lowercase());
                }
            }
            None => lemmas.extend(
                analyzer
                    .analyze(&token.surface)
                    .into_iter()
                    .filter(|a| is_content_tag(&a.pos))
                    .map(|a| a.lemma),
            ),
        }
    }
    lemmas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<TokensSequence> {
        vec![TokensSequence::new(
            0,
            vec![
                Token::new("Miasto", None).with_grammar("miasto", "subst:sg:nom:n"),
                Token::new("leży", None).with_grammar("leżeć", "fin:sg:ter:imperf"),
                Token::new("nad", None).with_grammar("nad", "prep:inst"),
                Token::new("Dunajcem", None).with_grammar("Dunajec", "subst:sg:inst:m3"),
                Token::new("górskim", None).with_grammar("górski", "adj:sg:inst:m3:pos"),
            ],
        )]
    }

    #[test]
    fn test_lexicon_analysis() {
        let analyzer = LexiconAnalyzer::from_sequences(&corpus());
        assert_eq!(analyzer.len(), 5);

        let analyses = analyzer.analyze("Miasto, nad Dunajcem; zamek.");
        assert_eq!(analyses.len(), 4);
        assert_eq!(analyses[0], Analysis { lemma: "miasto".into(), pos: "subst".into() });
        assert_eq!(analyses[2].lemma, "dunajec");
        assert_eq!(analyses[3], Analysis { lemma: "zamek".into(), pos: UNKNOWN_TAG.into() });
    }

    #[test]
    fn test_content_lemmas_dedup() {
        let analyzer = LexiconAnalyzer::from_sequences(&corpus());
        let lemmas = content_lemmas(&analyzer, "Miasto leży nad Dunajcem. Miasto górskim");
        assert_eq!(lemmas, vec!["miasto", "dunajec", "górski"]);
    }

    #[test]
    fn test_sentence_lemmas_keep_repeats() {
        let analyzer = LexiconAnalyzer::new();
        let mut sequence = corpus().remove(0);
        sequence.tokens.push(Token::new("miasto", None).with_grammar("miasto", "subst:sg:acc:n"));
        sequence.tokens.push(Token::new("Kraków", None));

        let lemmas = sentence_content_lemmas(&analyzer, &sequence);
        // untagged "Kraków" is unknown to an empty lexicon, hence `ign`
        assert_eq!(lemmas, vec!["miasto", "dunajec", "górski", "miasto"]);
    }
}
