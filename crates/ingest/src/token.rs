use serde::{Deserialize, Serialize};

/// Marker used by the input files for "no entity" / "no link".
pub const NO_ENTITY_SIGN: &str = "_";

/// Lemma and morphological tag attached to a token by the tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    pub lemma: String,
    pub morph_tags: String,
}

impl Grammar {
    /// Coarse part of speech: the first colon-delimited segment of the tag.
    pub fn pos(&self) -> &str {
        self.morph_tags.split(':').next().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub surface: String,
    pub preceded_by_space: bool,
    pub link_title: Option<String>,
    pub entity_id: Option<String>,
    pub grammar: Option<Grammar>,
}

impl Token {
    pub fn new(surface: impl Into<String>, entity_id: Option<String>) -> Self {
        Self {
            surface: surface.into(),
            preceded_by_space: true,
            link_title: None,
            entity_id,
            grammar: None,
        }
    }

    pub fn with_grammar(mut self, lemma: impl Into<String>, morph_tags: impl Into<String>) -> Self {
        self.grammar = Some(Grammar {
            lemma: lemma.into(),
            morph_tags: morph_tags.into(),
        });
        self
    }

    pub fn is_entity(&self) -> bool {
        self.entity_id.is_some()
    }

    pub fn lemma(&self) -> Option<&str> {
        self.grammar.as_ref().map(|g| g.lemma.as_str())
    }

    pub fn pos(&self) -> Option<&str> {
        self.grammar.as_ref().map(|g| g.pos())
    }
}

/// One sentence in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokensSequence {
    pub id: usize,
    pub tokens: Vec<Token>,
}

impl TokensSequence {
    pub fn new(id: usize, tokens: Vec<Token>) -> Self {
        Self { id, tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Surface forms of `[start, end)` joined with single spaces.
    pub fn surface_text(&self, start: usize, end: usize) -> String {
        self.tokens[start..end]
            .iter()
            .map(|t| t.surface.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Lemmas of `[start, end)` joined with single spaces, `None` when any
    /// token in the range has no grammar layer.
    pub fn lemma_text(&self, start: usize, end: usize) -> Option<String> {
        let lemmas: Option<Vec<&str>> = self.tokens[start..end].iter().map(|t| t.lemma()).collect();
        lemmas.map(|l| l.join(" "))
    }

    /// Coarse tag sequence of `[start, end)`, `None` when any token is untagged.
    pub fn coarse_tags(&self, start: usize, end: usize) -> Option<Vec<&str>> {
        self.tokens[start..end].iter().map(|t| t.pos()).collect()
    }
}
