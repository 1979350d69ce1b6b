use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::token::{Grammar, NO_ENTITY_SIGN, Token};

/// Columns of the plain format: index, surface, whitespace flag, link title, entity id.
pub const BASE_FIELDS: usize = 5;
/// Extended format adds lemma and morphological tag.
pub const EXTENDED_FIELDS: usize = 7;

static MORPH_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(:[a-z0-9.]+)*$").expect("morph tag pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("expected at least 5 fields, got {0}")]
    MissingFields(usize),
    #[error("invalid whitespace flag: {0:?}")]
    BadWhitespaceFlag(String),
    #[error("grammar layer incomplete: {0} fields")]
    PartialGrammar(usize),
    #[error("unparseable morphological tag: {0:?}")]
    BadMorphTag(String),
    #[error("row is not valid UTF-8 after byte {0}")]
    InvalidUtf8(usize),
}

/// A parsed row. `dropped_grammar` is set when the row carried a grammar
/// layer that could not be used; the token itself is still valid.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub token: Token,
    pub dropped_grammar: Option<RowError>,
}

pub fn parse_row(line: &str) -> Result<RowOutcome, RowError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < BASE_FIELDS {
        return Err(RowError::MissingFields(fields.len()));
    }

    let preceded_by_space = parse_flag(fields[2])?;
    let mut token = Token {
        surface: fields[1].to_string(),
        preceded_by_space,
        link_title: optional_field(fields[3]),
        entity_id: optional_field(fields[4]),
        grammar: None,
    };

    let dropped_grammar = match fields.len() {
        BASE_FIELDS => None,
        n if n < EXTENDED_FIELDS => Some(RowError::PartialGrammar(n)),
        _ => match parse_grammar(fields[5], fields[6]) {
            Ok(grammar) => {
                token.grammar = Some(grammar);
                None
            }
            Err(e) => Some(e),
        },
    };

    Ok(RowOutcome {
        token,
        dropped_grammar,
    })
}

fn parse_flag(value: &str) -> Result<bool, RowError> {
    match value.trim() {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" | "" => Ok(false),
        other => Err(RowError::BadWhitespaceFlag(other.to_string())),
    }
}

fn optional_field(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == NO_ENTITY_SIGN {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_grammar(lemma: &str, tag: &str) -> Result<Grammar, RowError> {
    let tag = tag.trim();
    if lemma.trim().is_empty() || !MORPH_TAG.is_match(tag) {
        return Err(RowError::BadMorphTag(tag.to_string()));
    }
    Ok(Grammar {
        lemma: lemma.trim().to_string(),
        morph_tags: tag.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_row() {
        let row = parse_row("0\tKraków\t1\tKraków\tQ31487").unwrap();
        assert_eq!(row.token.surface, "Kraków");
        assert!(row.token.preceded_by_space);
        assert_eq!(row.token.entity_id.as_deref(), Some("Q31487"));
        assert!(row.token.grammar.is_none());
        assert!(row.dropped_grammar.is_none());
    }

    #[test]
    fn test_extended_row() {
        let row = parse_row("3\tmiasta\t1\t_\t_\tmiasto\tsubst:sg:gen:n2").unwrap();
        assert_eq!(row.token.entity_id, None);
        assert_eq!(row.token.link_title, None);
        assert_eq!(row.token.pos(), Some("subst"));
        assert_eq!(row.token.lemma(), Some("miasto"));
    }

    #[test]
    fn test_bad_tag_drops_only_grammar() {
        let row = parse_row("3\tmiasta\t0\t_\t_\tmiasto\tSUBST??").unwrap();
        assert!(row.token.grammar.is_none());
        assert!(!row.token.preceded_by_space);
        assert_eq!(row.dropped_grammar, Some(RowError::BadMorphTag("SUBST??".to_string())));

        let row = parse_row("3\tmiasta\t0\t_\t_\tmiasto").unwrap();
        assert_eq!(row.dropped_grammar, Some(RowError::PartialGrammar(6)));
    }

    #[test]
    fn test_fatal_rows() {
        assert_eq!(parse_row("1\tfoo\t1").unwrap_err(), RowError::MissingFields(3));
        assert!(matches!(
            parse_row("1\tfoo\tyes\t_\t_").unwrap_err(),
            RowError::BadWhitespaceFlag(_)
        ));
    }
}
