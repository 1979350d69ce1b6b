pub mod reader;
pub mod row;
pub mod token;

pub use reader::{LoadedSequences, SequenceReader, SkippedSequence, parse_sequences};
pub use row::{RowError, RowOutcome, parse_row};
pub use token::{Grammar, NO_ENTITY_SIGN, Token, TokensSequence};

/// Coarse tag sequences of ground-truth entity mentions: runs of adjacent
/// tokens that share one entity id. Mentions with an untagged token are left out.
pub fn entity_tag_patterns(sequences: &[TokensSequence]) -> Vec<Vec<String>> {
    let mut patterns = Vec::new();

    for seq in sequences {
        let mut start = 0;
        while start < seq.len() {
            let Some(entity) = seq.tokens[start].entity_id.as_deref() else {
                start += 1;
                continue;
            };

            let mut end = start + 1;
            while end < seq.len() && seq.tokens[end].entity_id.as_deref() == Some(entity) {
                end += 1;
            }

            if let Some(tags) = seq.coarse_tags(start, end) {
                patterns.push(tags.into_iter().map(String::from).collect());
            }
            start = end;
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_tag_patterns() {
        let q = |id: &str| Some(id.to_string());
        let seq = TokensSequence::new(
            0,
            vec![
                Token::new("Nowy", q("Q1")).with_grammar("nowy", "adj:sg:nom:m3:pos"),
                Token::new("Targ", q("Q1")).with_grammar("targ", "subst:sg:nom:m3"),
                Token::new("i", None).with_grammar("i", "conj"),
                Token::new("Kraków", q("Q2")).with_grammar("Kraków", "subst:sg:nom:m3"),
                Token::new("Wisła", q("Q3")),
            ],
        );

        let patterns = entity_tag_patterns(&[seq]);
        assert_eq!(
            patterns,
            vec![
                vec!["adj".to_string(), "subst".to_string()],
                vec!["subst".to_string()],
            ]
        );
    }
}
