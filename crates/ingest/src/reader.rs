use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::row::{RowError, parse_row};
use crate::token::{Token, TokensSequence};

/// A sentence that could not be loaded; it is reported, never classified.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSequence {
    pub id: usize,
    /// Input line that broke the sentence, if it failed while loading.
    pub line: Option<usize>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedSequences {
    pub sequences: Vec<TokensSequence>,
    pub skipped: Vec<SkippedSequence>,
}

impl LoadedSequences {
    /// Sentences read from the input, loaded or not.
    pub fn total(&self) -> usize {
        self.sequences.len() + self.skipped.len()
    }
}

/// Groups tab-separated token rows into sentences. A blank line closes the
/// current sentence; a fatal row poisons the sentence it belongs to.
struct SequenceAssembler {
    limit: usize,
    next_id: usize,
    line_no: usize,
    tokens: Vec<Token>,
    failure: Option<(usize, RowError)>,
    loaded: LoadedSequences,
}

impl SequenceAssembler {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            next_id: 0,
            line_no: 0,
            tokens: Vec::new(),
            failure: None,
            loaded: LoadedSequences::default(),
        }
    }

    fn is_full(&self) -> bool {
        self.loaded.total() >= self.limit
    }

    fn push_line(&mut self, line: &str) {
        self.line_no += 1;
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() {
            self.close();
            return;
        }
        if self.failure.is_some() {
            return;
        }

        match parse_row(line) {
            Ok(outcome) => {
                if let Some(e) = outcome.dropped_grammar {
                    warn!(sequence = self.next_id, line = self.line_no, error = %e, "Dropping grammar layer");
                }
                self.tokens.push(outcome.token);
            }
            Err(e) => self.failure = Some((self.line_no, e)),
        }
    }

    /// A row that could not even be decoded poisons its sentence.
    fn push_undecodable(&mut self, error: RowError) {
        self.line_no += 1;
        if self.failure.is_none() {
            self.failure = Some((self.line_no, error));
        }
    }

    fn close(&mut self) {
        let tokens = std::mem::take(&mut self.tokens);
        let failure = self.failure.take();

        if tokens.is_empty() && failure.is_none() {
            return;
        }

        let id = self.next_id;
        self.next_id += 1;

        match failure {
            Some((line, e)) => {
                warn!(sequence = id, line, error = %e, "Skipping malformed sequence");
                self.loaded.skipped.push(SkippedSequence {
                    id,
                    line: Some(line),
                    reason: e.to_string(),
                });
            }
            None => self.loaded.sequences.push(TokensSequence::new(id, tokens)),
        }
    }

    fn finish(mut self) -> LoadedSequences {
        if !self.is_full() {
            self.close();
        }
        self.loaded
    }
}

/// Parse sentences from an in-memory TSV document.
pub fn parse_sequences(text: &str, limit: usize) -> LoadedSequences {
    let mut assembler = SequenceAssembler::new(limit);
    for line in text.lines() {
        if assembler.is_full() {
            break;
        }
        assembler.push_line(line);
    }
    assembler.finish()
}

pub struct SequenceReader;

impl SequenceReader {
    /// Stream at most `limit` sentences from a TSV file. The file is never read
    /// past the last requested sentence.
    pub async fn read_file(path: &Path, limit: usize) -> Result<LoadedSequences> {
        let file = File::open(path)
            .await
            .context(format!("Failed to open input file: {:?}", path))?;

        let mut reader = BufReader::new(file);
        let mut assembler = SequenceAssembler::new(limit);
        let mut buf = Vec::new();

        while !assembler.is_full() {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .context(format!("Failed to read input file: {:?}", path))?;
            if read == 0 {
                break;
            }

            match std::str::from_utf8(&buf) {
                Ok(line) => assembler.push_line(line),
                Err(e) => assembler.push_undecodable(RowError::InvalidUtf8(e.valid_up_to())),
            }
        }

        let loaded = assembler.finish();
        debug!(
            loaded = loaded.sequences.len(),
            skipped = loaded.skipped.len(),
            "Finished reading sequences"
        );
        Ok(loaded)
    }
}
