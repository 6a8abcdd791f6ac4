//! Record chunking strategies
//!
//! A [`RecordChunker`] turns one [`ErrorRecord`] into one or more retrievable
//! [`Chunk`]s. Every chunk keeps the row position of its source record so
//! retrieval results can always be traced back to the corpus.

use crate::corpus::{Corpus, CorpusColumns, ErrorRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Unique chunk identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub uuid::Uuid);

impl ChunkId {
    /// Create a new random chunk ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A retrievable unit of text derived from one corpus record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier
    pub id: ChunkId,
    /// Row position of the source record in the corpus
    pub record_index: usize,
    /// Position of this chunk among the chunks of its record
    pub part: usize,
    /// Chunk text content
    pub content: String,
    /// Embedding vector (populated after embedding, moved out when indexed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Create a new chunk
    #[must_use]
    pub fn new(record_index: usize, content: String) -> Self {
        Self {
            id: ChunkId::new(),
            record_index,
            part: 0,
            content,
            embedding: None,
        }
    }

    /// Set the part number
    #[must_use]
    pub fn with_part(mut self, part: usize) -> Self {
        self.part = part;
        self
    }

    /// Get the length of the chunk in characters
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    /// Check if the chunk is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Set the embedding vector
    pub fn set_embedding(&mut self, embedding: Vec<f32>) {
        self.embedding = Some(embedding);
    }
}

/// Chunking strategy configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// One chunk per record
    #[default]
    WholeRecord,
    /// Split long explanations into several chunks
    SplitExplanation {
        /// Maximum explanation characters per chunk
        max_chars: usize,
        /// Sentences repeated between consecutive chunks
        overlap_sentences: usize,
    },
}

impl ChunkingStrategy {
    /// Instantiate the chunker for this strategy
    #[must_use]
    pub fn build(&self, columns: &CorpusColumns) -> Box<dyn RecordChunker> {
        match self {
            Self::WholeRecord => Box::new(WholeRecordChunker::new(columns.clone())),
            Self::SplitExplanation {
                max_chars,
                overlap_sentences,
            } => Box::new(
                ExplanationSplitChunker::new(*max_chars, *overlap_sentences)
                    .with_columns(columns.clone()),
            ),
        }
    }
}

/// Trait for record chunkers
pub trait RecordChunker: Send + Sync {
    /// Split the record at `index` into chunks
    fn chunk(&self, index: usize, record: &ErrorRecord) -> Result<Vec<Chunk>>;

    /// Strategy name for logging
    fn name(&self) -> &str;
}

/// Chunk every record of a corpus, preserving corpus order
pub fn chunk_corpus(corpus: &Corpus, chunker: &dyn RecordChunker) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::with_capacity(corpus.len());
    for (index, record) in corpus.records().iter().enumerate() {
        chunks.extend(chunker.chunk(index, record)?);
    }

    tracing::debug!(
        chunker = chunker.name(),
        records = corpus.len(),
        chunks = chunks.len(),
        "chunked corpus"
    );
    Ok(chunks)
}

fn render_line(label: &str, value: &str) -> String {
    format!("{label}: {value}")
}

fn check_record(index: usize, record: &ErrorRecord) -> Result<()> {
    if record.erroneous_sentence.trim().is_empty() {
        return Err(Error::CorpusLoad(format!(
            "record {index} has an empty erroneous sentence"
        )));
    }
    Ok(())
}

/// One chunk per record, rendered as labelled lines
#[derive(Debug, Clone, Default)]
pub struct WholeRecordChunker {
    columns: CorpusColumns,
}

impl WholeRecordChunker {
    /// Create a chunker labelling lines with the given column names
    #[must_use]
    pub fn new(columns: CorpusColumns) -> Self {
        Self { columns }
    }

    /// Render a record as `column: value` lines
    #[must_use]
    pub fn render(&self, record: &ErrorRecord) -> String {
        [
            render_line(&self.columns.error, &record.erroneous_sentence),
            render_line(&self.columns.correction, &record.correct_sentence),
            render_line(&self.columns.explanation, &record.explanation),
        ]
        .join("\n")
    }
}

impl RecordChunker for WholeRecordChunker {
    fn chunk(&self, index: usize, record: &ErrorRecord) -> Result<Vec<Chunk>> {
        check_record(index, record)?;
        Ok(vec![Chunk::new(index, self.render(record))])
    }

    fn name(&self) -> &str {
        "whole_record"
    }
}

/// Splits long explanations into several chunks
///
/// Each chunk repeats the error and correction lines followed by a slice of
/// the explanation. Slices end on sentence boundaries where possible, then on
/// word boundaries, and only as a last resort inside a word.
#[derive(Debug, Clone)]
pub struct ExplanationSplitChunker {
    columns: CorpusColumns,
    max_chars: usize,
    overlap_sentences: usize,
}

impl ExplanationSplitChunker {
    /// Create a new splitter
    #[must_use]
    pub fn new(max_chars: usize, overlap_sentences: usize) -> Self {
        Self {
            columns: CorpusColumns::default(),
            max_chars: max_chars.max(1),
            overlap_sentences,
        }
    }

    /// Use custom column labels
    #[must_use]
    pub fn with_columns(mut self, columns: CorpusColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Sentence terminators, Latin and Arabic
    fn is_terminator(c: char) -> bool {
        matches!(c, '.' | '!' | '?' | '؟' | '؛' | '\n')
    }

    fn split_sentences(text: &str) -> Vec<&str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for (i, c) in text.char_indices() {
            if Self::is_terminator(c) {
                let end = i + c.len_utf8();
                let next_char = text[end..].chars().next();
                if next_char.map_or(true, char::is_whitespace) {
                    let sentence = text[start..end].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = end;
                }
            }
        }

        let remaining = text[start..].trim();
        if !remaining.is_empty() {
            sentences.push(remaining);
        }

        sentences
    }

    /// Break a single over-long sentence on whitespace, then on characters
    fn split_long(&self, sentence: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();

        for word in sentence.split_whitespace() {
            let word_len = word.chars().count();
            let current_len = current.chars().count();

            if word_len > self.max_chars {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                pieces.extend(chars.chunks(self.max_chars).map(|c| c.iter().collect()));
                continue;
            }

            let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
            if needed > self.max_chars && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }

        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    fn explanation_slices(&self, explanation: &str) -> Vec<String> {
        let units: Vec<String> = Self::split_sentences(explanation)
            .into_iter()
            .flat_map(|s| {
                if s.chars().count() > self.max_chars {
                    self.split_long(s)
                } else {
                    vec![s.to_string()]
                }
            })
            .collect();

        if units.is_empty() {
            return vec![String::new()];
        }

        let mut slices = Vec::new();
        let mut i = 0;
        while i < units.len() {
            let mut end = i;
            let mut size = 0;
            while end < units.len() {
                let unit_len = units[end].chars().count() + usize::from(end > i);
                if end > i && size + unit_len > self.max_chars {
                    break;
                }
                size += unit_len;
                end += 1;
            }

            slices.push(units[i..end].join(" "));
            if end >= units.len() {
                break;
            }

            let step = (end - i).saturating_sub(self.overlap_sentences);
            i += step.max(1);
        }

        slices
    }
}

impl RecordChunker for ExplanationSplitChunker {
    fn chunk(&self, index: usize, record: &ErrorRecord) -> Result<Vec<Chunk>> {
        check_record(index, record)?;

        let header = [
            render_line(&self.columns.error, &record.erroneous_sentence),
            render_line(&self.columns.correction, &record.correct_sentence),
        ]
        .join("\n");

        Ok(self
            .explanation_slices(&record.explanation)
            .into_iter()
            .enumerate()
            .map(|(part, slice)| {
                let content = format!(
                    "{header}\n{}",
                    render_line(&self.columns.explanation, &slice)
                );
                Chunk::new(index, content).with_part(part)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "split_explanation"
    }
}
