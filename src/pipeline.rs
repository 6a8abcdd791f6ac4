//! Correction pipeline: direct, retrieval-augmented and paraphrase modes

use crate::{
    chunk::{chunk_corpus, RecordChunker, WholeRecordChunker},
    corpus::Corpus,
    embed::Embedder,
    generate::{GenerationOptions, Generator},
    index::{DistanceMetric, SearchHit, VectorStore},
    prompt::{self, AssembledContext, ContextAssembler},
    response::{parse_paraphrases, CorrectionResponse},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How a sentence is turned into a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Correction instructions only
    Direct,
    /// Correction instructions preceded by similar corpus records
    Retrieval,
    /// Five rewordings of the sentence
    Paraphrase,
}

impl Mode {
    /// All modes in the order they are usually run
    pub const ALL: [Mode; 3] = [Mode::Direct, Mode::Retrieval, Mode::Paraphrase];

    /// Lowercase mode name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Retrieval => "retrieval",
            Self::Paraphrase => "paraphrase",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The prompt sent, the completion received and any retrieved records
#[derive(Debug, Clone, Serialize)]
pub struct ModeOutput {
    /// Mode that produced this output
    pub mode: Mode,
    /// Input sentence, trimmed
    pub sentence: String,
    /// Prompt sent to the generator
    pub prompt: String,
    /// Raw completion
    pub response: String,
    /// Retrieved chunks (retrieval mode only)
    pub hits: Vec<SearchHit>,
}

impl ModeOutput {
    /// Parse the completion as a labelled correction
    pub fn parsed(&self) -> Result<CorrectionResponse> {
        CorrectionResponse::parse(&self.response)
    }

    /// Completion split into one paraphrase per line
    #[must_use]
    pub fn paraphrases(&self) -> Vec<String> {
        parse_paraphrases(&self.response)
    }
}

/// Complete correction pipeline
///
/// Owns the corpus snapshot and the index built from it; every method takes
/// `&self`. The corpus is chunked and embedded on first use of retrieval, so
/// direct and paraphrase runs never call the embedder.
pub struct RagPipeline<E: Embedder, G: Generator> {
    corpus: Corpus,
    chunker: Box<dyn RecordChunker>,
    metric: DistanceMetric,
    store: OnceLock<VectorStore>,
    embedder: E,
    generator: G,
    options: GenerationOptions,
    assembler: ContextAssembler,
    top_k: usize,
}

impl<E: Embedder, G: Generator> std::fmt::Debug for RagPipeline<E, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("records", &self.corpus.len())
            .field("chunks", &self.store.get().map(VectorStore::len))
            .field("embedder", &self.embedder.model_id())
            .field("generator", &self.generator.model_id())
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl<E: Embedder, G: Generator> RagPipeline<E, G> {
    /// Run one mode
    pub fn run(&self, mode: Mode, sentence: &str) -> Result<ModeOutput> {
        match mode {
            Mode::Direct => self.direct(sentence),
            Mode::Retrieval => self.retrieve(sentence),
            Mode::Paraphrase => self.paraphrase(sentence),
        }
    }

    /// Ask for a correction without retrieval
    pub fn direct(&self, sentence: &str) -> Result<ModeOutput> {
        let sentence = check_sentence(sentence)?;
        let prompt = prompt::correction_prompt(sentence);
        self.complete(Mode::Direct, sentence, prompt, Vec::new())
    }

    /// Ask for a correction with the `top_k` most similar corpus records
    /// as context
    pub fn retrieve(&self, sentence: &str) -> Result<ModeOutput> {
        let sentence = check_sentence(sentence)?;
        let hits = self.search_checked(sentence)?;
        let context = self.assembler.assemble(&hits);
        let prompt = prompt::retrieval_prompt(&context.format_plain(), sentence);
        self.complete(Mode::Retrieval, sentence, prompt, hits)
    }

    /// Ask for five dissimilar rewordings of the sentence
    pub fn paraphrase(&self, sentence: &str) -> Result<ModeOutput> {
        let sentence = check_sentence(sentence)?;
        let prompt = prompt::paraphrase_prompt(sentence);
        self.complete(Mode::Paraphrase, sentence, prompt, Vec::new())
    }

    /// Retrieve the `top_k` chunks most similar to the sentence
    pub fn search(&self, sentence: &str) -> Result<Vec<SearchHit>> {
        self.search_checked(check_sentence(sentence)?)
    }

    /// Assemble prompt context from hits
    #[must_use]
    pub fn assemble_context(&self, hits: &[SearchHit]) -> AssembledContext {
        self.assembler.assemble(hits)
    }

    fn search_checked(&self, sentence: &str) -> Result<Vec<SearchHit>> {
        if self.corpus.is_empty() || self.top_k == 0 {
            return Ok(Vec::new());
        }
        let store = self.index()?;
        if store.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed_query(sentence)?;
        let hits = store.search(&query, self.top_k)?;
        tracing::debug!(k = self.top_k, hits = hits.len(), "retrieved similar records");
        Ok(hits)
    }

    fn complete(
        &self,
        mode: Mode,
        sentence: &str,
        prompt: String,
        hits: Vec<SearchHit>,
    ) -> Result<ModeOutput> {
        let response = self.generator.generate(&prompt, &self.options)?;
        tracing::info!(
            %mode,
            model = self.generator.model_id(),
            context_chunks = hits.len(),
            "generated response"
        );
        Ok(ModeOutput {
            mode,
            sentence: sentence.to_string(),
            prompt,
            response,
            hits,
        })
    }

    /// Corpus the index was built from
    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Similarity index, chunking and embedding the corpus on first call
    ///
    /// A failed attempt leaves nothing cached, so the next call retries.
    /// Concurrent first calls may each embed the corpus; one result is kept.
    pub fn index(&self) -> Result<&VectorStore> {
        if let Some(store) = self.store.get() {
            return Ok(store);
        }

        let mut chunks = chunk_corpus(&self.corpus, self.chunker.as_ref())?;
        self.embedder.embed_chunks(&mut chunks)?;
        let store = VectorStore::from_embedded_chunks(chunks, self.metric)?;

        if !store.is_empty() && store.dimension() != self.embedder.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.embedder.dimension(),
                actual: store.dimension(),
            });
        }

        tracing::info!(
            records = self.corpus.len(),
            chunks = store.len(),
            chunker = self.chunker.name(),
            embedder = self.embedder.model_id(),
            "indexed corpus"
        );
        Ok(self.store.get_or_init(|| store))
    }

    /// Whether the corpus has been embedded yet
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.store.get().is_some()
    }

    /// Get the number of indexed chunks, indexing if needed
    pub fn chunk_count(&self) -> Result<usize> {
        self.index().map(VectorStore::len)
    }

    /// Number of chunks retrieved per query
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Decoding parameters used for every mode
    #[must_use]
    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Get the embedder
    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Get the generator
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }
}

fn check_sentence(sentence: &str) -> Result<&str> {
    let trimmed = sentence.trim();
    if trimmed.is_empty() {
        return Err(Error::Query("sentence is empty".to_string()));
    }
    Ok(trimmed)
}

/// Builder for RAG pipeline
pub struct RagPipelineBuilder<E: Embedder, G: Generator> {
    corpus: Option<Corpus>,
    chunker: Option<Box<dyn RecordChunker>>,
    embedder: Option<E>,
    generator: Option<G>,
    options: GenerationOptions,
    metric: DistanceMetric,
    max_context_chars: Option<usize>,
    top_k: usize,
}

impl<E: Embedder, G: Generator> RagPipelineBuilder<E, G> {
    /// Create a new pipeline builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            corpus: None,
            chunker: None,
            embedder: None,
            generator: None,
            options: GenerationOptions::default(),
            metric: DistanceMetric::default(),
            max_context_chars: None,
            top_k: 10,
        }
    }

    /// Set the corpus
    #[must_use]
    pub fn corpus(mut self, corpus: Corpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Set the chunker
    #[must_use]
    pub fn chunker(mut self, chunker: Box<dyn RecordChunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedder
    #[must_use]
    pub fn embedder(mut self, embedder: E) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the generator
    #[must_use]
    pub fn generator(mut self, generator: G) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the decoding parameters
    #[must_use]
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the similarity metric
    #[must_use]
    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Limit the characters of retrieved context placed in the prompt
    #[must_use]
    pub fn max_context_chars(mut self, max_chars: usize) -> Self {
        self.max_context_chars = Some(max_chars);
        self
    }

    /// Set the number of chunks retrieved per query
    #[must_use]
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Check the components and assemble the pipeline
    ///
    /// No embedding happens here; see [`RagPipeline::index`].
    pub fn build(self) -> Result<RagPipeline<E, G>> {
        let corpus = self
            .corpus
            .ok_or_else(|| Error::InvalidConfig("corpus required".to_string()))?;

        let embedder = self
            .embedder
            .ok_or_else(|| Error::InvalidConfig("embedder required".to_string()))?;

        let generator = self
            .generator
            .ok_or_else(|| Error::InvalidConfig("generator required".to_string()))?;

        self.options.validate()?;

        let chunker = self
            .chunker
            .unwrap_or_else(|| Box::new(WholeRecordChunker::new(corpus.columns().clone())));

        let assembler = self
            .max_context_chars
            .map_or_else(ContextAssembler::new, ContextAssembler::with_max_chars);

        Ok(RagPipeline {
            corpus,
            chunker,
            metric: self.metric,
            store: OnceLock::new(),
            embedder,
            generator,
            options: self.options,
            assembler,
            top_k: self.top_k,
        })
    }
}

impl<E: Embedder, G: Generator> Default for RagPipelineBuilder<E, G> {
    fn default() -> Self {
        Self::new()
    }
}
