//! Embedding generation for the correction pipeline

use crate::config::{Config, EmbeddingSettings};
use crate::watsonx::{Service, WatsonxClient};
use crate::{Chunk, Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Trait for embedding generation
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch embed multiple texts, preserving input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Get model identifier
    fn model_id(&self) -> &str;

    /// Embed a query (may use query prefix)
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(query)
    }

    /// Embed a document (may use document prefix)
    fn embed_document(&self, document: &str) -> Result<Vec<f32>> {
        self.embed(document)
    }

    /// Embed chunks and update them in place
    fn embed_chunks(&self, chunks: &mut [Chunk]) -> Result<()> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embed_batch(&texts)?;

        if embeddings.len() != chunks.len() {
            return Err(Error::EmbeddingService(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.set_embedding(embedding);
        }

        Ok(())
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        (**self).embed_query(query)
    }

    fn embed_document(&self, document: &str) -> Result<Vec<f32>> {
        (**self).embed_document(document)
    }
}

/// Offline embedder hashing each whitespace token into a signed bucket
///
/// Deterministic and network-free; used by tests and `search --offline`.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
    model_id: String,
    normalize: bool,
    query_prefix: Option<String>,
    document_prefix: Option<String>,
}

impl MockEmbedder {
    /// Hash embedder producing `dimension`-long vectors
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model_id: "hash-bow".to_string(),
            normalize: true,
            query_prefix: None,
            document_prefix: None,
        }
    }

    /// Report a different model name
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Prepend instruction prefixes the way [`WatsonxEmbedder`] does
    #[must_use]
    pub fn with_prefixes(mut self, query: Option<&str>, document: Option<&str>) -> Self {
        self.query_prefix = query.map(str::to_string);
        self.document_prefix = document.map(str::to_string);
        self
    }

    /// Keep raw bucket counts instead of unit-length vectors
    #[must_use]
    pub fn unnormalized(mut self) -> Self {
        self.normalize = false;
        self
    }

    /// Bag-of-words hashing: texts sharing words land near each other
    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimension];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let hash = hasher.finish();
            let idx = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        if vector.iter().all(|x| *x == 0.0) {
            vector[0] = 1.0;
        }

        if self.normalize {
            normalize_vector(&mut vector);
        }

        vector
    }
}

/// Prepend an instruction prefix such as `query: ` to `text`
fn apply_prefix(prefix: Option<&str>, text: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{text}"),
        None => text.to_string(),
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_document(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_document(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if query.is_empty() {
            return Err(Error::Query("empty query".to_string()));
        }
        let text = apply_prefix(self.query_prefix.as_deref(), query);
        Ok(self.hash_to_vector(&text))
    }

    fn embed_document(&self, document: &str) -> Result<Vec<f32>> {
        if document.is_empty() {
            return Err(Error::Query("empty text for embedding".to_string()));
        }
        let text = apply_prefix(self.document_prefix.as_deref(), document);
        Ok(self.hash_to_vector(&text))
    }
}

/// Remote embedder backed by the watsonx.ai embeddings endpoint
#[derive(Debug)]
pub struct WatsonxEmbedder {
    client: Arc<WatsonxClient>,
    settings: EmbeddingSettings,
}

impl WatsonxEmbedder {
    /// Create an embedder from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(
            Arc::new(WatsonxClient::new(config)?),
            config.embedding.clone(),
        ))
    }

    /// Create an embedder sharing an existing client (and its cached token)
    #[must_use]
    pub fn with_client(client: Arc<WatsonxClient>, settings: EmbeddingSettings) -> Self {
        Self { client, settings }
    }

    /// Request body for one batch
    #[must_use]
    pub fn request_body(&self, inputs: &[String]) -> Value {
        serde_json::json!({
            "inputs": inputs,
            "model_id": self.settings.model_id,
            "project_id": self.client.project_id(),
            "parameters": {
                "truncate_input_tokens": self.settings.truncate_input_tokens,
                "return_options": { "input_text": self.settings.return_input_text },
            },
        })
    }

    fn embed_prefixed(&self, texts: &[&str], prefix: Option<&str>) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Query("empty text for embedding".to_string()));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.settings.batch_size.max(1)) {
            let inputs: Vec<String> = batch
                .iter()
                .map(|t| apply_prefix(prefix, t))
                .collect();
            let json = self
                .client
                .post_json(Service::Embedding, &self.request_body(&inputs))?;
            vectors.extend(parse_embeddings(&json, batch.len(), self.settings.dimension)?);
        }

        tracing::debug!(
            model = %self.settings.model_id,
            texts = texts.len(),
            "embedded texts"
        );
        Ok(vectors)
    }
}

impl Embedder for WatsonxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_document(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_prefixed(texts, self.settings.document_prefix.as_deref())
    }

    fn dimension(&self) -> usize {
        self.settings.dimension
    }

    fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_prefixed(&[query], self.settings.query_prefix.as_deref())?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingService("no embedding returned".to_string()))
    }

    fn embed_document(&self, document: &str) -> Result<Vec<f32>> {
        self.embed_prefixed(&[document], self.settings.document_prefix.as_deref())?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingService("no embedding returned".to_string()))
    }
}

/// Extract `results[].embedding` from an embeddings response
pub fn parse_embeddings(json: &Value, expected: usize, dimension: usize) -> Result<Vec<Vec<f32>>> {
    let results = json["results"]
        .as_array()
        .ok_or_else(|| Error::EmbeddingService("response has no `results` array".to_string()))?;

    if results.len() != expected {
        return Err(Error::EmbeddingService(format!(
            "expected {expected} embeddings, got {}",
            results.len()
        )));
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let values = result["embedding"].as_array().ok_or_else(|| {
                Error::EmbeddingService(format!("result {i} has no `embedding` array"))
            })?;

            let vector = values
                .iter()
                .map(|v| v.as_f64().map(|x| x as f32))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| {
                    Error::EmbeddingService(format!("result {i} contains a non-numeric value"))
                })?;

            if vector.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            Ok(vector)
        })
        .collect()
}

fn normalize_vector(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compute cosine similarity between two vectors
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Compute dot product between two vectors
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
