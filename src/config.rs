//! Runtime configuration
//!
//! A [`Config`] is created once at process start and passed by reference to
//! every component constructor. Nothing reads the environment after that.

use crate::chunk::ChunkingStrategy;
use crate::corpus::CorpusColumns;
use crate::generate::GenerationOptions;
use crate::index::DistanceMetric;
use crate::retry::RetryConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the service URL
pub const ENV_URL: &str = "WATSONX_URL";
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "WATSONX_APIKEY";
/// Environment variable holding the project identifier
pub const ENV_PROJECT_ID: &str = "WATSONX_PROJECT_ID";

/// Service credentials. The API key never appears in `Debug` output and is
/// never serialized; it can be read from a config file but not written back.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Base URL of the regional service, e.g. `https://eu-de.ml.cloud.ibm.com`
    pub url: String,
    /// API key exchanged for a bearer token
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Project the requests are billed to
    pub project_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl Credentials {
    /// Validate three optional values, reporting every absent one at once.
    /// Empty or whitespace-only values count as absent.
    pub fn resolve(
        url: Option<String>,
        api_key: Option<String>,
        project_id: Option<String>,
    ) -> Result<Self> {
        fn present(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let url = present(url);
        let api_key = present(api_key);
        let project_id = present(project_id);

        let mut missing = Vec::new();
        if url.is_none() {
            missing.push(ENV_URL);
        }
        if api_key.is_none() {
            missing.push(ENV_API_KEY);
        }
        if project_id.is_none() {
            missing.push(ENV_PROJECT_ID);
        }

        match (url, api_key, project_id) {
            (Some(url), Some(api_key), Some(project_id)) => Ok(Self {
                url: normalize_url(&url),
                api_key,
                project_id,
            }),
            _ => Err(Error::MissingCredential { missing }),
        }
    }

    /// Read credentials from `WATSONX_URL`, `WATSONX_APIKEY` and
    /// `WATSONX_PROJECT_ID`
    pub fn from_env() -> Result<Self> {
        Self::resolve(
            std::env::var(ENV_URL).ok(),
            std::env::var(ENV_API_KEY).ok(),
            std::env::var(ENV_PROJECT_ID).ok(),
        )
    }

    /// Replace values with any that are given, then resolve the result
    pub fn overridden(
        self,
        url: Option<String>,
        api_key: Option<String>,
        project_id: Option<String>,
    ) -> Result<Self> {
        Self::resolve(
            url.or(Some(self.url)),
            api_key.or(Some(self.api_key)),
            project_id.or(Some(self.project_id)),
        )
    }

    /// Names of the values that are empty
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (ENV_URL, &self.url),
            (ENV_API_KEY, &self.api_key),
            (ENV_PROJECT_ID, &self.project_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Accept a bare domain as well as a full URL
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Embedding service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model identifier
    pub model_id: String,
    /// Expected vector length
    pub dimension: usize,
    /// Truncate inputs longer than this many tokens
    pub truncate_input_tokens: u32,
    /// Ask the service to echo input text
    pub return_input_text: bool,
    /// Maximum texts per request
    pub batch_size: usize,
    /// Instruction prefix for queries (asymmetric retrieval)
    pub query_prefix: Option<String>,
    /// Instruction prefix for documents
    pub document_prefix: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_id: "intfloat/multilingual-e5-large".to_string(),
            dimension: 1024,
            truncate_input_tokens: 3,
            return_input_text: true,
            batch_size: 64,
            query_prefix: None,
            document_prefix: None,
        }
    }
}

/// How the prompt is framed before it is sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFormat {
    /// Send the prompt unchanged
    #[default]
    Plain,
    /// Wrap in `<s> [INST] … [/INST]` instruction markers
    Instruct,
}

impl PromptFormat {
    /// Apply the framing to a prompt
    #[must_use]
    pub fn apply(self, prompt: &str) -> String {
        match self {
            Self::Plain => prompt.to_string(),
            Self::Instruct => format!("<s> [INST] {prompt} [/INST]"),
        }
    }
}

/// Generation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Generation model identifier
    pub model_id: String,
    /// Decoding parameters
    pub options: GenerationOptions,
    /// Prompt framing
    pub prompt_format: PromptFormat,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: "sdaia/allam-1-13b-instruct".to_string(),
            options: GenerationOptions::default(),
            prompt_format: PromptFormat::Plain,
        }
    }
}

/// Retrieval settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of corpus chunks placed in the prompt
    pub top_k: usize,
    /// Similarity used for both build and search
    pub metric: DistanceMetric,
    /// How records become chunks
    pub chunking: ChunkingStrategy,
    /// Corpus column names
    pub columns: CorpusColumns,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            metric: DistanceMetric::Cosine,
            chunking: ChunkingStrategy::WholeRecord,
            columns: CorpusColumns::default(),
        }
    }
}

/// Top-level configuration
///
/// Deserializes from a JSON file where every field is optional; unknown
/// fields are rejected so a misspelt setting does not silently fall back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Service credentials
    #[serde(default)]
    pub credentials: Credentials,
    /// Token endpoint used to exchange the API key
    #[serde(default = "default_iam_url")]
    pub iam_url: String,
    /// API version date sent with every request
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Embedding settings
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    /// Generation settings
    #[serde(default)]
    pub generation: GenerationSettings,
    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    /// Retry policy for remote calls
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_iam_url() -> String {
    "https://iam.cloud.ibm.com/identity/token".to_string()
}

fn default_api_version() -> String {
    "2023-10-25".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Credentials::default())
    }
}

impl Config {
    /// Configuration with default settings for the given credentials
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            iam_url: default_iam_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
            retrieval: RetrievalSettings::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Default configuration with credentials from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Credentials::from_env()?))
    }

    /// Read a JSON configuration file
    ///
    /// Credentials may be partial or absent here; callers fill the gaps
    /// with [`Credentials::overridden`] before [`Config::validate`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check settings that would otherwise fail later, mid-pipeline
    pub fn validate(&self) -> Result<()> {
        let missing = self.credentials.missing();
        if !missing.is_empty() {
            return Err(Error::MissingCredential { missing });
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig("timeout must be positive".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "embedding batch size must be positive".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig(
                "embedding dimension must be positive".to_string(),
            ));
        }
        self.generation.options.validate()
    }
}
