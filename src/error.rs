//! Error types for Tashih-RAG

use thiserror::Error;

/// Result type for Tashih-RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the correction pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Corpus file missing, unreadable, or lacking required columns
    #[error("failed to load corpus: {0}")]
    CorpusLoad(String),

    /// Remote embedding service failure or malformed response
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// Remote generation service failure or unusable completion
    #[error("generation service error: {0}")]
    GenerationService(String),

    /// Model output did not contain the expected section label
    #[error("could not parse model response: {0}")]
    ResponseParse(String),

    /// No corpus record matches the sentence being evaluated
    #[error("no ground truth found for sentence: {0}")]
    GroundTruthNotFound(String),

    /// One or more service credentials are absent
    #[error("missing credentials: {}", missing.join(", "))]
    MissingCredential {
        /// Names of every absent value
        missing: Vec<&'static str>,
    },

    /// Embedding dimension mismatch
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Query processing error
    #[error("query error: {0}")]
    Query(String),

    /// Serialization error (serde_json)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote call that may succeed when repeated (timeout, connection
    /// failure, HTTP 429/5xx). Wraps the service error it would otherwise be.
    #[error("{source} (transient)")]
    Transient {
        /// The underlying service error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Mark a service error as retryable
    #[must_use]
    pub fn transient(self) -> Self {
        match self {
            Self::Transient { .. } => self,
            other => Self::Transient {
                source: Box::new(other),
            },
        }
    }

    /// Whether a bounded retry may help
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Strip the transient marker, returning the underlying error
    #[must_use]
    pub fn into_inner(self) -> Self {
        match self {
            Self::Transient { source } => source.into_inner(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_corpus_load() {
        let err = Error::CorpusLoad("errors.csv: not found".to_string());
        assert_eq!(
            err.to_string(),
            "failed to load corpus: errors.csv: not found"
        );
    }

    #[test]
    fn test_error_display_missing_credential_lists_all() {
        let err = Error::MissingCredential {
            missing: vec!["WATSONX_URL", "WATSONX_PROJECT_ID"],
        };
        assert_eq!(
            err.to_string(),
            "missing credentials: WATSONX_URL, WATSONX_PROJECT_ID"
        );
    }

    #[test]
    fn test_error_display_dimension_mismatch() {
        let err = Error::DimensionMismatch {
            expected: 1024,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "embedding dimension mismatch: expected 1024, got 768"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_transient_wraps_once() {
        let err = Error::GenerationService("503".to_string())
            .transient()
            .transient();
        assert!(err.is_transient());
        assert!(matches!(err.into_inner(), Error::GenerationService(_)));
    }

    #[test]
    fn test_non_transient() {
        let err = Error::ResponseParse("label missing".to_string());
        assert!(!err.is_transient());
        assert!(matches!(err.into_inner(), Error::ResponseParse(_)));
    }

    #[test]
    fn test_transient_display_keeps_message() {
        let err = Error::EmbeddingService("timed out".to_string()).transient();
        assert_eq!(
            err.to_string(),
            "embedding service error: timed out (transient)"
        );
    }
}
