//! Text generation clients

use crate::config::{Config, GenerationSettings};
use crate::watsonx::{Service, WatsonxClient};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Decoding strategy requested from the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoding {
    /// Sample with temperature
    #[default]
    Sampling,
    /// Always pick the most likely token
    Greedy,
}

impl Decoding {
    /// Wire name of the decoding method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sampling => "sample",
            Self::Greedy => "greedy",
        }
    }
}

/// Decoding parameters for one completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Minimum tokens to generate
    pub min_new_tokens: u32,
    /// Maximum tokens to generate
    pub max_new_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Decoding strategy
    pub decoding: Decoding,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            min_new_tokens: 1,
            max_new_tokens: 500,
            temperature: 0.6,
            decoding: Decoding::Sampling,
        }
    }
}

impl GenerationOptions {
    /// Reject option combinations the service would refuse
    pub fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            return Err(Error::InvalidConfig(
                "max_new_tokens must be positive".to_string(),
            ));
        }
        if self.min_new_tokens > self.max_new_tokens {
            return Err(Error::InvalidConfig(format!(
                "min_new_tokens ({}) exceeds max_new_tokens ({})",
                self.min_new_tokens, self.max_new_tokens
            )));
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::InvalidConfig(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Trait for text generation
pub trait Generator: Send + Sync {
    /// Produce a completion for `prompt`
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Get model identifier
    fn model_id(&self) -> &str;
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        (**self).generate(prompt, options)
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Remote generator backed by the watsonx.ai text generation endpoint
#[derive(Debug)]
pub struct WatsonxGenerator {
    client: Arc<WatsonxClient>,
    settings: GenerationSettings,
}

impl WatsonxGenerator {
    /// Create a generator from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(
            Arc::new(WatsonxClient::new(config)?),
            config.generation.clone(),
        ))
    }

    /// Create a generator sharing an existing client (and its cached token)
    #[must_use]
    pub fn with_client(client: Arc<WatsonxClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    /// Request body for one prompt
    #[must_use]
    pub fn request_body(&self, prompt: &str, options: &GenerationOptions) -> Value {
        let mut parameters = serde_json::json!({
            "decoding_method": options.decoding.as_str(),
            "min_new_tokens": options.min_new_tokens,
            "max_new_tokens": options.max_new_tokens,
        });
        if options.decoding == Decoding::Sampling {
            parameters["temperature"] = serde_json::json!(options.temperature);
        }

        serde_json::json!({
            "input": self.settings.prompt_format.apply(prompt),
            "model_id": self.settings.model_id,
            "project_id": self.client.project_id(),
            "parameters": parameters,
        })
    }
}

impl Generator for WatsonxGenerator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        options.validate()?;
        let json = self
            .client
            .post_json(Service::Generation, &self.request_body(prompt, options))?;
        let text = parse_generated_text(&json)?;

        tracing::debug!(
            model = %self.settings.model_id,
            prompt_chars = prompt.chars().count(),
            completion_chars = text.chars().count(),
            "generated completion"
        );
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.settings.model_id
    }
}

/// Extract `results[0].generated_text` from a generation response
pub fn parse_generated_text(json: &Value) -> Result<String> {
    let text = json["results"][0]["generated_text"]
        .as_str()
        .ok_or_else(|| {
            Error::GenerationService("response has no `results[0].generated_text`".to_string())
        })?;

    if text.trim().is_empty() {
        return Err(Error::GenerationService(
            "model returned an empty completion".to_string(),
        ));
    }
    Ok(text.to_string())
}

type Responder = dyn Fn(&str) -> String + Send + Sync;

/// Closure-backed generator for tests and offline runs
pub struct MockGenerator {
    model_id: String,
    respond: Box<Responder>,
}

impl std::fmt::Debug for MockGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGenerator")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl MockGenerator {
    /// Answer every prompt with the output of `respond`
    pub fn new(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            model_id: "mock-generator".to_string(),
            respond: Box::new(respond),
        }
    }

    /// Answer every prompt with the same text
    #[must_use]
    pub fn fixed(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::new(move |_| response.clone())
    }

    /// Echo the prompt back
    #[must_use]
    pub fn echo() -> Self {
        Self::new(str::to_string)
    }

    /// Set the model ID
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

impl Generator for MockGenerator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        options.validate()?;
        let text = (self.respond)(prompt);
        if text.trim().is_empty() {
            return Err(Error::GenerationService(
                "model returned an empty completion".to_string(),
            ));
        }
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
