//! HTTP plumbing shared by the watsonx.ai embedding and generation clients
//!
//! Requests are blocking (`reqwest::blocking`) with a per-request timeout.
//! The API key is exchanged for a bearer token at the IAM endpoint; the
//! token is cached until shortly before it expires.

use crate::config::{Config, Credentials};
use crate::retry::{classify_status, with_retry, RetryConfig};
use crate::{Error, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Renew the token this long before the service says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Which remote service a request belongs to; decides the error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// `/ml/v1/text/embeddings`
    Embedding,
    /// `/ml/v1/text/generation`
    Generation,
}

impl Service {
    /// Wrap a message in this service's error variant
    #[must_use]
    pub fn error(self, message: impl Into<String>) -> Error {
        match self {
            Self::Embedding => Error::EmbeddingService(message.into()),
            Self::Generation => Error::GenerationService(message.into()),
        }
    }

    /// Endpoint path relative to the service URL
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Embedding => "/ml/v1/text/embeddings",
            Self::Generation => "/ml/v1/text/generation",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Generation => "generation",
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    valid_until: Instant,
}

/// Authenticated client for the watsonx.ai REST API
pub struct WatsonxClient {
    http: Client,
    credentials: Credentials,
    iam_url: String,
    api_version: String,
    retry: RetryConfig,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for WatsonxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatsonxClient")
            .field("credentials", &self.credentials)
            .field("iam_url", &self.iam_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl WatsonxClient {
    /// Build a client from validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            iam_url: config.iam_url.clone(),
            api_version: config.api_version.clone(),
            retry: config.retry.clone(),
            token: Mutex::new(None),
        })
    }

    /// Project identifier sent in every request body
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    /// Full endpoint URL for a service
    #[must_use]
    pub fn endpoint(&self, service: Service) -> String {
        format!(
            "{}{}?version={}",
            self.credentials.url,
            service.path(),
            self.api_version
        )
    }

    /// POST a JSON body to a service endpoint, retrying transient failures
    pub fn post_json(&self, service: Service, body: &Value) -> Result<Value> {
        with_retry(&self.retry, service.name(), || {
            let started = Instant::now();
            let token = self.bearer_token(service)?;
            let response = self
                .http
                .post(self.endpoint(service))
                .bearer_auth(token)
                .header("Accept", "application/json")
                .json(body)
                .send()
                .map_err(|e| request_error(service, &e))?;

            let json = read_json(service, response)?;
            tracing::debug!(
                service = service.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request complete"
            );
            Ok(json)
        })
    }

    fn bearer_token(&self, service: Service) -> Result<String> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| service.error("token cache poisoned"))?;

        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.valid_until {
                return Ok(cached.value.clone());
            }
        }

        tracing::debug!("requesting IAM access token");
        let response = self
            .http
            .post(&self.iam_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.credentials.api_key.as_str()),
            ])
            .send()
            .map_err(|e| request_error(service, &e))?;

        let json = read_json(service, response).map_err(|e| {
            let transient = e.is_transient();
            let err = service.error(format!("failed to obtain access token: {}", e.into_inner()));
            if transient {
                err.transient()
            } else {
                err
            }
        })?;
        let token = parse_token(&json, Instant::now()).map_err(|msg| service.error(msg))?;

        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }
}

fn request_error(service: Service, err: &reqwest::Error) -> Error {
    let error = service.error(format!("request failed: {err}"));
    if err.is_timeout() || err.is_connect() {
        error.transient()
    } else {
        error
    }
}

fn read_json(service: Service, response: reqwest::blocking::Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|e| service.error(format!("failed to read response body: {e}")))?;

    if !status.is_success() {
        return Err(classify_status(
            status.as_u16(),
            service.error(format!("HTTP {status}: {}", truncate(&text, 500))),
        ));
    }

    serde_json::from_str(&text)
        .map_err(|e| service.error(format!("malformed JSON response: {e}")))
}

fn parse_token(json: &Value, now: Instant) -> std::result::Result<CachedToken, String> {
    let value = json["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "access token not found in response".to_string())?
        .to_string();

    let lifetime = json["expires_in"]
        .as_u64()
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(3600));

    Ok(CachedToken {
        value,
        valid_until: now + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
