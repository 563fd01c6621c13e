use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Environment variable holding the API key. The credential is never a
/// literal in code or configuration files.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const BASE_URL_PREFIX: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Wire format ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

// ── Client ──────────────────────────────────────────────────────────────────

/// Forwards one free-text prompt to the generative-language API and returns
/// the text reply verbatim. One blocking call per prompt; no retries.
#[derive(Debug, Clone)]
pub struct RelayClient {
    api_key: String,
    model: String,
    http_client: reqwest::blocking::Client,
}

/// Builder for `RelayClient` instances.
#[derive(Debug)]
pub struct RelayClientBuilder {
    api_key: String,
    model: String,
    timeout: Duration,
    connect_timeout: Duration,
}

impl RelayClientBuilder {
    /// Sets the model name to call (default `gemini-1.5-flash`).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the total request timeout (default 30 s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout (default 10 s).
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the `RelayClient`.
    pub fn build(self) -> Result<RelayClient, RelayError> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()?;
        Ok(RelayClient {
            api_key: self.api_key,
            model: self.model,
            http_client,
        })
    }
}

impl RelayClient {
    /// Creates a new builder for `RelayClient` instances.
    #[must_use]
    pub fn builder(api_key: String) -> RelayClientBuilder {
        RelayClientBuilder {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Creates a client with the API key taken from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self, RelayError> {
        let api_key =
            std::env::var(ENV_API_KEY).map_err(|_| RelayError::MissingApiKey(ENV_API_KEY))?;
        Self::builder(api_key).build()
    }

    /// Sends one prompt and returns the model's text reply.
    ///
    /// A blank prompt is rejected locally; no network call is made.
    pub fn ask(&self, prompt: &str) -> Result<String, RelayError> {
        if prompt.trim().is_empty() {
            return Err(RelayError::EmptyPrompt);
        }

        let request_body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };
        log_request_body(&request_body);

        let response = self
            .http_client
            .post(self.request_url())
            // Key goes in a header, not the query string, to keep it out
            // of URLs in logs and error messages.
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text()?;
            return Err(RelayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_text = response.text()?;
        let response_body: GenerateContentResponse = serde_json::from_str(&response_text)?;
        extract_text(response_body)
    }

    fn request_url(&self) -> String {
        format!("{BASE_URL_PREFIX}/models/{}:generateContent", self.model)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, RelayError> {
    if let Some(candidate) = response.candidates.first() {
        if let Some(part) = candidate.content.parts.first() {
            if let Some(text) = &part.text {
                return Ok(text.clone());
            }
        }
    }
    Err(RelayError::MalformedResponse(
        "no text content found in response structure".to_string(),
    ))
}

/// Logs a request body at debug level, preferring JSON format when possible.
fn log_request_body<T: std::fmt::Debug + Serialize>(body: &T) {
    match serde_json::to_string_pretty(body) {
        Ok(json) => tracing::debug!("request body (JSON):\n{json}"),
        Err(_) => tracing::debug!("request body: {body:#?}"),
    }
}
