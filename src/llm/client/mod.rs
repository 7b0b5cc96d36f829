//! Gemini REST client.
//!
//! Talks to the Generative Language API (`v1beta`): listing models, looking
//! one up, and `generateContent` for plain text prompts. The API key travels
//! in the `x-goog-api-key` header so it never shows up in URLs or logs.

mod config;
pub mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use config::{ApiKey, ApiKeyStatus, LlmConfig, API_KEY_ENV, API_KEY_PLACEHOLDER, API_KEY_URL};

/// Generation method a model must support to be usable here.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Page size requested when listing models.
const LIST_PAGE_SIZE: &str = "1000";

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No usable credential
    #[error("API key not configured")]
    NotConfigured,
    /// Credential rejected before sending
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),
    /// Failed to reach the service
    #[error("Connection error: {0}")]
    Connection(String),
    /// The call took longer than allowed
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Key rejected by the service
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// Rate limit or quota exhausted
    #[error("Quota exceeded: {0}")]
    Quota(String),
    /// Unknown or retired model
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Model metadata as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-1.5-flash`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Model id without the `models/` prefix.
    pub fn id(&self) -> &str {
        model_id(&self.name)
    }

    /// Whether the model can be used for free-form text generation.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }
}

/// Strip the `models/` resource prefix.
pub fn model_id(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

/// Text generation provider.
#[async_trait]
pub trait GenerativeApi: Send + Sync {
    /// List every model the credential can see.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;

    /// Look up a single model by id.
    async fn get_model(&self, name: &str) -> Result<ModelInfo, LlmError>;

    /// Send one prompt and return the completion text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gemini client.
pub struct GeminiClient {
    config: LlmConfig,
    api_key: ApiKey,
    client: Client,
}

impl GeminiClient {
    /// Create a new client. Fails if the key is obviously unusable.
    pub fn new(config: LlmConfig, api_key: ApiKey) -> Result<Self, LlmError> {
        api_key.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1beta/{}",
            self.config.endpoint.trim_end_matches('/'),
            path
        )
    }

    /// Attach the key, send, and turn transport or HTTP failures into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, LlmError> {
        let resp = request
            .header("x-goog-api-key", self.api_key.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    fn transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.config.timeout_secs)
        } else {
            LlmError::Connection(e.without_url().to_string())
        }
    }
}

/// Map a non-success response to an error, preferring the API's own message.
fn status_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status.as_u16() {
        401 | 403 => LlmError::Auth(message),
        // Gemini answers 400 INVALID_ARGUMENT for malformed keys
        400 if message.contains("API key") => LlmError::Auth(message),
        404 => LlmError::ModelNotFound(message),
        429 => LlmError::Quota(message),
        _ => LlmError::Api(format!("HTTP {}: {}", status, message)),
    }
}

#[async_trait]
impl GenerativeApi for GeminiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let url = self.url("models");
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", LIST_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListModelsResponse = self
                .send(request)
                .await?
                .json()
                .await
                .map_err(|e| LlmError::Parse(e.to_string()))?;

            models.extend(page.models);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Provider lists {} models", models.len());
        Ok(models)
    }

    async fn get_model(&self, name: &str) -> Result<ModelInfo, LlmError> {
        let url = self.url(&format!("models/{}", model_id(name)));
        self.send(self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let url = self.url(&format!("models/{}:generateContent", model_id(model)));
        debug!("Sending {} char prompt to {}", prompt.chars().count(), model);

        let response: GenerateResponse = self
            .send(self.client.post(&url).json(&request))
            .await?
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        extract_text(response)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Result<String, LlmError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LlmError::Api(format!("Response blocked: {}", reason)));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        return Err(LlmError::Api(format!(
            "Empty response (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}
