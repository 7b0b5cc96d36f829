//! Gemini client configuration.
//!
//! Split into two sources:
//! - `LlmConfig`: from the config file (endpoint, preferred model, generation
//!   params), with env overrides GEMINI_ENDPOINT and GEMINI_MODEL
//! - `ApiKeyStatus`: the credential, only ever read from GOOGLE_API_KEY

use std::fmt;

use serde::{Deserialize, Serialize};

use super::LlmError;

/// Environment variable holding the Google API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Value shipped in the sample `.env`; means "not configured yet".
pub const API_KEY_PLACEHOLDER: &str = "votre_cle_api_google_ici";

/// Where users can create a key.
pub const API_KEY_URL: &str = "https://aistudio.google.com/app/apikey";

/// Gemini API credential. Never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// The raw key, for the request header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check the key looks usable before any network call.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.0.is_empty() {
            return Err(LlmError::InvalidApiKey("key is empty".to_string()));
        }
        if self.0 == API_KEY_PLACEHOLDER {
            return Err(LlmError::NotConfigured);
        }
        if self
            .0
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || !c.is_ascii())
        {
            return Err(LlmError::InvalidApiKey(
                "key contains whitespace or non-ASCII characters".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// State of the credential in the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyStatus {
    /// Variable not set (or set to an empty string).
    Missing,
    /// Variable still holds the sample placeholder.
    Placeholder,
    /// A key is present. It may still be rejected by the provider.
    Configured(ApiKey),
}

impl ApiKeyStatus {
    /// Classify a raw value.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => ApiKeyStatus::Missing,
            Some(API_KEY_PLACEHOLDER) => ApiKeyStatus::Placeholder,
            Some(key) => ApiKeyStatus::Configured(ApiKey::new(key)),
        }
    }

    /// Read GOOGLE_API_KEY from the environment.
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(API_KEY_ENV).ok().as_deref())
    }

    pub fn key(&self) -> Option<&ApiKey> {
        match self {
            ApiKeyStatus::Configured(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, ApiKeyStatus::Configured(_))
    }

    /// Short status line.
    pub fn describe(&self) -> &'static str {
        match self {
            ApiKeyStatus::Missing => "not set",
            ApiKeyStatus::Placeholder => "placeholder value, not configured",
            ApiKeyStatus::Configured(_) => "configured",
        }
    }

    /// What the user has to do to get a working key.
    pub fn setup_hint() -> String {
        format!(
            "Create a .env file next to where you run scribe containing:\n  \
             {}=<your key>\nGet a key at {}",
            API_KEY_ENV, API_KEY_URL
        )
    }
}

/// Connection and generation settings for Gemini.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Preferred model; when unset the first available model is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Temperature for generation (0.0 - 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens in the response.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Upper bound for a single API call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(endpoint) = non_empty_env("GEMINI_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(model) = non_empty_env("GEMINI_MODEL") {
            self.model = Some(model);
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
