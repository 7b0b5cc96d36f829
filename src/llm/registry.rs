//! Model registry: which Gemini models are usable and which one is bound.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::client::{model_id, ApiKey, GeminiClient, GenerativeApi, LlmConfig, LlmError};
use super::correction::{request_correction, CorrectionResult, NO_MODEL_SELECTED};

/// Models to offer first, in priority order. Also the fallback list when the
/// provider can't be queried.
pub const RECOMMENDED_MODELS: [&str; 4] = [
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
    "gemini-1.5-pro",
];

fn recommended_models() -> Vec<String> {
    RECOMMENDED_MODELS.iter().map(|m| m.to_string()).collect()
}

/// Order model names recommended-first.
///
/// Recommended models that are present come first in recommended order,
/// followed by the other gemini models in provider order. If nothing
/// gemini-named is present the input is returned unchanged.
pub fn prioritize_models(models: &[String]) -> Vec<String> {
    let mut prioritized: Vec<String> = RECOMMENDED_MODELS
        .iter()
        .filter(|rec| models.iter().any(|m| m == *rec))
        .map(|rec| rec.to_string())
        .collect();

    for model in models {
        if !prioritized.contains(model) && model.to_lowercase().contains("gemini") {
            prioritized.push(model.clone());
        }
    }

    if prioritized.is_empty() {
        models.to_vec()
    } else {
        prioritized
    }
}

/// A selected model together with the client to reach it.
///
/// Cheap to clone; handed to the background correction task so the task does
/// not borrow the registry.
#[derive(Clone)]
pub struct BoundModel {
    api: Arc<dyn GenerativeApi>,
    name: String,
    timeout: Duration,
}

impl BoundModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Correct and classify OCR text with this model.
    pub async fn process_text(&self, raw_text: &str) -> CorrectionResult {
        request_correction(self.api.as_ref(), &self.name, raw_text, self.timeout).await
    }
}

/// Tracks the provider connection, the usable models and the current one.
pub struct ModelRegistry {
    config: LlmConfig,
    api: Option<Arc<dyn GenerativeApi>>,
    available: Vec<String>,
    current: Option<String>,
}

impl ModelRegistry {
    /// Create an unconfigured registry. Until models are fetched the
    /// recommended list is offered.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            api: None,
            available: recommended_models(),
            current: None,
        }
    }

    /// Create a registry on top of an existing provider.
    pub fn with_api(config: LlmConfig, api: Arc<dyn GenerativeApi>) -> Self {
        Self {
            api: Some(api),
            ..Self::new(config)
        }
    }

    /// Set up credentials with the provider.
    ///
    /// Only checks the key locally; a bad key shows up on the first request.
    pub fn configure(&mut self, api_key: &ApiKey) -> Result<(), LlmError> {
        let client = GeminiClient::new(self.config.clone(), api_key.clone())?;
        self.api = Some(Arc::new(client));
        info!("Gemini API configured ({})", self.config.endpoint);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Models from the last refresh (recommended list before any refresh).
    pub fn available_models(&self) -> &[String] {
        &self.available
    }

    pub fn current_model(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Refresh the list of usable models.
    ///
    /// Never fails: if the provider can't be asked, or has nothing usable,
    /// the recommended list is returned instead.
    pub async fn fetch_available_models(&mut self) -> Vec<String> {
        let models = match &self.api {
            Some(api) => match api.list_models().await {
                Ok(models) => {
                    let capable: Vec<String> = models
                        .iter()
                        .filter(|m| m.supports_generation())
                        .map(|m| m.id().to_string())
                        .collect();
                    debug!("{} of {} models support generation", capable.len(), models.len());
                    prioritize_models(&capable)
                }
                Err(e) => {
                    warn!("Could not list models, using recommended list: {}", e);
                    Vec::new()
                }
            },
            None => {
                debug!("Registry not configured, using recommended list");
                Vec::new()
            }
        };

        self.available = if models.is_empty() {
            recommended_models()
        } else {
            models
        };
        self.available.clone()
    }

    /// Bind `name` as the current model.
    ///
    /// The provider must know the model and it must support generation.
    /// On failure the previous selection is kept.
    pub async fn select_model(&mut self, name: &str) -> Result<(), LlmError> {
        let name = model_id(name.trim());
        if name.is_empty() {
            return Err(LlmError::ModelNotFound("empty model name".to_string()));
        }
        let api = self.api.as_ref().ok_or(LlmError::NotConfigured)?;

        let info = api.get_model(name).await?;
        if !info.supports_generation() {
            return Err(LlmError::ModelNotFound(format!(
                "{} does not support text generation",
                name
            )));
        }

        info!("Selected model {}", name);
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Bind the configured preferred model, or else the first available one.
    pub async fn select_default(&mut self) -> Result<String, LlmError> {
        if let Some(preferred) = self.config.model.clone() {
            match self.select_model(&preferred).await {
                Ok(()) => return Ok(model_id(preferred.trim()).to_string()),
                Err(e) => warn!("Preferred model {} unusable: {}", preferred, e),
            }
        }

        let first = self
            .available
            .first()
            .cloned()
            .ok_or_else(|| LlmError::ModelNotFound("no models available".to_string()))?;
        self.select_model(&first).await?;
        Ok(first)
    }

    /// The current model with its client, if one is bound.
    pub fn bound_model(&self) -> Option<BoundModel> {
        let api = self.api.clone()?;
        let name = self.current.clone()?;
        Some(BoundModel {
            api,
            name,
            timeout: Duration::from_secs(self.config.timeout_secs),
        })
    }

    /// Correct and classify OCR text with the current model.
    pub async fn process_text(&self, raw_text: &str) -> CorrectionResult {
        match self.bound_model() {
            Some(model) => model.process_text(raw_text).await,
            None => CorrectionResult::failed(NO_MODEL_SELECTED),
        }
    }
}
