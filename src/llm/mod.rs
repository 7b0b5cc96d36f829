//! LLM integration: Gemini client, model registry, and the OCR correction
//! request/response contract.

pub mod client;
pub mod correction;
pub mod registry;

pub use client::{
    ApiKey, ApiKeyStatus, GeminiClient, GenerativeApi, LlmConfig, LlmError, ModelInfo, API_KEY_ENV,
};
pub use correction::{
    parse_response, request_correction, ConfidenceLevel, CorrectionRequest, CorrectionResult,
};
pub use registry::{prioritize_models, BoundModel, ModelRegistry, RECOMMENDED_MODELS};
