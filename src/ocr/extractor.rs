//! Text extraction with a fixed OCR configuration.
//!
//! Engine failures never escape from here: they end up in
//! `ExtractionResult::error` so the caller can show them and let the user
//! retry.

use image::DynamicImage;
use serde::Serialize;
use tracing::{info, warn};

use super::backend::{OcrBackend, OcrConfig};
use super::tesseract::TesseractBackend;

/// Result of text extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Extracted text, whitespace-trimmed. Empty means no text was detected.
    pub text: String,
    /// Engine error, if the OCR call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time spent in the engine.
    pub processing_time_ms: u64,
}

impl ExtractionResult {
    /// Result for a run where extraction was switched off.
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Whether the engine failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether there is any text to work with.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Text extractor wrapping an OCR backend.
pub struct TextExtractor {
    backend: Box<dyn OcrBackend>,
}

impl TextExtractor {
    /// Create an extractor using Tesseract with the given configuration.
    pub fn new(config: OcrConfig) -> Self {
        Self::with_backend(Box::new(TesseractBackend::with_config(config)))
    }

    /// Create an extractor on top of any backend.
    pub fn with_backend(backend: Box<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    /// The backend in use.
    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    /// Extract text from an image.
    pub fn extract(&self, image: &DynamicImage) -> ExtractionResult {
        match self.backend.ocr_image(image) {
            Ok(result) => {
                let text = result.text.trim().to_string();
                info!(
                    "{} extracted {} chars in {}ms",
                    result.backend,
                    text.chars().count(),
                    result.processing_time_ms
                );
                ExtractionResult {
                    text,
                    error: None,
                    processing_time_ms: result.processing_time_ms,
                }
            }
            Err(e) => {
                warn!("{} OCR failed: {}", self.backend.name(), e);
                ExtractionResult {
                    text: String::new(),
                    error: Some(format!("{} error: {}", self.backend.name(), e)),
                    processing_time_ms: 0,
                }
            }
        }
    }
}
