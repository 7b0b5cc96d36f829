//! OCR backend abstraction.
//!
//! The extractor only needs "given pixels, return text"; backends hide how
//! that happens (a subprocess for Tesseract, canned text in tests).

use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Result of OCR processing.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Extracted text content, untrimmed.
    pub text: String,
    /// Which backend produced this result.
    pub backend: &'static str,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;

    /// Check if this backend can run (binaries installed, etc).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Run OCR on a decoded image.
    fn ocr_image(&self, image: &DynamicImage) -> Result<OcrResult, OcrError>;
}

/// Tesseract page segmentation modes we expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation (psm 3).
    Auto,
    /// Single column of text of variable sizes (psm 4).
    SingleColumn,
    /// Single uniform block of text (psm 6).
    #[default]
    UniformBlock,
    /// Sparse text in no particular order (psm 11).
    SparseText,
}

impl PageSegMode {
    /// Numeric value passed to `--psm`.
    pub fn as_psm(&self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleColumn => 4,
            PageSegMode::UniformBlock => 6,
            PageSegMode::SparseText => 11,
        }
    }
}

impl fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_psm())
    }
}

/// Configuration for OCR backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract executable (name on PATH or full path, `~` is expanded).
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,
    /// Languages recognized jointly in a single pass.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Layout assumption for the page.
    #[serde(default)]
    pub page_seg_mode: PageSegMode,
    /// Kill the engine if it runs longer than this.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tesseract_cmd() -> String {
    "tesseract".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["fra".to_string(), "ara".to_string(), "eng".to_string()]
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: default_tesseract_cmd(),
            languages: default_languages(),
            page_seg_mode: PageSegMode::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OcrConfig {
    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(cmd) = std::env::var("TESSERACT_CMD")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            self.tesseract_cmd = cmd;
        }
        self
    }

    /// Language argument in Tesseract's `a+b+c` form.
    pub fn language_arg(&self) -> String {
        self.languages.join("+")
    }
}
