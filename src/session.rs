//! Processing session: one image moving through load, extraction and
//! correction.
//!
//! Extraction runs on the caller. Correction runs as a single background
//! task whose result comes back over a oneshot channel; the caller observes
//! it with `poll_correction` or `wait_for_correction`. While that task is
//! outstanding no second correction can be started.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::imaging::{enhance, load_image, LoadError};
use crate::llm::{CorrectionResult, ModelRegistry};
use crate::ocr::{ExtractionResult, TextExtractor};

/// Where the session is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    ImageLoaded,
    Extracting,
    Extracted,
    Correcting,
    Corrected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::ImageLoaded => "image_loaded",
            SessionState::Extracting => "extracting",
            SessionState::Extracted => "extracted",
            SessionState::Correcting => "correcting",
            SessionState::Corrected => "corrected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which pipeline stages to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Grayscale, denoise and binarize before OCR.
    #[serde(default = "default_true")]
    pub enhance: bool,
    /// Run OCR at all.
    #[serde(default = "default_true")]
    pub extract: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            enhance: true,
            extract: true,
        }
    }
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("No image loaded")]
    NoImage,

    #[error("No extracted text to correct")]
    NothingToCorrect,

    #[error("No model selected")]
    NoModelSelected,

    #[error("A correction is already in progress")]
    CorrectionInFlight,

    #[error("No correction in progress")]
    NoCorrectionPending,

    #[error("Extraction aborted: {0}")]
    ExtractionAborted(String),

    #[error("Correction worker stopped without a result")]
    WorkerStopped,
}

/// Progress of a background correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStatus {
    /// Nothing was started.
    Idle,
    /// Still waiting on the provider.
    Pending,
    /// A result is available in `Session::correction`.
    Finished,
    /// The worker went away; see `Session::last_error`.
    Failed,
}

/// Serializable view of a session for reports.
#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    pub image: Option<&'a Path>,
    pub state: SessionState,
    pub extraction: Option<&'a ExtractionResult>,
    pub correction: Option<&'a CorrectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<&'a str>,
}

/// A single active processing session.
pub struct Session {
    state: SessionState,
    image_path: Option<PathBuf>,
    image: Option<DynamicImage>,
    extraction: Option<ExtractionResult>,
    correction: Option<CorrectionResult>,
    last_error: Option<String>,
    pending: Option<oneshot::Receiver<CorrectionResult>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            image_path: None,
            image: None,
            extraction: None,
            correction: None,
            last_error: None,
            pending: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.extraction.as_ref()
    }

    pub fn correction(&self) -> Option<&CorrectionResult> {
        self.correction.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Raw OCR text from the last extraction (empty if none).
    pub fn raw_text(&self) -> &str {
        self.extraction.as_ref().map_or("", |e| e.text.as_str())
    }

    /// Whether a background correction is outstanding.
    pub fn is_correction_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether `start_correction` would be accepted, model aside.
    pub fn can_start_correction(&self) -> bool {
        matches!(
            self.state,
            SessionState::Extracted | SessionState::Corrected
        ) && !self.raw_text().is_empty()
            && self.pending.is_none()
    }

    /// Snapshot for JSON output.
    pub fn report(&self) -> SessionReport<'_> {
        SessionReport {
            image: self.image_path(),
            state: self.state,
            extraction: self.extraction(),
            correction: self.correction(),
            last_error: self.last_error(),
        }
    }

    /// Load a new image, discarding all previous results.
    ///
    /// A correction still running for the previous image is detached; its
    /// result is dropped when it arrives.
    pub fn load_image(&mut self, path: &Path) -> Result<(), SessionError> {
        if self.pending.take().is_some() {
            debug!("Detaching in-flight correction for previous image");
        }
        self.image = None;
        self.image_path = None;
        self.extraction = None;
        self.correction = None;
        self.last_error = None;

        match load_image(path) {
            Ok(image) => {
                info!("Loaded {}", path.display());
                self.image = Some(image);
                self.image_path = Some(path.to_path_buf());
                self.state = SessionState::ImageLoaded;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.state = SessionState::Idle;
                Err(e.into())
            }
        }
    }

    /// Run preprocessing and OCR on the loaded image.
    ///
    /// Allowed right after loading, and again after a previous run so the
    /// user can retry. Engine failures land in `ExtractionResult::error`
    /// and still move the session to `Extracted`.
    pub fn run_extraction(
        &mut self,
        extractor: &TextExtractor,
        options: PipelineOptions,
    ) -> Result<&ExtractionResult, SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::CorrectionInFlight);
        }
        match self.state {
            SessionState::ImageLoaded | SessionState::Extracted | SessionState::Corrected => {}
            SessionState::Idle => return Err(SessionError::NoImage),
            state => {
                return Err(SessionError::InvalidState {
                    operation: "run extraction",
                    state,
                })
            }
        }
        let image = self.image.as_ref().ok_or(SessionError::NoImage)?;

        self.extraction = None;
        self.correction = None;
        self.last_error = None;
        self.state = SessionState::Extracting;

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let enhanced;
            let working = if options.enhance {
                enhanced = enhance(image);
                &enhanced
            } else {
                image
            };

            if options.extract {
                extractor.extract(working)
            } else {
                debug!("OCR disabled, skipping extraction");
                ExtractionResult::skipped()
            }
        }));

        match outcome {
            Ok(result) => {
                if let Some(err) = &result.error {
                    self.last_error = Some(err.clone());
                }
                self.state = SessionState::Extracted;
                Ok(&*self.extraction.insert(result))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("OCR backend panicked: {}", message);
                self.last_error = Some(message.clone());
                self.state = SessionState::ImageLoaded;
                Err(SessionError::ExtractionAborted(message))
            }
        }
    }

    /// Start correcting the extracted text in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_correction(&mut self, registry: &ModelRegistry) -> Result<(), SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::CorrectionInFlight);
        }
        match self.state {
            SessionState::Extracted | SessionState::Corrected => {}
            state => {
                return Err(SessionError::InvalidState {
                    operation: "start correction",
                    state,
                })
            }
        }
        if self.raw_text().is_empty() {
            return Err(SessionError::NothingToCorrect);
        }
        let model = registry
            .bound_model()
            .ok_or(SessionError::NoModelSelected)?;

        let text = self.raw_text().to_string();
        let (tx, rx) = oneshot::channel();
        info!("Sending {} chars to {}", text.chars().count(), model.name());

        tokio::spawn(async move {
            let result = model.process_text(&text).await;
            if tx.send(result).is_err() {
                debug!("Correction result discarded, session moved on");
            }
        });

        self.pending = Some(rx);
        self.correction = None;
        self.last_error = None;
        self.state = SessionState::Correcting;
        Ok(())
    }

    /// Check on the background correction without blocking.
    pub fn poll_correction(&mut self) -> CorrectionStatus {
        let Some(rx) = self.pending.as_mut() else {
            return match self.state {
                SessionState::Corrected => CorrectionStatus::Finished,
                _ => CorrectionStatus::Idle,
            };
        };

        match rx.try_recv() {
            Ok(result) => {
                self.finish_correction(result);
                CorrectionStatus::Finished
            }
            Err(TryRecvError::Empty) => CorrectionStatus::Pending,
            Err(TryRecvError::Closed) => {
                self.abandon_correction();
                CorrectionStatus::Failed
            }
        }
    }

    /// Wait for the background correction to finish.
    pub async fn wait_for_correction(&mut self) -> Result<&CorrectionResult, SessionError> {
        let rx = self
            .pending
            .as_mut()
            .ok_or(SessionError::NoCorrectionPending)?;

        match rx.await {
            Ok(result) => {
                self.finish_correction(result);
                self.correction
                    .as_ref()
                    .ok_or(SessionError::WorkerStopped)
            }
            Err(_) => {
                self.abandon_correction();
                Err(SessionError::WorkerStopped)
            }
        }
    }

    fn finish_correction(&mut self, result: CorrectionResult) {
        self.pending = None;
        if let Some(err) = &result.error {
            self.last_error = Some(err.clone());
        }
        self.correction = Some(result);
        self.state = SessionState::Corrected;
    }

    fn abandon_correction(&mut self) {
        warn!("Correction worker stopped without a result");
        self.pending = None;
        self.last_error = Some(SessionError::WorkerStopped.to_string());
        self.state = SessionState::Extracted;
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "OCR backend panicked".to_string()
    }
}
