//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract OCR via command-line for text extraction. All configured
//! languages are passed in one `-l fra+ara+eng` argument so scripts are
//! recognized jointly in a single pass.

use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use image::DynamicImage;
use tempfile::TempDir;
use tracing::debug;

use super::backend::{OcrBackend, OcrConfig, OcrError, OcrResult};

/// How often to check whether the engine has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Check if a binary is available in PATH (or at the given path).
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Get the config.
    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    fn command(&self) -> String {
        shellexpand::tilde(&self.config.tesseract_cmd).into_owned()
    }

    /// Run Tesseract on an image file, returning the raw text it produced.
    fn run_tesseract(&self, image_path: &Path, work_dir: &Path) -> Result<String, OcrError> {
        let out_base = work_dir.join("page");
        let stderr_path = work_dir.join("tesseract.log");
        let psm = self.config.page_seg_mode.to_string();

        let spawned = Command::new(self.command())
            .arg(image_path)
            .arg(&out_base)
            .args(["-l", &self.config.language_arg()])
            .args(["--psm", &psm])
            .stdout(Stdio::null())
            .stderr(Stdio::from(File::create(&stderr_path)?))
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.config.tesseract_cmd
                )));
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        let status = wait_with_timeout(&mut child, self.config.timeout_secs)?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(OcrError::OcrFailed(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(std::fs::read_to_string(out_base.with_extension("txt"))?)
    }
}

/// Wait for a child process, killing it once the deadline passes.
fn wait_with_timeout(child: &mut Child, timeout_secs: u64) -> Result<ExitStatus, OcrError> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(OcrError::Timeout(timeout_secs));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.command())
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            format!(
                "Tesseract is available (languages: {}, psm {})",
                self.config.language_arg(),
                self.config.page_seg_mode
            )
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr \
             tesseract-ocr-fra tesseract-ocr-ara (or set TESSERACT_CMD)"
                .to_string()
        }
    }

    fn ocr_image(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();

        // Tesseract reads from disk, hand it a lossless copy
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("input.png");
        image
            .save(&image_path)
            .map_err(|e| OcrError::ImageError(e.to_string()))?;

        let text = self.run_tesseract(&image_path, temp_dir.path())?;
        let elapsed = start.elapsed();
        debug!(
            "tesseract produced {} chars in {:?}",
            text.chars().count(),
            elapsed
        );

        Ok(OcrResult {
            text,
            backend: self.name(),
            processing_time_ms: elapsed.as_millis() as u64,
        })
    }
}
