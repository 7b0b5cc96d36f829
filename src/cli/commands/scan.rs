//! Scan command: load, enhance, extract and optionally correct one image.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Args;
use console::style;

use crate::cli::helpers::{
    confirm, error_icon, hint_icon, preview, spinner, success_icon, PREVIEW_CHARS,
};
use crate::config::Config;
use crate::llm::{ApiKeyStatus, LlmError, ModelRegistry};
use crate::ocr::TextExtractor;
use crate::session::{CorrectionStatus, PipelineOptions, Session};

/// How often the spinner checks on the background correction.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Args)]
pub struct ScanArgs {
    /// Scanned image (PNG, JPEG, BMP, TIFF, WebP)
    pub image: PathBuf,

    /// Skip grayscale/denoise/binarize preprocessing
    #[arg(long)]
    pub no_enhance: bool,

    /// Load the image without running OCR
    #[arg(long)]
    pub no_extract: bool,

    /// Send the extracted text to Gemini for correction
    #[arg(short, long)]
    pub correct: bool,

    /// Don't ask before sending text to Gemini
    #[arg(short, long)]
    pub yes: bool,

    /// Gemini model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the final text (corrected if available) to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ScanArgs {
    fn pipeline_options(&self, defaults: PipelineOptions) -> PipelineOptions {
        PipelineOptions {
            enhance: defaults.enhance && !self.no_enhance,
            extract: defaults.extract && !self.no_extract,
        }
    }
}

pub async fn cmd_scan(config: &Config, args: ScanArgs) -> anyhow::Result<()> {
    let options = args.pipeline_options(config.pipeline);
    let mut session = Session::new();
    session.load_image(&args.image)?;

    let extractor = TextExtractor::new(config.ocr.clone());
    if options.extract && !extractor.backend().is_available() {
        eprintln!(
            "{} {}",
            error_icon(),
            style(extractor.backend().availability_hint()).dim()
        );
    }

    let pb = spinner(format!("Extracting text from {}...", args.image.display()))?;
    let extraction = session.run_extraction(&extractor, options);
    pb.finish_and_clear();
    let extraction = extraction?.clone();

    if !args.json {
        if let Some(err) = &extraction.error {
            eprintln!("{} {}", error_icon(), err);
        }
        print_section("Extracted text", &extraction.text);
    }

    if args.correct {
        correct(config, &args, &mut session).await?;
    }

    if let Some(path) = &args.output {
        let text = final_text(&session);
        std::fs::write(path, text)?;
        if !args.json {
            println!("{} Saved text to {}", success_icon(), path.display());
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.report())?);
    }

    Ok(())
}

/// Correction step: credential check, model selection, confirmation, then
/// the background request with a spinner.
async fn correct(config: &Config, args: &ScanArgs, session: &mut Session) -> anyhow::Result<()> {
    if !session.can_start_correction() {
        eprintln!("{} No text to correct", hint_icon());
        return Ok(());
    }

    let key_status = ApiKeyStatus::from_env();
    let Some(key) = key_status.key() else {
        eprintln!(
            "{} {}: Gemini API key {}",
            error_icon(),
            style("Configuration required").bold(),
            key_status.describe()
        );
        eprintln!("{}", ApiKeyStatus::setup_hint());
        bail!(LlmError::NotConfigured);
    };

    let mut registry = ModelRegistry::new(config.llm.clone());
    registry.configure(key)?;

    let pb = spinner("Selecting model...")?;
    let selected = match &args.model {
        Some(name) => registry.select_model(name).await.map(|()| name.clone()),
        None => {
            registry.fetch_available_models().await;
            registry.select_default().await
        }
    };
    pb.finish_and_clear();
    let model = selected?;

    if !args.yes {
        eprintln!("\n{}", style("Text to send:").cyan());
        eprintln!("{}\n", preview(session.raw_text(), PREVIEW_CHARS));
        match confirm(&format!("Send this text to {}?", model))? {
            Some(true) => {}
            Some(false) => {
                eprintln!("{} Correction skipped", hint_icon());
                return Ok(());
            }
            None => {
                eprintln!(
                    "{} Not a terminal, pass --yes to send text for correction",
                    hint_icon()
                );
                return Ok(());
            }
        }
    }

    session.start_correction(&registry)?;
    let pb = spinner(format!("Correcting with {}...", model))?;
    let status = loop {
        match session.poll_correction() {
            CorrectionStatus::Pending => tokio::time::sleep(POLL_INTERVAL).await,
            status => break status,
        }
    };
    pb.finish_and_clear();

    if status == CorrectionStatus::Failed {
        bail!(session
            .last_error()
            .unwrap_or("correction failed")
            .to_string());
    }

    let Some(result) = session.correction() else {
        return Ok(());
    };
    if args.json {
        return Ok(());
    }
    if let Some(err) = &result.error {
        eprintln!("{} {}", error_icon(), err);
        return Ok(());
    }

    println!(
        "\n{} {}  {} {}",
        style("Document type:").cyan(),
        result.document_type,
        style("Confidence:").cyan(),
        result.confidence
    );
    print_section("Corrected text", &result.corrected_text);
    Ok(())
}

/// Corrected text when a correction succeeded, raw OCR text otherwise.
fn final_text(session: &Session) -> &str {
    match session.correction() {
        Some(c) if c.error.is_none() && !c.corrected_text.is_empty() => &c.corrected_text,
        _ => session.raw_text(),
    }
}

fn print_section(title: &str, text: &str) {
    println!("\n{}", style(title).bold());
    println!("{}", "-".repeat(50));
    if text.is_empty() {
        println!("{}", style("(no text detected)").dim());
    } else {
        println!("{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(no_enhance: bool, no_extract: bool) -> ScanArgs {
        ScanArgs {
            image: PathBuf::from("scan.png"),
            no_enhance,
            no_extract,
            correct: false,
            yes: false,
            model: None,
            json: false,
            output: None,
        }
    }

    #[test]
    fn test_flags_only_disable_stages() {
        let defaults = PipelineOptions {
            enhance: false,
            extract: true,
        };
        let options = args(false, false).pipeline_options(defaults);
        assert!(!options.enhance);
        assert!(options.extract);

        let options = args(true, true).pipeline_options(PipelineOptions::default());
        assert!(!options.enhance);
        assert!(!options.extract);
    }

    #[test]
    fn test_final_text_without_correction_is_raw() {
        let session = Session::new();
        assert_eq!(final_text(&session), "");
    }
}
