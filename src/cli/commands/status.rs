//! Status command.

use console::style;

use crate::cli::helpers::{error_icon, success_icon};
use crate::config::Config;
use crate::llm::{ApiKeyStatus, RECOMMENDED_MODELS};
use crate::ocr::{OcrBackend, TesseractBackend};

/// Show OCR engine, credential and configuration status.
pub fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("\n{}", style("scanscribe status").bold());
    println!("{}", "-".repeat(50));

    println!("\n{}", style("OCR:").cyan());
    let tesseract = TesseractBackend::with_config(config.ocr.clone());
    if tesseract.is_available() {
        println!("  {:<15} {} {}", "Tesseract", success_icon(), config.ocr.tesseract_cmd);
    } else {
        println!("  {:<15} {} not available", "Tesseract", error_icon());
        println!("                  {}", style(tesseract.availability_hint()).dim());
    }
    println!("  {:<15} {}", "Languages", config.ocr.language_arg());
    println!("  {:<15} {}", "Page layout", config.ocr.page_seg_mode.as_psm());

    println!("\n{}", style("Gemini:").cyan());
    let key_status = ApiKeyStatus::from_env();
    let icon = if key_status.is_configured() {
        success_icon()
    } else {
        error_icon()
    };
    println!("  {:<15} {} {}", "API key", icon, key_status.describe());
    println!(
        "  {:<15} {}",
        "Model",
        config
            .llm
            .model
            .as_deref()
            .unwrap_or(RECOMMENDED_MODELS[0])
    );
    println!("  {:<15} {}", "Endpoint", config.llm.endpoint);
    if !key_status.is_configured() {
        println!();
        for line in ApiKeyStatus::setup_hint().lines() {
            println!("  {}", style(line).dim());
        }
    }

    println!("\n{}", style("Pipeline:").cyan());
    println!("  {:<15} {}", "Enhance", on_off(config.pipeline.enhance));
    println!("  {:<15} {}", "Extract", on_off(config.pipeline.extract));
    println!(
        "  {:<15} {}",
        "Config file",
        config
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults)".to_string())
    );

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
