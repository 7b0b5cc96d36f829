//! Model listing command.

use console::style;

use crate::cli::helpers::{hint_icon, spinner};
use crate::config::Config;
use crate::llm::{ApiKeyStatus, ModelRegistry, API_KEY_ENV, RECOMMENDED_MODELS};

/// Refresh and list models usable for correction.
pub async fn cmd_models(config: &Config) -> anyhow::Result<()> {
    let mut registry = ModelRegistry::new(config.llm.clone());

    let key_status = ApiKeyStatus::from_env();
    match key_status.key() {
        Some(key) => registry.configure(key)?,
        None => println!(
            "{} {} {}, showing recommended models",
            hint_icon(),
            style(API_KEY_ENV).bold(),
            key_status.describe()
        ),
    }

    let pb = spinner("Fetching models...")?;
    let models = registry.fetch_available_models().await;
    let default = if registry.is_configured() {
        registry.select_default().await.ok()
    } else {
        None
    };
    pb.finish_and_clear();

    println!("\n{}", style("Available models").bold());
    println!("{}", "-".repeat(50));
    for model in &models {
        let marker = if default.as_deref() == Some(model.as_str()) {
            style("*").green().to_string()
        } else {
            " ".to_string()
        };
        let note = if RECOMMENDED_MODELS.contains(&model.as_str()) {
            style("recommended").dim().to_string()
        } else {
            String::new()
        };
        println!("{} {:<32} {}", marker, model, note);
    }

    if let Some(model) = default {
        println!("\n{} Default: {}", hint_icon(), model);
    }
    Ok(())
}
