//! Configuration management for scanscribe using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::LlmConfig;
use crate::ocr::OcrConfig;
use crate::session::PipelineOptions;

/// Name used for config file discovery (`scanscribe.toml`, `.yaml`, `.json`).
pub const CONFIG_NAME: &str = "scanscribe";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tesseract settings.
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Which pipeline stages run by default.
    #[serde(default)]
    pub pipeline: PipelineOptions,

    /// Gemini settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must load; a broken discovered file only logs a
    /// warning and falls back to defaults. Environment overrides are applied
    /// last in every case.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = explicit {
            return Ok(Self::load_from_path(path).await?.with_env_overrides());
        }

        let config = match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    warn!("Ignoring config at {}: {}", path.display(), e);
                    Self::default()
                }),
                None => Self::default(),
            },
            Err(_) => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        Ok(config.with_env_overrides())
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;

        debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Apply `TESSERACT_CMD`, `GEMINI_MODEL` and `GEMINI_ENDPOINT`.
    pub fn with_env_overrides(mut self) -> Self {
        self.ocr = self.ocr.with_env_overrides();
        self.llm = self.llm.with_env_overrides();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::PageSegMode;
    use tempfile::TempDir;

    #[test]
    fn test_parse_toml_sections() {
        let config = Config::parse(
            r#"
[ocr]
tesseract_cmd = "/opt/tesseract/bin/tesseract"
languages = ["fra", "eng"]
page_seg_mode = "auto"

[pipeline]
enhance = false

[llm]
model = "gemini-1.5-pro"
temperature = 0.0
"#,
            "toml",
        )
        .unwrap();

        assert_eq!(config.ocr.tesseract_cmd, "/opt/tesseract/bin/tesseract");
        assert_eq!(config.ocr.language_arg(), "fra+eng");
        assert_eq!(config.ocr.page_seg_mode, PageSegMode::Auto);
        assert!(!config.pipeline.enhance);
        assert!(config.pipeline.extract);
        assert_eq!(config.llm.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.llm.max_output_tokens, LlmConfig::default().max_output_tokens);
    }

    #[test]
    fn test_empty_documents_give_defaults() {
        assert_eq!(Config::parse("", "toml").unwrap(), Config::default());
        assert_eq!(Config::parse("{}", "json").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_yaml() {
        let config = Config::parse("pipeline:\n  extract: false\n", "yml").unwrap();
        assert!(!config.pipeline.extract);
        assert!(config.pipeline.enhance);
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = Config::parse("[ocr", "toml").unwrap_err();
        assert!(err.contains("TOML"));
    }

    #[tokio::test]
    async fn test_load_from_path_records_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scanscribe.json");
        std::fs::write(&path, r#"{"ocr": {"timeout_secs": 30}}"#).unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.ocr.timeout_secs, 30);
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_error() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml"))).await;
        assert!(result.unwrap_err().contains("Failed to read"));
    }
}
