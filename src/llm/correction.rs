//! OCR correction request and tagged-response parsing.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::client::prompts::{
    render_correction_prompt, TAG_CONFIDENCE, TAG_CORRECTED_TEXT, TAG_DOCUMENT_TYPE,
};
use super::client::{GenerativeApi, LlmError};

/// Document type when the response has no usable type section.
pub const DEFAULT_DOCUMENT_TYPE: &str = "Non détecté";

/// Confidence when the response has no usable confidence section.
pub const DEFAULT_CONFIDENCE: &str = "Non spécifié";

/// Error reported when correction is requested without a bound model.
pub const NO_MODEL_SELECTED: &str = "no model selected";

/// Raw OCR text to be corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRequest {
    source_text: String,
}

impl CorrectionRequest {
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Prompt sent to the model.
    pub fn prompt(&self) -> String {
        render_correction_prompt(&self.source_text)
    }
}

/// Outcome of a correction request.
///
/// When `error` is set the other fields are empty. `raw_response` always
/// holds the model output verbatim, even when every section parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionResult {
    pub document_type: String,
    pub corrected_text: String,
    pub confidence: String,
    pub raw_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CorrectionResult {
    /// Result carrying only an error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            document_type: String::new(),
            corrected_text: String::new(),
            confidence: String::new(),
            raw_response: String::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Interpret the free-form confidence, if it is one of the known words.
    pub fn confidence_level(&self) -> Option<ConfidenceLevel> {
        ConfidenceLevel::parse(&self.confidence)
    }
}

/// Confidence vocabulary the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Accepts the French words from the prompt and their English equivalents.
    pub fn parse(s: &str) -> Option<Self> {
        let word = s
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match word.as_str() {
            "élevé" | "élevée" | "eleve" | "elevee" | "haute" | "high" => Some(Self::High),
            "moyen" | "moyenne" | "medium" => Some(Self::Medium),
            "faible" | "basse" | "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Find the content of `<TAG>...</TAG>`.
///
/// Returns `None` when either tag is absent. The close tag is looked up after
/// the open tag; if the only close tag precedes the open tag the section is
/// empty.
fn tagged_section<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = text.find(&open)? + open.len();
    match text[start..].find(&close) {
        Some(len) => Some(text[start..start + len].trim()),
        None if text.contains(&close) => Some(""),
        None => None,
    }
}

/// Parse a tagged model response.
///
/// Each section is located independently, so their order does not matter.
/// Missing sections fall back to their defaults instead of failing the parse.
pub fn parse_response(raw: &str) -> CorrectionResult {
    let section = |tag: &str, default: &str| {
        tagged_section(raw, tag)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    };

    CorrectionResult {
        document_type: section(TAG_DOCUMENT_TYPE, DEFAULT_DOCUMENT_TYPE),
        corrected_text: section(TAG_CORRECTED_TEXT, ""),
        confidence: section(TAG_CONFIDENCE, DEFAULT_CONFIDENCE),
        raw_response: raw.to_string(),
        error: None,
    }
}

/// Ask `model` to correct and classify `raw_text`.
///
/// Provider failures, including the call outliving `timeout`, come back as a
/// result with `error` set.
pub async fn request_correction(
    api: &dyn GenerativeApi,
    model: &str,
    raw_text: &str,
    timeout: Duration,
) -> CorrectionResult {
    let prompt = CorrectionRequest::new(raw_text).prompt();

    let outcome = match tokio::time::timeout(timeout, api.generate(model, &prompt)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(LlmError::Timeout(timeout.as_secs())),
    };

    match outcome {
        Ok(response) => {
            let result = parse_response(&response);
            info!(
                "{} classified document as '{}' (confidence: {})",
                model, result.document_type, result.confidence
            );
            result
        }
        Err(e) => {
            warn!("Correction with {} failed: {}", model, e);
            CorrectionResult::failed(format!("Gemini API error: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "Voici le résultat :\n\
        <TYPE_DOCUMENT>\nFacture\n</TYPE_DOCUMENT>\n\
        <TEXTE_CORRIGE>\n  Facture n° 2024-117\n\nMontant : 1 250,00 €  \n</TEXTE_CORRIGE>\n\
        <CONFIANCE>  Élevé </CONFIANCE>\n";

    #[test]
    fn test_parse_well_formed() {
        let result = parse_response(WELL_FORMED);
        assert_eq!(result.document_type, "Facture");
        assert_eq!(
            result.corrected_text,
            "Facture n° 2024-117\n\nMontant : 1 250,00 €"
        );
        assert_eq!(result.confidence, "Élevé");
        assert_eq!(result.raw_response, WELL_FORMED);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_missing_confidence_uses_default() {
        let raw = "<TYPE_DOCUMENT>CV / Curriculum Vitae</TYPE_DOCUMENT>\n\
                   <TEXTE_CORRIGE>Jean Dupont, ingénieur</TEXTE_CORRIGE>";
        let result = parse_response(raw);
        assert_eq!(result.confidence, "Non spécifié");
        assert_eq!(result.document_type, "CV / Curriculum Vitae");
        assert_eq!(result.corrected_text, "Jean Dupont, ingénieur");
    }

    #[test]
    fn test_untagged_response_keeps_defaults_and_raw() {
        let raw = "Je ne peux pas traiter ce document.";
        let result = parse_response(raw);
        assert_eq!(result.document_type, "Non détecté");
        assert_eq!(result.corrected_text, "");
        assert_eq!(result.confidence, "Non spécifié");
        assert_eq!(result.raw_response, raw);
    }

    #[test]
    fn test_sections_in_any_order() {
        let raw = "<CONFIANCE>Moyen</CONFIANCE>\
                   <TEXTE_CORRIGE>Bonjour</TEXTE_CORRIGE>\
                   <TYPE_DOCUMENT>Correspondance personnelle</TYPE_DOCUMENT>";
        let result = parse_response(raw);
        assert_eq!(result.document_type, "Correspondance personnelle");
        assert_eq!(result.corrected_text, "Bonjour");
        assert_eq!(result.confidence, "Moyen");
    }

    #[test]
    fn test_close_before_open_is_empty() {
        let raw = "</TYPE_DOCUMENT> oops <TYPE_DOCUMENT>Facture\n\
                   <CONFIANCE>Faible</CONFIANCE>";
        let result = parse_response(raw);
        assert_eq!(result.document_type, "");
        assert_eq!(result.confidence, "Faible");
    }

    #[test]
    fn test_stray_close_before_well_formed_section() {
        let raw = "</TEXTE_CORRIGE><TEXTE_CORRIGE>Texte</TEXTE_CORRIGE>";
        assert_eq!(parse_response(raw).corrected_text, "Texte");
    }

    #[test]
    fn test_open_without_close_uses_default() {
        let result = parse_response("<TYPE_DOCUMENT>Facture");
        assert_eq!(result.document_type, "Non détecté");
    }

    #[test]
    fn test_multibyte_content_is_sliced_safely() {
        let raw = "<TEXTE_CORRIGE>مرحبا بكم, été</TEXTE_CORRIGE>";
        assert_eq!(parse_response(raw).corrected_text, "مرحبا بكم, été");
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::parse("Élevé"), Some(ConfidenceLevel::High));
        assert_eq!(ConfidenceLevel::parse(" élevée."), Some(ConfidenceLevel::High));
        assert_eq!(ConfidenceLevel::parse("Medium"), Some(ConfidenceLevel::Medium));
        assert_eq!(ConfidenceLevel::parse("FAIBLE"), Some(ConfidenceLevel::Low));
        assert_eq!(ConfidenceLevel::parse("Non spécifié"), None);
    }

    #[test]
    fn test_failed_result_is_empty() {
        let result = CorrectionResult::failed("no model selected");
        assert!(result.is_error());
        assert!(result.document_type.is_empty());
        assert!(result.raw_response.is_empty());
    }
}
