//! Prompt for OCR correction and document classification.
//!
//! The response grammar is three tagged sections, in this order:
//! document type, corrected text, confidence.

/// Tag wrapping the detected document type.
pub const TAG_DOCUMENT_TYPE: &str = "TYPE_DOCUMENT";

/// Tag wrapping the corrected text.
pub const TAG_CORRECTED_TEXT: &str = "TEXTE_CORRIGE";

/// Tag wrapping the confidence of the classification.
pub const TAG_CONFIDENCE: &str = "CONFIANCE";

/// Categories the model chooses from. The last one is the catch-all.
pub const DOCUMENT_CATEGORIES: [&str; 12] = [
    "Lettre formelle / Courrier officiel",
    "Facture / Devis",
    "Contrat / Document juridique",
    "CV / Curriculum Vitae",
    "Article / Publication",
    "Rapport / Compte-rendu",
    "Formulaire administratif",
    "Document médical",
    "Document académique / Diplôme",
    "Correspondance personnelle",
    "Document commercial",
    "Autre (préciser)",
];

/// Correction prompt. `{categories}` and `{text}` are filled in by
/// `render_correction_prompt`.
pub const CORRECTION_PROMPT: &str = r#"Tu es un expert en correction de texte OCR et en classification de documents. Le texte ci-dessous a été extrait d'une image numérisée par OCR et contient probablement des erreurs de reconnaissance.

TEXTE BRUT (OCR) :
"""
{text}
"""

INSTRUCTIONS :
1. CORRECTION : corrige les caractères mal reconnus, les espaces manquants ou en trop, l'orthographe, la grammaire et la ponctuation. Recolle les mots coupés ou déformés. Conserve la langue et la structure du document.
2. CLASSIFICATION : détermine le type du document parmi les catégories suivantes :
{categories}

Réponds STRICTEMENT au format suivant, avec ces balises et dans cet ordre :
<TYPE_DOCUMENT>
[type de document détecté]
</TYPE_DOCUMENT>
<TEXTE_CORRIGE>
[texte entièrement corrigé et proprement mis en forme]
</TEXTE_CORRIGE>
<CONFIANCE>
[niveau de confiance de la classification : Élevé, Moyen ou Faible]
</CONFIANCE>"#;

/// Build the full prompt for a piece of raw OCR text.
pub fn render_correction_prompt(raw_text: &str) -> String {
    let categories = DOCUMENT_CATEGORIES
        .iter()
        .map(|c| format!("   - {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    // Fill categories first so OCR text containing "{categories}" is left alone
    CORRECTION_PROMPT
        .replace("{categories}", &categories)
        .replace("{text}", raw_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_text_and_grammar() {
        let prompt = render_correction_prompt("Facturc n° 12");
        assert!(prompt.contains("\"\"\"\nFacturc n° 12\n\"\"\""));
        assert!(prompt.contains("   - Facture / Devis"));
        assert!(prompt.contains("   - Autre (préciser)"));

        let type_pos = prompt.find("<TYPE_DOCUMENT>").unwrap();
        let text_pos = prompt.find("<TEXTE_CORRIGE>").unwrap();
        let conf_pos = prompt.find("<CONFIANCE>").unwrap();
        assert!(type_pos < text_pos && text_pos < conf_pos);
    }

    #[test]
    fn test_placeholders_in_ocr_text_survive() {
        let prompt = render_correction_prompt("literal {text} here");
        assert!(prompt.contains("literal {text} here"));
        assert!(!prompt.contains("{categories}"));
    }
}
