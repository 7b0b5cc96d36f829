use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use scanscribe::llm::{GenerativeApi, LlmConfig, LlmError, ModelInfo, ModelRegistry};
use scanscribe::ocr::{OcrBackend, OcrError, OcrResult, TextExtractor};
use scanscribe::session::{CorrectionStatus, PipelineOptions, Session, SessionError, SessionState};

const INVOICE_OCR: &str = "FACTURE N° 2024-117\nDate : l2/03/2024\nTota1 TTC : 1 250,00 €";

const INVOICE_REPLY: &str = "<TYPE_DOCUMENT>\nFacture / Devis\n</TYPE_DOCUMENT>\n\
    <TEXTE_CORRIGE>\nFACTURE N° 2024-117\nDate : 12/03/2024\nTotal TTC : 1 250,00 €\n</TEXTE_CORRIGE>\n\
    <CONFIANCE>\nÉlevé\n</CONFIANCE>";

/// Reads the invoice text if the page has any ink, nothing otherwise.
/// Remembers whether every page it saw was pure black and white.
#[derive(Default)]
struct InkReader {
    saw_grey: Arc<AtomicBool>,
}

impl OcrBackend for InkReader {
    fn name(&self) -> &'static str {
        "ink"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }

    fn ocr_image(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let gray = image.to_luma8();
        if gray.pixels().any(|p| p[0] != 0 && p[0] != 255) {
            self.saw_grey.store(true, Ordering::SeqCst);
        }
        let has_ink = gray.pixels().any(|p| p[0] < 128);
        Ok(OcrResult {
            text: if has_ink { INVOICE_OCR.to_string() } else { String::new() },
            backend: "ink",
            processing_time_ms: 3,
        })
    }
}

struct InvoiceModel {
    generate_calls: AtomicUsize,
}

#[async_trait]
impl GenerativeApi for InvoiceModel {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        Ok(vec![self.get_model("gemini-1.5-flash").await?])
    }

    async fn get_model(&self, name: &str) -> Result<ModelInfo, LlmError> {
        Ok(ModelInfo {
            name: format!("models/{}", name),
            display_name: None,
            supported_generation_methods: vec!["generateContent".to_string()],
        })
    }

    async fn generate(&self, _model: &str, prompt: &str) -> Result<String, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.contains(INVOICE_OCR));
        Ok(INVOICE_REPLY.to_string())
    }
}

/// Light grey paper with three dark full-width lines of "text".
fn write_invoice(dir: &TempDir) -> PathBuf {
    let mut img = RgbImage::from_pixel(64, 48, Rgb([235, 232, 228]));
    for y in (8..12).chain(20..24).chain(32..36) {
        for x in 0..64 {
            img.put_pixel(x, y, Rgb([40, 38, 45]));
        }
    }
    let path = dir.path().join("facture.png");
    img.save(&path).unwrap();
    path
}

fn write_blank(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("blank.png");
    RgbImage::from_pixel(32, 32, Rgb([255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

async fn bound_registry(api: Arc<InvoiceModel>) -> ModelRegistry {
    let mut registry = ModelRegistry::with_api(LlmConfig::default(), api);
    registry.fetch_available_models().await;
    registry.select_default().await.unwrap();
    registry
}

fn invoice_model() -> Arc<InvoiceModel> {
    Arc::new(InvoiceModel {
        generate_calls: AtomicUsize::new(0),
    })
}

#[tokio::test]
async fn invoice_is_enhanced_extracted_and_classified() {
    let dir = TempDir::new().unwrap();
    let reader = InkReader::default();
    let saw_grey = reader.saw_grey.clone();
    let extractor = TextExtractor::with_backend(Box::new(reader));

    let mut session = Session::new();
    session.load_image(&write_invoice(&dir)).unwrap();
    let extraction = session
        .run_extraction(&extractor, PipelineOptions::default())
        .unwrap();
    assert_eq!(extraction.text, INVOICE_OCR);
    assert!(!saw_grey.load(Ordering::SeqCst), "OCR saw an unbinarized page");

    let api = invoice_model();
    let registry = bound_registry(api.clone()).await;
    session.start_correction(&registry).unwrap();
    assert_eq!(session.state(), SessionState::Correcting);

    let result = session.wait_for_correction().await.unwrap();
    assert_eq!(result.document_type, "Facture / Devis");
    assert_eq!(result.confidence, "Élevé");
    assert!(result.corrected_text.contains("Total TTC : 1 250,00 €"));
    assert!(result.error.is_none());
    assert_eq!(session.state(), SessionState::Corrected);
    assert!(!session.is_correction_in_flight());
    assert_eq!(api.generate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blank_page_yields_empty_text_without_error() {
    let dir = TempDir::new().unwrap();
    let extractor = TextExtractor::with_backend(Box::new(InkReader::default()));

    let mut session = Session::new();
    session.load_image(&write_blank(&dir)).unwrap();
    let extraction = session
        .run_extraction(&extractor, PipelineOptions::default())
        .unwrap();
    assert_eq!(extraction.text, "");
    assert!(extraction.error.is_none());
    assert_eq!(session.state(), SessionState::Extracted);

    let registry = bound_registry(invoice_model()).await;
    let err = session.start_correction(&registry).unwrap_err();
    assert!(matches!(err, SessionError::NothingToCorrect));
}

#[tokio::test]
async fn only_one_correction_in_flight() {
    let dir = TempDir::new().unwrap();
    let extractor = TextExtractor::with_backend(Box::new(InkReader::default()));
    let api = invoice_model();
    let registry = bound_registry(api.clone()).await;

    let mut session = Session::new();
    session.load_image(&write_invoice(&dir)).unwrap();
    session
        .run_extraction(&extractor, PipelineOptions::default())
        .unwrap();

    session.start_correction(&registry).unwrap();
    let err = session.start_correction(&registry).unwrap_err();
    assert!(matches!(err, SessionError::CorrectionInFlight));

    let err = session
        .run_extraction(&extractor, PipelineOptions::default())
        .unwrap_err();
    assert!(matches!(err, SessionError::CorrectionInFlight));

    let status = loop {
        match session.poll_correction() {
            CorrectionStatus::Pending => tokio::task::yield_now().await,
            status => break status,
        }
    };
    assert_eq!(status, CorrectionStatus::Finished);
    assert_eq!(api.generate_calls.load(Ordering::SeqCst), 1);

    // Corrected text can be corrected again
    session.start_correction(&registry).unwrap();
    session.wait_for_correction().await.unwrap();
    assert_eq!(api.generate_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reloading_detaches_pending_correction() {
    let dir = TempDir::new().unwrap();
    let extractor = TextExtractor::with_backend(Box::new(InkReader::default()));
    let registry = bound_registry(invoice_model()).await;

    let mut session = Session::new();
    session.load_image(&write_invoice(&dir)).unwrap();
    session
        .run_extraction(&extractor, PipelineOptions::default())
        .unwrap();
    session.start_correction(&registry).unwrap();

    session.load_image(&write_blank(&dir)).unwrap();
    assert_eq!(session.state(), SessionState::ImageLoaded);
    assert!(!session.is_correction_in_flight());
    assert_eq!(session.poll_correction(), CorrectionStatus::Idle);
    assert!(session.correction().is_none());
}

#[tokio::test]
async fn unbound_registry_never_calls_provider() {
    let api = invoice_model();
    let registry = ModelRegistry::with_api(LlmConfig::default(), api.clone());

    let result = registry.process_text(INVOICE_OCR).await;
    assert_eq!(result.error.as_deref(), Some("no model selected"));
    assert_eq!(api.generate_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn json_report_includes_state_and_text() {
    let dir = TempDir::new().unwrap();
    let extractor = TextExtractor::with_backend(Box::new(InkReader::default()));

    let mut session = Session::new();
    session.load_image(&write_invoice(&dir)).unwrap();
    session
        .run_extraction(&extractor, PipelineOptions::default())
        .unwrap();

    let report = serde_json::to_value(session.report()).unwrap();
    assert_eq!(report["state"], "extracted");
    assert_eq!(report["extraction"]["text"], INVOICE_OCR);
    assert!(report["correction"].is_null());
}
