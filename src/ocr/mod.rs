//! OCR and text extraction module.
//!
//! Extracts text from images using Tesseract OCR (default) behind the
//! `OcrBackend` trait. The default configuration recognizes French, Arabic
//! and English jointly and assumes a uniform block of text.

mod backend;
mod extractor;
mod tesseract;

pub use backend::{OcrBackend, OcrConfig, OcrError, OcrResult, PageSegMode};
pub use extractor::{ExtractionResult, TextExtractor};
pub use tesseract::{check_binary, TesseractBackend};
