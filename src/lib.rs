//! scanscribe - scanned document OCR with LLM-assisted correction.
//!
//! Loads a scanned image, optionally cleans it up for OCR, extracts text with
//! Tesseract, and can hand the raw text to Google Gemini to fix recognition
//! errors and classify the document.

pub mod cli;
pub mod config;
pub mod imaging;
pub mod llm;
pub mod ocr;
pub mod session;
