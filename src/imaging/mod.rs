//! Image loading and OCR preprocessing.
//!
//! - `loader`: read a raster file from disk and decode it, keeping "file not
//!   found" distinct from "not an image we can decode"
//! - `preprocess`: the fixed grayscale / median blur / Otsu pipeline

mod loader;
mod preprocess;

pub use loader::{load_image, LoadError};
pub use preprocess::{enhance, enhance_to_file};
