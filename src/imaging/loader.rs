//! Image decoding.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading an image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Image file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unrecognized image format or corrupt file: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to write image: {0}")]
    Save(image::ImageError),
}

/// Load and decode an image file.
///
/// The file is read into memory first and the format is sniffed from its
/// contents, so the extension does not have to match the actual encoding.
pub fn load_image(path: &Path) -> Result<DynamicImage, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let image = image::load_from_memory(&bytes)?;

    debug!(
        "Decoded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}
