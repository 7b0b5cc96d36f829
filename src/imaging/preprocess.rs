//! Preprocessing that prepares a scan for OCR.

use std::path::Path;

use image::DynamicImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::median_filter;
use tracing::debug;

use super::loader::{load_image, LoadError};

/// Clean up an image for OCR.
///
/// Converts to grayscale, removes salt-and-pepper noise with a 3x3 median
/// filter and binarizes with a threshold picked by Otsu's method. The result
/// only contains the values 0 and 255.
pub fn enhance(image: &DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    let denoised = median_filter(&gray, 1, 1);
    let level = otsu_level(&denoised);
    debug!("Otsu threshold level: {}", level);

    DynamicImage::ImageLuma8(threshold(&denoised, level, ThresholdType::Binary))
}

/// Enhance an image file and write the result to `output`.
///
/// The output format follows the extension of `output`.
pub fn enhance_to_file(input: &Path, output: &Path) -> Result<(), LoadError> {
    let image = load_image(input)?;
    enhance(&image).save(output).map_err(LoadError::Save)?;
    Ok(())
}
