//! Image enhancement command.

use std::path::Path;

use crate::cli::helpers::success_icon;
use crate::imaging::enhance_to_file;

/// Write the preprocessed version of `image` to `output`.
pub fn cmd_enhance(image: &Path, output: &Path) -> anyhow::Result<()> {
    enhance_to_file(image, output)?;
    println!(
        "{} Enhanced {} -> {}",
        success_icon(),
        image.display(),
        output.display()
    );
    Ok(())
}
