//! OCR engine abstraction.
//!
//! Defines the [`OcrEngine`] trait so the HTTP layer and the image analysis
//! pipeline do not care which backend recognizes the text.

pub mod tesseract;

use anyhow::{Context, Result};
use std::io::Cursor;

pub use tesseract::TesseractEngine;

/// Text recognized in one image.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    /// Recognized text with surrounding whitespace stripped. May be empty.
    pub text: String,
    /// Mean word confidence in `[0, 1]`, if the engine reported any.
    pub confidence: Option<f64>,
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    async fn recognize(&self, image: &[u8]) -> Result<OcrOutput>;
}

/// Decode an image in any supported format and re-encode it as a
/// single-channel PNG.
pub fn to_grayscale_png(image: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(image).context("Failed to decode image")?;
    let gray = image::DynamicImage::ImageLuma8(decoded.to_luma8());

    let mut png = Vec::new();
    gray.write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .context("Failed to encode grayscale image")?;
    Ok(png)
}
