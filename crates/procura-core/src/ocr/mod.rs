//! OCR pipeline: image preprocessing and text recognition.

mod preprocessing;
#[cfg(feature = "native")]
mod tesseract;

pub use preprocessing::{ImagePreprocessor, adaptive_gaussian_threshold, clahe, median_blur};
#[cfg(feature = "native")]
pub use self::tesseract::TesseractRecognizer;

use image::GrayImage;

use crate::error::OcrError;
use crate::models::OcrConfig;

/// A text recognition engine.
///
/// `languages` uses Tesseract notation, e.g. `ron+eng`.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage, languages: &str) -> Result<String, OcrError>;
}

/// Recognizer for builds without an OCR engine. Always fails with
/// [`OcrError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image: &GrayImage, _languages: &str) -> Result<String, OcrError> {
        Err(OcrError::Unavailable)
    }
}

/// The best recognizer this build supports.
#[cfg(feature = "native")]
pub fn default_recognizer(config: &OcrConfig) -> Box<dyn TextRecognizer> {
    Box::new(TesseractRecognizer::new(config))
}

/// The best recognizer this build supports.
#[cfg(not(feature = "native"))]
pub fn default_recognizer(_config: &OcrConfig) -> Box<dyn TextRecognizer> {
    Box::new(UnavailableRecognizer)
}
