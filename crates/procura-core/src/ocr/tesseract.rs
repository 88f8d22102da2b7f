//! Tesseract-backed text recognition.

use std::path::PathBuf;

use image::{GrayImage, ImageFormat};
use tempfile::Builder;
use tesseract::{OcrEngineMode, PageSegMode, Tesseract};
use tracing::debug;

use super::TextRecognizer;
use crate::error::OcrError;
use crate::models::OcrConfig;

/// Runs Tesseract on preprocessed images.
///
/// A fresh engine is created per call, so the recognizer itself holds only
/// configuration and can be shared between threads.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    tessdata_dir: Option<PathBuf>,
    page_seg_mode: u8,
    engine_mode: u8,
}

impl TesseractRecognizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            tessdata_dir: config.tessdata_dir.clone(),
            page_seg_mode: config.page_seg_mode,
            engine_mode: config.engine_mode,
        }
    }

    fn engine(&self, languages: &str) -> Result<Tesseract, OcrError> {
        let datapath = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| OcrError::Init(format!("non UTF-8 tessdata path {:?}", dir)))?,
            ),
            None => None,
        };

        let mut tess = Tesseract::new_with_oem(datapath, Some(languages), engine_mode(self.engine_mode))
            .map_err(|e| OcrError::Init(format!("{} ({})", e, languages)))?;
        tess.set_page_seg_mode(page_seg_mode(self.page_seg_mode));
        Ok(tess)
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage, languages: &str) -> Result<String, OcrError> {
        let temp = Builder::new()
            .prefix("procura-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Preprocessing(format!("failed to create temp file: {}", e)))?;

        image
            .save_with_format(temp.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(format!("failed to write temp image: {}", e)))?;

        let path = temp
            .path()
            .to_str()
            .ok_or_else(|| OcrError::Preprocessing("temp path is not UTF-8".to_string()))?;

        debug!("Running Tesseract ({}) on {}x{} image", languages, image.width(), image.height());

        let mut tess = self
            .engine(languages)?
            .set_image(path)
            .map_err(|e| OcrError::Recognition(format!("failed to set image: {}", e)))?;

        tess.get_text()
            .map_err(|e| OcrError::Recognition(e.to_string()))
    }
}

fn page_seg_mode(mode: u8) -> PageSegMode {
    match mode {
        0 => PageSegMode::PsmOsdOnly,
        1 => PageSegMode::PsmAutoOsd,
        2 => PageSegMode::PsmAutoOnly,
        3 => PageSegMode::PsmAuto,
        4 => PageSegMode::PsmSingleColumn,
        5 => PageSegMode::PsmSingleBlockVertText,
        7 => PageSegMode::PsmSingleLine,
        8 => PageSegMode::PsmSingleWord,
        9 => PageSegMode::PsmCircleWord,
        10 => PageSegMode::PsmSingleChar,
        11 => PageSegMode::PsmSparseText,
        12 => PageSegMode::PsmSparseTextOsd,
        13 => PageSegMode::PsmRawLine,
        _ => PageSegMode::PsmSingleBlock,
    }
}

fn engine_mode(mode: u8) -> OcrEngineMode {
    match mode {
        0 => OcrEngineMode::TesseractOnly,
        1 => OcrEngineMode::LstmOnly,
        2 => OcrEngineMode::TesseractLstmCombined,
        _ => OcrEngineMode::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_mapping_defaults() {
        assert!(matches!(page_seg_mode(6), PageSegMode::PsmSingleBlock));
        assert!(matches!(page_seg_mode(200), PageSegMode::PsmSingleBlock));
        assert!(matches!(engine_mode(3), OcrEngineMode::Default));
    }
}
