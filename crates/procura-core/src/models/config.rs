//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the procura pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcuraConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Image preprocessing configuration.
    pub preprocessing: PreprocessingConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Generated document configuration.
    pub output: OutputConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory holding Tesseract language data. `None` lets the engine
    /// use its compiled-in default (or `TESSDATA_PREFIX`).
    pub tessdata_dir: Option<PathBuf>,

    /// Combined language model used first, in Tesseract `a+b` notation.
    pub languages: String,

    /// Single-language model used when the combined model returns nothing.
    pub fallback_language: String,

    /// Tesseract page segmentation mode (6 = single uniform block of text).
    pub page_seg_mode: u8,

    /// Tesseract OCR engine mode (3 = default, based on what is available).
    pub engine_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: None,
            languages: "ron+eng".to_string(),
            fallback_language: "eng".to_string(),
            page_seg_mode: 6,
            engine_mode: 3,
        }
    }
}

/// Image preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Side of the square median filter window.
    pub median_kernel: u32,

    /// CLAHE clip limit, relative to a uniform histogram.
    pub clahe_clip_limit: f32,

    /// Number of CLAHE tiles along each axis.
    pub clahe_tiles: u32,

    /// Side of the adaptive threshold neighborhood (odd).
    pub threshold_block_size: u32,

    /// Constant subtracted from the weighted local mean.
    pub threshold_offset: i32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            median_kernel: 5,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            threshold_block_size: 11,
            threshold_offset: 2,
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Pattern table replacing the built-in one.
    pub pattern_file: Option<PathBuf>,
}

/// Generated document configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// DOCX template with `{{ field }}` placeholders.
    pub template: PathBuf,

    /// Directory generated documents are written to.
    pub output_dir: PathBuf,

    /// File name prefix; the input directory name is appended.
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("IMPUTERNICIRE_model_ro_eng.docx"),
            output_dir: PathBuf::from("procuri_completate"),
            file_prefix: "PROCURA_GENERATA_".to_string(),
        }
    }
}

impl OutputConfig {
    /// Output path for a batch read from `input_dir`.
    pub fn output_path_for(&self, input_dir: &std::path::Path) -> PathBuf {
        let name = input_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");
        self.output_dir
            .join(format!("{}{}.docx", self.file_prefix, name))
    }
}

impl ProcuraConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
