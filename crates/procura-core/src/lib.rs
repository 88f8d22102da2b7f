//! Core library for procura: identity field extraction from source documents.
//!
//! This crate provides:
//! - Format readers for PDF (text layer or OCR of page scans), Word and images
//! - Image preprocessing and a Tesseract OCR wrapper
//! - A pattern-table field extractor for Romanian identity and company data
//! - Batch aggregation of a directory into one resolved field context
//! - Field completion checks and DOCX template filling

pub mod batch;
pub mod docx;
pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod reader;
pub mod render;

pub use batch::{BatchAggregator, BatchReport, FileOutcome};
pub use error::{OcrError, PatternError, PdfError, ProcuraError, ReadError, RenderError, Result};
pub use extraction::{
    ExtractedFields, FieldCompleter, FieldExtractor, NoCompletion, PatternTable, complete_context,
    missing_fields, required_fields, validate_field,
};
pub use models::{FieldCandidate, ProcuraConfig, ResolvedContext};
pub use ocr::{ImagePreprocessor, TextRecognizer, UnavailableRecognizer, default_recognizer};
#[cfg(feature = "native")]
pub use ocr::TesseractRecognizer;
pub use reader::{DocumentReader, SUPPORTED_EXTENSIONS, SourceFormat};
pub use render::{DocxTemplateRenderer, TemplateRenderer};
