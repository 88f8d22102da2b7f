//! Error types for the procura-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the procura library.
#[derive(Error, Debug)]
pub enum ProcuraError {
    /// A source document could not be read.
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Pattern table error.
    #[error("pattern table error: {0}")]
    Pattern(#[from] PatternError),

    /// Template rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// No field candidate was produced by any file of a batch.
    #[error("no data extracted from {}", .0.display())]
    NoDataExtracted(PathBuf),

    /// A required field could not be resolved.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field value failed validation.
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while turning a source document into text.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The file is not a valid instance of its claimed format.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// The file extension is not one of the supported formats.
    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    /// OCR failed for the whole file.
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReadError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ReadError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to parse the PDF structure.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// Failed to extract text.
    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    /// The page carries no image that can be decoded.
    #[error("no decodable image on page {0}")]
    NoPageImage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine could not be initialized.
    #[error("failed to initialize OCR engine: {0}")]
    Init(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image could not be prepared for recognition.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// The build does not include an OCR engine.
    #[error("OCR support is not compiled in")]
    Unavailable,
}

/// Errors related to loading the pattern table.
#[derive(Error, Debug)]
pub enum PatternError {
    /// The table document is not valid JSON of the expected shape.
    #[error("invalid pattern table: {0}")]
    Parse(#[from] serde_json::Error),

    /// A rule failed to compile.
    #[error("rule {index} of {field} does not compile: {reason}")]
    Regex {
        field: String,
        index: usize,
        reason: String,
    },

    /// The same field appears more than once.
    #[error("field {0} is defined more than once")]
    DuplicateField(String),

    /// A field has no rules.
    #[error("field {0} has no patterns")]
    EmptyField(String),

    /// I/O error while reading a table file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to template rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The template is not a readable DOCX archive.
    #[error("invalid template {}: {reason}", path.display())]
    Template { path: PathBuf, reason: String },

    /// The template references a key that the context does not provide.
    #[error("template placeholder {0:?} has no value")]
    MissingKey(String),

    /// Writing the output document failed.
    #[error("failed to write output: {0}")]
    Output(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the procura library.
pub type Result<T> = std::result::Result<T, ProcuraError>;
