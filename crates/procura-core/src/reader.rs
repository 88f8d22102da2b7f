//! Format readers: source document to plain text.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::docx;
use crate::error::ReadError;
use crate::extraction::collapse_whitespace;
use crate::models::ProcuraConfig;
use crate::ocr::{ImagePreprocessor, TextRecognizer, default_recognizer};
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Extensions the readers accept, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "png", "jpg", "jpeg", "tiff", "bmp"];

/// Input document format, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Native or scanned PDF.
    Pdf,
    /// Word document.
    Word,
    /// Photographed or scanned image.
    Image,
}

impl SourceFormat {
    /// Format for an extension, case-insensitive.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Word),
            "png" | "jpg" | "jpeg" | "tiff" | "bmp" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Whether `path` has a supported extension.
pub fn is_supported(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some()
}

/// Reads any supported document into text.
pub struct DocumentReader {
    recognizer: Box<dyn TextRecognizer>,
    preprocessor: ImagePreprocessor,
    languages: String,
    fallback_language: String,
}

impl DocumentReader {
    /// Create a reader around a specific recognizer.
    pub fn new(recognizer: Box<dyn TextRecognizer>, config: &ProcuraConfig) -> Self {
        Self {
            recognizer,
            preprocessor: ImagePreprocessor::from_config(&config.preprocessing),
            languages: config.ocr.languages.clone(),
            fallback_language: config.ocr.fallback_language.clone(),
        }
    }

    /// Create a reader with the default recognizer for this build.
    pub fn from_config(config: &ProcuraConfig) -> Self {
        Self::new(default_recognizer(&config.ocr), config)
    }

    /// Read a file, dispatching on its extension.
    pub fn read_file(&self, path: &Path) -> Result<String, ReadError> {
        let format = SourceFormat::from_path(path).ok_or_else(|| {
            ReadError::UnsupportedFormat(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        debug!("Reading {} as {:?}", path.display(), format);
        match format {
            SourceFormat::Pdf => self.read_pdf(path),
            SourceFormat::Word => self.read_docx(path),
            SourceFormat::Image => self.read_image(path),
        }
    }

    /// Like [`DocumentReader::read_file`], but failures are logged and
    /// yield empty text.
    pub fn read_file_lossy(&self, path: &Path) -> String {
        match self.read_file(path) {
            Ok(text) => text,
            Err(ReadError::UnsupportedFormat(ext)) => {
                warn!("Unsupported extension {:?}: {}", ext, path.display());
                String::new()
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                String::new()
            }
        }
    }

    /// Read a PDF, falling back to OCR of the page scans when there is no
    /// text layer.
    pub fn read_pdf(&self, path: &Path) -> Result<String, ReadError> {
        let data = std::fs::read(path)?;
        let extractor = PdfExtractor::from_bytes(&data).map_err(|e| ReadError::decode(path, e))?;

        let mut text = String::new();
        for page in 1..=extractor.page_count() {
            match extractor.extract_page_text(page) {
                Ok(page_text) if !page_text.trim().is_empty() => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Ok(_) => {}
                Err(e) => debug!("No text layer on page {} of {}: {}", page, path.display(), e),
            }
        }
        if !text.trim().is_empty() {
            return Ok(text);
        }

        match extractor.extract_text() {
            Ok(full) if !full.trim().is_empty() => return Ok(full),
            Ok(_) => {}
            Err(e) => debug!("Whole-document text pass failed for {}: {}", path.display(), e),
        }

        info!("{} looks scanned, running OCR", path.display());
        Ok(self.ocr_pages(&extractor, path))
    }

    fn ocr_pages(&self, extractor: &PdfExtractor, path: &Path) -> String {
        let mut text = String::new();

        for page in 1..=extractor.page_count() {
            let image = match extractor.render_page(page) {
                Ok(image) => image,
                Err(e) => {
                    error!("Page {} of {} has no usable image: {}", page, path.display(), e);
                    continue;
                }
            };

            let binary = self.preprocessor.preprocess(&image);
            match self.recognizer.recognize(&binary, &self.languages) {
                Ok(page_text) if !page_text.trim().is_empty() => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Ok(_) => debug!("OCR found no text on page {} of {}", page, path.display()),
                Err(e) => error!("OCR failed on page {} of {}: {}", page, path.display(), e),
            }
        }

        text
    }

    /// Read a Word document. Legacy binary `.doc` files fail to decode.
    pub fn read_docx(&self, path: &Path) -> Result<String, ReadError> {
        let file = File::open(path)?;
        docx::docx_text(BufReader::new(file)).map_err(|reason| ReadError::decode(path, reason))
    }

    /// OCR an image with the combined language model, retrying with the
    /// fallback model when nothing is recognized.
    pub fn read_image(&self, path: &Path) -> Result<String, ReadError> {
        let binary = self.preprocessor.open(path)?;

        let mut text = self.recognizer.recognize(&binary, &self.languages)?;
        if text.trim().is_empty() {
            debug!(
                "OCR with {} found nothing in {}, retrying with {}",
                self.languages,
                path.display(),
                self.fallback_language
            );
            text = self.recognizer.recognize(&binary, &self.fallback_language)?;
        }

        Ok(collapse_whitespace(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use image::GrayImage;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// Answers by language and records every call.
    struct ScriptedRecognizer {
        answers: Vec<(&'static str, &'static str)>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&self, _image: &GrayImage, languages: &str) -> Result<String, OcrError> {
            self.calls.lock().unwrap().push(languages.to_string());
            Ok(self
                .answers
                .iter()
                .find(|(lang, _)| *lang == languages)
                .map(|(_, text)| text.to_string())
                .unwrap_or_default())
        }
    }

    fn reader(answers: Vec<(&'static str, &'static str)>) -> (DocumentReader, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recognizer = ScriptedRecognizer {
            answers,
            calls: Arc::clone(&calls),
        };
        (
            DocumentReader::new(Box::new(recognizer), &ProcuraConfig::default()),
            calls,
        )
    }

    fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        GrayImage::from_pixel(16, 16, image::Luma([255])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::from_path(Path::new("a/B.PDF")), Some(SourceFormat::Pdf));
        assert_eq!(SourceFormat::from_path(Path::new("x.doc")), Some(SourceFormat::Word));
        assert_eq!(SourceFormat::from_path(Path::new("x.Jpeg")), Some(SourceFormat::Image));
        assert_eq!(SourceFormat::from_path(Path::new("x.txt")), None);
        assert_eq!(SourceFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_image_uses_combined_model_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "id.png");
        let (reader, calls) = reader(vec![("ron+eng", "  CNP\n 1800201123456  ")]);

        assert_eq!(reader.read_image(&path).unwrap(), "CNP 1800201123456");
        assert_eq!(*calls.lock().unwrap(), vec!["ron+eng".to_string()]);
    }

    #[test]
    fn test_image_falls_back_to_single_language() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "id.jpg.png");
        let (reader, calls) = reader(vec![("ron+eng", " \n "), ("eng", "Name  Ion")]);

        assert_eq!(reader.read_image(&path).unwrap(), "Name Ion");
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["ron+eng".to_string(), "eng".to_string()]
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "CNP 1800201123456").unwrap();
        let (reader, _) = reader(vec![]);

        assert!(matches!(reader.read_file(&path), Err(ReadError::UnsupportedFormat(e)) if e == "txt"));
        assert_eq!(reader.read_file_lossy(&path), "");
    }

    #[test]
    fn test_corrupt_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (reader, calls) = reader(vec![]);

        for name in ["broken.pdf", "legacy.doc", "photo.png"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"garbage").unwrap();

            assert!(matches!(reader.read_file(&path), Err(ReadError::Decode { .. })), "{}", name);
            assert_eq!(reader.read_file_lossy(&path), "");
        }
        assert!(calls.lock().unwrap().is_empty());
    }
}
