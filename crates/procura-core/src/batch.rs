//! Batch aggregation over a directory of source documents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{ProcuraError, ReadError, Result};
use crate::extraction::FieldExtractor;
use crate::models::{FieldCandidate, ResolvedContext};
use crate::reader::{DocumentReader, is_supported};

/// What happened to one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Characters of text read.
    pub chars: usize,
    /// Fields found, in table order.
    pub fields: Vec<String>,
    /// Read failure, if any.
    pub error: Option<String>,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Candidates per field, in file order.
    pub candidates: BTreeMap<String, Vec<FieldCandidate>>,
    /// One entry per processed file, in processing order.
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    /// First candidate of every field.
    pub fn resolve(&self) -> ResolvedContext {
        ResolvedContext::from_candidates(self.candidates.values().flatten())
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.candidate_count() == 0
    }

    /// Number of candidates per field.
    pub fn field_counts(&self) -> BTreeMap<&str, usize> {
        self.candidates
            .iter()
            .map(|(field, list)| (field.as_str(), list.len()))
            .collect()
    }
}

/// Reads every document of a directory and merges the extracted fields.
pub struct BatchAggregator {
    reader: DocumentReader,
    extractor: FieldExtractor,
}

impl BatchAggregator {
    pub fn new(reader: DocumentReader, extractor: FieldExtractor) -> Self {
        Self { reader, extractor }
    }

    pub fn reader(&self) -> &DocumentReader {
        &self.reader
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Supported files directly inside `directory`, sorted by file name.
    pub fn collect_inputs(directory: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            if path.is_file() && is_supported(&path) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Resolve one value per field from every document in `directory`.
    ///
    /// Fails with [`ProcuraError::NoDataExtracted`] when no file yields any
    /// field.
    pub fn process(&self, directory: &Path) -> Result<ResolvedContext> {
        let files = Self::collect_inputs(directory)?;
        let report = self.process_files(&files, |_, _| {});

        if report.is_empty() {
            return Err(ProcuraError::NoDataExtracted(directory.to_path_buf()));
        }
        Ok(report.resolve())
    }

    /// Process `files` in the given order. `on_file` is called after each
    /// file with its outcome and position.
    pub fn process_files<F>(&self, files: &[PathBuf], mut on_file: F) -> BatchReport
    where
        F: FnMut(usize, &FileOutcome),
    {
        let mut report = BatchReport::default();

        for (index, path) in files.iter().enumerate() {
            info!("Processing {}", path.display());

            let (text, read_error) = match self.reader.read_file(path) {
                Ok(text) => (text, None),
                Err(ReadError::UnsupportedFormat(ext)) => {
                    warn!("Skipping {}: unsupported extension {:?}", path.display(), ext);
                    (String::new(), Some(format!("unsupported format {:?}", ext)))
                }
                Err(e) => {
                    error!("Failed to read {}: {}", path.display(), e);
                    (String::new(), Some(e.to_string()))
                }
            };

            let candidates = self.extractor.extract_candidates(&text, path);
            let outcome = FileOutcome {
                path: path.clone(),
                chars: text.chars().count(),
                fields: candidates.iter().map(|c| c.field.clone()).collect(),
                error: read_error,
            };

            for candidate in candidates {
                report
                    .candidates
                    .entry(candidate.field.clone())
                    .or_default()
                    .push(candidate);
            }

            on_file(index, &outcome);
            report.files.push(outcome);
        }

        info!("Extracted candidates per field: {:?}", report.field_counts());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::extraction::PatternTable;
    use crate::models::ProcuraConfig;
    use crate::ocr::TextRecognizer;
    use image::GrayImage;
    use pretty_assertions::assert_eq;

    struct Blind;

    impl TextRecognizer for Blind {
        fn recognize(&self, _image: &GrayImage, _languages: &str) -> std::result::Result<String, OcrError> {
            Ok(String::new())
        }
    }

    fn aggregator() -> BatchAggregator {
        BatchAggregator::new(
            DocumentReader::new(Box::new(Blind), &ProcuraConfig::default()),
            FieldExtractor::new(PatternTable::builtin()),
        )
    }

    #[test]
    fn test_collect_inputs_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.pdf", "notes.txt", "C.docx"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let names: Vec<String> = BatchAggregator::collect_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["C.docx", "a.pdf", "b.png"]);
    }

    #[test]
    fn test_empty_directory_has_no_data() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            aggregator().process(dir.path()),
            Err(ProcuraError::NoDataExtracted(_))
        ));
    }

    #[test]
    fn test_report_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.docx");
        std::fs::write(&broken, b"not a zip").unwrap();

        let mut seen = Vec::new();
        let report = aggregator().process_files(&[broken.clone()], |i, outcome| {
            seen.push((i, outcome.path.clone()))
        });

        assert_eq!(seen, vec![(0, broken)]);
        assert!(report.is_empty());
        assert!(report.files[0].error.is_some());
        assert_eq!(report.files[0].chars, 0);
    }

    #[test]
    fn test_resolve_takes_first_candidate() {
        let mut report = BatchReport::default();
        report.candidates.insert(
            "national-id".to_string(),
            vec![
                FieldCandidate::new("national-id", "1111111111111", "a.pdf"),
                FieldCandidate::new("national-id", "2222222222222", "b.pdf"),
            ],
        );

        let context = report.resolve();
        assert_eq!(context.get("national-id"), Some("1111111111111"));
        assert_eq!(report.field_counts().get("national-id"), Some(&2));
    }
}
