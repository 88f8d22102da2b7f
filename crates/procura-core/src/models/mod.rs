//! Data models for the procura pipeline.

pub mod config;
pub mod context;

pub use config::{ExtractionConfig, OcrConfig, OutputConfig, PreprocessingConfig, ProcuraConfig};
pub use context::{FieldCandidate, ResolvedContext};
