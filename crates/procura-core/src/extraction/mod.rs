//! Identity field extraction.

mod extractor;
pub mod patterns;
pub mod validation;

pub use extractor::{ExtractedFields, FieldExtractor, clean_text, collapse_whitespace, search};
pub use patterns::{FieldPatterns, FieldRules, PatternRule, PatternTable};
pub use validation::{
    FieldCompleter, NoCompletion, complete_context, missing_fields, required_fields, validate_field,
};
