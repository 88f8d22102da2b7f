//! Completion of unresolved fields and validation of operator input.

use super::patterns::PatternTable;
use crate::error::{ProcuraError, Result};
use crate::models::ResolvedContext;

/// Field holding the 13-digit personal numeric code.
pub const NATIONAL_ID_FIELD: &str = "national-id";

/// Field holding the company tax identifier.
pub const TAX_ID_FIELD: &str = "company-tax-id";

/// Supplies values for fields the batch could not resolve.
pub trait FieldCompleter {
    /// Return `context` with every field in `missing` populated.
    fn complete(&mut self, context: ResolvedContext, missing: &[String]) -> Result<ResolvedContext>;
}

/// Completer that never supplies values: any missing field is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompletion;

impl FieldCompleter for NoCompletion {
    fn complete(&mut self, context: ResolvedContext, missing: &[String]) -> Result<ResolvedContext> {
        match missing.first() {
            Some(field) => Err(ProcuraError::MissingField(field.clone())),
            None => Ok(context),
        }
    }
}

/// Fields a finished document needs: every table field, in table order.
pub fn required_fields(table: &PatternTable) -> Vec<&str> {
    table.field_names()
}

/// Required fields that are absent or empty, in `required` order.
pub fn missing_fields(context: &ResolvedContext, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|field| context.get(field).is_none_or(|v| v.trim().is_empty()))
        .map(|field| field.to_string())
        .collect()
}

/// Complete `context` through `completer` and check the result.
pub fn complete_context(
    context: ResolvedContext,
    required: &[&str],
    completer: &mut dyn FieldCompleter,
) -> Result<ResolvedContext> {
    let missing = missing_fields(&context, required);
    if missing.is_empty() {
        return Ok(context);
    }

    let completed = completer.complete(context, &missing)?;
    if let Some(field) = missing_fields(&completed, required).into_iter().next() {
        return Err(ProcuraError::MissingField(field));
    }
    for field in &missing {
        if let Some(value) = completed.get(field) {
            validate_field(field, value)?;
        }
    }
    Ok(completed)
}

/// Validate an operator-supplied value.
///
/// Empty values are rejected for every field; the national ID and tax ID
/// also have a format check.
pub fn validate_field(field: &str, value: &str) -> Result<()> {
    let value = value.trim();
    let invalid = |reason: &str| ProcuraError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("value is required"));
    }

    match field {
        NATIONAL_ID_FIELD if !is_national_id(value) => {
            Err(invalid("must be exactly 13 digits"))
        }
        TAX_ID_FIELD if !is_tax_id(value) => {
            Err(invalid("must be 2 to 10 digits, optionally prefixed by a country code such as RO"))
        }
        _ => Ok(()),
    }
}

/// Exactly 13 ASCII digits.
pub fn is_national_id(value: &str) -> bool {
    value.len() == 13 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Optional two-letter country prefix followed by 2 to 10 digits.
pub fn is_tax_id(value: &str) -> bool {
    let bytes = value.as_bytes();
    let digits = if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1].is_ascii_alphabetic() {
        &value[2..]
    } else {
        value
    };

    (2..=10).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}
