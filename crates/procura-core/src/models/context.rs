//! Field candidates and the resolved field context.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A value matched for one field in one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCandidate {
    /// Field name from the pattern table.
    pub field: String,
    /// Cleaned matched value.
    pub value: String,
    /// Document the value was read from.
    pub source: PathBuf,
}

impl FieldCandidate {
    pub fn new(field: impl Into<String>, value: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            source: source.into(),
        }
    }
}

/// One value per field, handed to completion and rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedContext {
    values: BTreeMap<String, String>,
}

impl ResolvedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from candidates in document order; the first value
    /// seen for a field is kept.
    pub fn from_candidates<'a>(candidates: impl IntoIterator<Item = &'a FieldCandidate>) -> Self {
        let mut context = Self::new();
        for candidate in candidates {
            context
                .values
                .entry(candidate.field.clone())
                .or_insert_with(|| candidate.value.clone());
        }
        context
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.values
    }
}

impl From<BTreeMap<String, String>> for ResolvedContext {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, String)> for ResolvedContext {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_candidate_wins() {
        let candidates = vec![
            FieldCandidate::new("national-id", "1111111111111", "a.pdf"),
            FieldCandidate::new("full-name", "Ion Popescu", "a.pdf"),
            FieldCandidate::new("national-id", "2222222222222", "b.pdf"),
        ];

        let context = ResolvedContext::from_candidates(&candidates);

        assert_eq!(context.len(), 2);
        assert_eq!(context.get("national-id"), Some("1111111111111"));
        assert_eq!(context.get("full-name"), Some("Ion Popescu"));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let mut context = ResolvedContext::new();
        context.insert("company-tax-id", "RO12345678");

        let json = serde_json::to_string(&context).unwrap();
        assert_eq!(json, r#"{"company-tax-id":"RO12345678"}"#);
    }
}
