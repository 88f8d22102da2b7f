//! Pattern table: field name to ordered extraction rules.
//!
//! The table is plain data. The built-in rules live in
//! `assets/patterns.json`; a replacement table in the same format can be
//! loaded from disk. Rule order within a field is priority order, and field
//! order is the order fields are reported and prompted for.

use std::collections::HashSet;
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Built-in pattern table document.
pub static BUILTIN_PATTERNS: &str = include_str!("../../assets/patterns.json");

lazy_static! {
    static ref BUILTIN_TABLE: PatternTable =
        PatternTable::from_json(BUILTIN_PATTERNS).expect("built-in pattern table must compile");
}

/// Serialized form of one table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPatterns {
    /// Field name used as the context key.
    pub field: String,
    /// Regular expressions, highest priority first.
    pub patterns: Vec<String>,
}

/// A compiled extraction rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    source: String,
    regex: Regex,
}

impl PatternRule {
    /// Compile a rule. Matching is case-insensitive, `^`/`$` match at line
    /// boundaries and `.` matches newlines.
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .multi_line(true)
            .dot_matches_new_line(true)
            .size_limit(1 << 25)
            .build()?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Original pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Number of capture groups, not counting the whole match.
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }
}

/// Ordered rules for one field.
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub field: String,
    pub rules: Vec<PatternRule>,
}

/// Immutable, ordered mapping of field name to rules.
#[derive(Debug, Clone)]
pub struct PatternTable {
    fields: Vec<FieldRules>,
}

impl PatternTable {
    /// The table compiled from `assets/patterns.json`.
    pub fn builtin() -> Self {
        BUILTIN_TABLE.clone()
    }

    /// Parse and compile a JSON table.
    pub fn from_json(json: &str) -> Result<Self, PatternError> {
        let definitions: Vec<FieldPatterns> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    /// Load a JSON table from disk.
    pub fn from_file(path: &Path) -> Result<Self, PatternError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load `pattern_file` when given, the built-in table otherwise.
    pub fn load(pattern_file: Option<&Path>) -> Result<Self, PatternError> {
        match pattern_file {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Compile table entries, keeping their order.
    pub fn from_definitions(definitions: Vec<FieldPatterns>) -> Result<Self, PatternError> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(definitions.len());

        for definition in definitions {
            if !seen.insert(definition.field.clone()) {
                return Err(PatternError::DuplicateField(definition.field));
            }
            if definition.patterns.is_empty() {
                return Err(PatternError::EmptyField(definition.field));
            }

            let rules = definition
                .patterns
                .iter()
                .enumerate()
                .map(|(index, source)| {
                    PatternRule::compile(source).map_err(|e| PatternError::Regex {
                        field: definition.field.clone(),
                        index,
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            fields.push(FieldRules {
                field: definition.field,
                rules,
            });
        }

        Ok(Self { fields })
    }

    /// Entries in table order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldRules> {
        self.fields.iter()
    }

    /// Field names in table order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field.as_str()).collect()
    }

    /// Rules for one field.
    pub fn rules(&self, field: &str) -> Option<&[PatternRule]> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.rules.as_slice())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serializable form of the table.
    pub fn to_definitions(&self) -> Vec<FieldPatterns> {
        self.fields
            .iter()
            .map(|f| FieldPatterns {
                field: f.field.clone(),
                patterns: f.rules.iter().map(|r| r.source.clone()).collect(),
            })
            .collect()
    }

    /// Pretty-printed JSON, loadable with [`PatternTable::from_json`].
    pub fn to_json(&self) -> Result<String, PatternError> {
        Ok(serde_json::to_string_pretty(&self.to_definitions())?)
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::builtin()
    }
}
