//! Rule-based field extraction over plain text.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::trace;

use super::patterns::{PatternRule, PatternTable};
use crate::models::FieldCandidate;

lazy_static! {
    static ref DISALLOWED_CHARS: Regex =
        Regex::new(r"[^\w\s\.\-/,ĂÂÎȘȚăâîșț]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Field name to extracted value.
pub type ExtractedFields = BTreeMap<String, String>;

/// Maps free-form text to field values using a [`PatternTable`].
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    table: PatternTable,
}

impl FieldExtractor {
    pub fn new(table: PatternTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Extract every field the text has a match for. Fields without a
    /// match are absent.
    pub fn extract(&self, text: &str) -> ExtractedFields {
        self.table
            .fields()
            .filter_map(|entry| {
                search(&entry.rules, text).map(|value| (entry.field.clone(), value))
            })
            .collect()
    }

    /// Same as [`FieldExtractor::extract`], tagged with the source document
    /// and in table order.
    pub fn extract_candidates(&self, text: &str, source: &Path) -> Vec<FieldCandidate> {
        self.table
            .fields()
            .filter_map(|entry| {
                search(&entry.rules, text)
                    .map(|value| FieldCandidate::new(entry.field.as_str(), value, source))
            })
            .collect()
    }
}

/// Try `rules` in order and return the cleaned value of the first match.
pub fn search(rules: &[PatternRule], text: &str) -> Option<String> {
    for rule in rules {
        let Some(caps) = rule.regex().captures(text) else {
            continue;
        };

        let cleaned = clean_text(&select_value(&caps));
        if cleaned.is_empty() {
            trace!("Rule {:?} matched only noise, trying next", rule.source());
            continue;
        }

        trace!("Rule {:?} matched {:?}", rule.source(), cleaned);
        return Some(cleaned);
    }
    None
}

/// Pick the value of a match.
///
/// One group: that group. Two groups: both concatenated, or whichever one
/// participated. Anything else, or no participating group: the whole match.
fn select_value<'t>(caps: &Captures<'t>) -> Cow<'t, str> {
    let full = caps.get(0).map_or("", |m| m.as_str());

    match caps.len() - 1 {
        1 => Cow::Borrowed(caps.get(1).map_or(full, |m| m.as_str())),
        2 => match (caps.get(1), caps.get(2)) {
            (Some(first), Some(second)) => {
                Cow::Owned(format!("{}{}", first.as_str(), second.as_str()))
            }
            (Some(only), None) | (None, Some(only)) => Cow::Borrowed(only.as_str()),
            (None, None) => Cow::Borrowed(full),
        },
        _ => Cow::Borrowed(full),
    }
}

/// Replace characters outside the allowed set with spaces, collapse
/// whitespace and trim.
pub fn clean_text(text: &str) -> String {
    let replaced = DISALLOWED_CHARS.replace_all(text, " ");
    collapse_whitespace(&replaced)
}

/// Collapse whitespace runs to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(PatternTable::builtin())
    }

    #[test]
    fn test_empty_text_extracts_nothing() {
        assert!(extractor().extract("").is_empty());
    }

    #[test]
    fn test_national_id_after_label() {
        let ex = extractor();

        for text in [
            "CNP 1234567890123",
            "Subsemnatul, cnp: 1234567890123, domiciliat",
            "Cnp-1234567890123",
            "CNP:\n1234567890123",
        ] {
            let fields = ex.extract(text);
            assert_eq!(
                fields.get("national-id").map(String::as_str),
                Some("1234567890123"),
                "text: {:?}",
                text
            );
        }
    }

    #[test]
    fn test_national_id_needs_thirteen_digits() {
        let fields = extractor().extract("CNP 123456789012");
        assert!(!fields.contains_key("national-id"));
    }

    #[test]
    fn test_first_rule_wins_over_earlier_text() {
        // The second rule's phrase appears first, but the first rule matches.
        let text = "Cod Unic de Înregistrare: 11111111\nCUI: RO22222222";
        let fields = extractor().extract(text);

        assert_eq!(fields["company-tax-id"], "RO22222222");
    }

    #[test]
    fn test_falls_back_to_lower_priority_rule() {
        let text = "Cod Unic de Înregistrare: 11111111\nCUI: 22222222";
        let fields = extractor().extract(text);

        assert_eq!(fields["company-tax-id"], "11111111");
    }

    #[test]
    fn test_tax_id_two_groups_merged() {
        let fields = extractor().extract("Date firmă\nCUI: RO\n12345678\n");
        assert_eq!(fields["company-tax-id"], "RO12345678");
    }

    #[test]
    fn test_two_group_rule_with_one_participating_group() {
        let ex = extractor();

        let fields = ex.extract("VAT number: 12345678");
        assert_eq!(fields["company-tax-id"], "12345678");

        let fields = ex.extract("VAT number: RO 12345678");
        assert_eq!(fields["company-tax-id"], "RO12345678");
    }

    #[test]
    fn test_extract_is_idempotent() {
        let ex = extractor();
        let text = "Asociat unic: POPESCU ION, cetatean roman, CNP 1800101123456";

        assert_eq!(ex.extract(text), ex.extract(text));
    }

    #[test]
    fn test_cleanup_normalizes_whitespace() {
        let table = PatternTable::from_json(
            r#"[{ "field": "full-name", "patterns": ["Nume:(.*?);"] }]"#,
        )
        .unwrap();
        let fields = FieldExtractor::new(table).extract("Nume:  Ion   Popescu \n;");

        assert_eq!(fields["full-name"], "Ion Popescu");
    }

    #[test]
    fn test_clean_text_strips_symbols() {
        assert_eq!(clean_text("  Ion*   Popescu \n"), "Ion Popescu");
        assert_eq!(clean_text("Str. Lalelor nr. 5, bl. A/2"), "Str. Lalelor nr. 5, bl. A/2");
        assert_eq!(clean_text("Ștefan (Țurcanu)"), "Ștefan Țurcanu");
    }

    #[test]
    fn test_noise_only_match_tries_next_rule() {
        let table = PatternTable::from_json(
            r#"[{ "field": "code", "patterns": ["Cod:\\s*(\\*+)", "Cod:\\s*\\**\\s*(\\d+)"] }]"#,
        )
        .unwrap();
        let fields = FieldExtractor::new(table).extract("Cod: *** 42");

        assert_eq!(fields["code"], "42");
    }

    #[test]
    fn test_person_fields() {
        let text = "Asociat unic: POPESCU ION, cetatean roman, născut la data de 01.02.1980 \
                    în Mun. București, domiciliat în Mun. București, Str. Lalelor nr. 5, \
                    identificat cu CI seria RX nr. 123456, CNP 1800201123456";
        let fields = extractor().extract(text);

        assert_eq!(fields["full-name"], "POPESCU ION");
        assert_eq!(fields["birth-date"], "01.02.1980");
        assert_eq!(fields["residence-address"], "Mun. București, Str. Lalelor nr. 5");
        assert_eq!(fields["id-document-reference"], "CI seria RX nr. 123456");
        assert_eq!(fields["national-id"], "1800201123456");
    }

    #[test]
    fn test_company_fields() {
        let text = "Denumirea societății este: ALFA CONSULT S.R.L.\n\
                    EUID: ROONRC.J2020001234406\n\
                    Nr. de ordine în registrul comerțului: J40/1234/2020\n";
        let fields = extractor().extract(text);

        assert_eq!(fields["company-name"], "ALFA CONSULT S.R.L.");
        assert_eq!(fields["european-unique-identifier"], "ROONRC.J2020001234406");
        assert_eq!(fields["trade-register-number"], "J40/1234/2020");
    }

    #[test]
    fn test_candidates_carry_source() {
        let candidates =
            extractor().extract_candidates("CNP 1234567890123", Path::new("in/a.pdf"));

        assert_eq!(
            candidates,
            vec![FieldCandidate::new("national-id", "1234567890123", "in/a.pdf")]
        );
    }
}
