//! Category encoding for questionnaire answers.
//!
//! The tables here are frozen to the label → code mapping the screening model
//! was trained with. Changing any entry requires retraining the model.
//!
//! Unknown labels are folded into the default code `0`. That is lossy (an
//! unrecognised label aliases a real category), so every fallback is counted
//! and logged at debug level.

use std::sync::atomic::{AtomicU64, Ordering};

/// Code returned for any label absent from a mapping.
pub const DEFAULT_CODE: i64 = 0;

static FALLBACK_HITS: AtomicU64 = AtomicU64::new(0);

/// A closed, ordered label → code table for one categorical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMapping {
    field: &'static str,
    entries: &'static [(&'static str, i64)],
}

impl CategoryMapping {
    #[must_use]
    pub const fn new(field: &'static str, entries: &'static [(&'static str, i64)]) -> Self {
        Self { field, entries }
    }

    /// Form field this mapping encodes.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Exact, case-sensitive lookup.
    #[must_use]
    pub fn lookup(&self, label: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(known, _)| *known == label)
            .map(|(_, code)| *code)
    }

    /// Labels in table order.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(label, _)| *label)
    }
}

/// A yes/no style field encoded as `1` for the positive token and `0` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryToken {
    field: &'static str,
    positive: &'static str,
    negative: &'static str,
}

impl BinaryToken {
    #[must_use]
    pub const fn new(field: &'static str, positive: &'static str, negative: &'static str) -> Self {
        Self {
            field,
            positive,
            negative,
        }
    }

    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    #[must_use]
    pub fn positive(&self) -> &'static str {
        self.positive
    }
}

pub const ETHNICITY: CategoryMapping = CategoryMapping::new(
    "ethnicity",
    &[("White", 0), ("Asian", 1), ("Black", 2), ("Others", 3)],
);

pub const COUNTRY: CategoryMapping = CategoryMapping::new(
    "contry_of_res",
    &[("India", 0), ("USA", 1), ("UK", 2), ("Others", 3)],
);

pub const RELATION: CategoryMapping = CategoryMapping::new(
    "relation",
    &[
        ("Parent", 0),
        ("Self", 1),
        ("Relative", 2),
        ("Health Care Professional", 3),
    ],
);

pub const GENDER: BinaryToken = BinaryToken::new("gender", "Male", "Female");
pub const JAUNDICE: BinaryToken = BinaryToken::new("jaundice", "Yes", "No");
pub const FAMILY_HISTORY: BinaryToken = BinaryToken::new("austim", "Yes", "No");
pub const USED_APP_BEFORE: BinaryToken = BinaryToken::new("used_app_before", "Yes", "No");

/// Encode `label` with `mapping`, returning [`DEFAULT_CODE`] for unknown labels.
#[must_use]
pub fn encode(label: &str, mapping: &CategoryMapping) -> i64 {
    match mapping.lookup(label) {
        Some(code) => code,
        None => {
            record_fallback(mapping.field);
            DEFAULT_CODE
        }
    }
}

/// `1` iff `label` equals the positive token exactly.
#[must_use]
pub fn encode_binary(label: &str, token: &BinaryToken) -> i64 {
    if label == token.positive {
        1
    } else {
        if label != token.negative {
            record_fallback(token.field);
        }
        0
    }
}

/// Number of labels folded into the default code since process start.
#[must_use]
pub fn fallback_hits() -> u64 {
    FALLBACK_HITS.load(Ordering::Relaxed)
}

fn record_fallback(field: &'static str) {
    FALLBACK_HITS.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(field, "unrecognised label encoded as default code");
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_labels_map_to_training_codes() {
        assert_eq!(encode("Asian", &ETHNICITY), 1);
        assert_eq!(encode("Others", &ETHNICITY), 3);
        assert_eq!(encode("UK", &COUNTRY), 2);
        assert_eq!(encode("Health Care Professional", &RELATION), 3);
        assert_eq!(encode("Parent", &RELATION), 0);
    }

    #[test]
    fn test_binary_tokens_are_case_sensitive() {
        assert_eq!(encode_binary("Male", &GENDER), 1);
        assert_eq!(encode_binary("male", &GENDER), 0);
        assert_eq!(encode_binary("Female", &GENDER), 0);
        assert_eq!(encode_binary("Yes", &JAUNDICE), 1);
        assert_eq!(encode_binary("YES", &JAUNDICE), 0);
        assert_eq!(encode_binary("No", &USED_APP_BEFORE), 0);
    }

    #[test]
    fn test_fallback_is_counted() {
        let before = fallback_hits();
        assert_eq!(encode("Atlantis", &COUNTRY), DEFAULT_CODE);
        assert_eq!(encode_binary("maybe", &FAMILY_HISTORY), 0);
        // Other tests may run concurrently and add hits of their own.
        assert!(fallback_hits() >= before + 2);
    }

    #[test]
    fn test_labels_listed_in_table_order() {
        let labels: Vec<_> = COUNTRY.labels().collect();
        assert_eq!(labels, vec!["India", "USA", "UK", "Others"]);
    }

    proptest! {
        #[test]
        fn unmapped_labels_encode_to_default(label in "\\PC{0,24}") {
            for mapping in [ETHNICITY, COUNTRY, RELATION] {
                if mapping.lookup(&label).is_none() {
                    prop_assert_eq!(encode(&label, &mapping), DEFAULT_CODE);
                }
            }
        }

        #[test]
        fn binary_is_one_only_for_positive_token(label in "[A-Za-z ]{0,8}") {
            let expected = i64::from(label == "Yes");
            prop_assert_eq!(encode_binary(&label, &JAUNDICE), expected);
        }
    }
}
