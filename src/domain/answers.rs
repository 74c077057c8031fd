//! Questionnaire answers and the model feature vector.
//!
//! Field names follow the screening form (`A1_Score` … `relation`); they are
//! the contract with whatever layer collects the answers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::encoding::{
    encode, encode_binary, COUNTRY, ETHNICITY, FAMILY_HISTORY, GENDER, JAUNDICE, RELATION,
    USED_APP_BEFORE,
};

/// Number of values the screening model consumes.
pub const FEATURE_COUNT: usize = 19;

/// Questionnaire item fields, in model order.
pub const QUESTION_FIELDS: [&str; 10] = [
    "A1_Score", "A2_Score", "A3_Score", "A4_Score", "A5_Score", "A6_Score", "A7_Score", "A8_Score",
    "A9_Score", "A10_Score",
];

/// Feature names in the order the model was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "A1_Score",
    "A2_Score",
    "A3_Score",
    "A4_Score",
    "A5_Score",
    "A6_Score",
    "A7_Score",
    "A8_Score",
    "A9_Score",
    "A10_Score",
    "age",
    "gender",
    "ethnicity",
    "jaundice",
    "austim",
    "contry_of_res",
    "used_app_before",
    "result",
    "relation",
];

/// Error type for malformed answer sets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field {field} must be an integer, got {value:?}")]
    TypeFormat { field: String, value: String },
}

/// One raw answer as submitted by the form layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Text(String),
}

impl RawValue {
    fn as_integer(&self, field: &str) -> Result<i64, AnswerError> {
        match self {
            Self::Integer(v) => Ok(*v),
            Self::Text(s) => s.trim().parse().map_err(|_| AnswerError::TypeFormat {
                field: field.to_string(),
                value: s.clone(),
            }),
        }
    }

    fn as_label(&self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Field name → raw value, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAnswers(BTreeMap<String, RawValue>);

impl RawAnswers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<RawValue> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.0.get(field)
    }

    fn require(&self, field: &str) -> Result<&RawValue, AnswerError> {
        self.0
            .get(field)
            .ok_or_else(|| AnswerError::MissingField(field.to_string()))
    }

    fn integer(&self, field: &str) -> Result<i64, AnswerError> {
        self.require(field)?.as_integer(field)
    }

    fn label(&self, field: &str) -> Result<String, AnswerError> {
        Ok(self.require(field)?.as_label())
    }
}

impl FromIterator<(String, RawValue)> for RawAnswers {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Typed screening answers, parsed but not yet encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningAnswers {
    /// A1..A10 item scores (expected 0 or 1, not enforced)
    pub questions: [i64; 10],
    /// Age in years
    pub age: i64,
    pub gender: String,
    pub ethnicity: String,
    /// Jaundice at birth
    pub jaundice: String,
    /// Family member with autism
    pub family_history: String,
    pub country: String,
    pub used_app_before: String,
    /// Screening total (sum of item scores on the original instrument)
    pub result: i64,
    /// Who completed the questionnaire
    pub relation: String,
}

impl ScreeningAnswers {
    /// Parse raw answers, failing on the first missing or malformed field in
    /// feature order.
    ///
    /// # Errors
    /// `MissingField` for an absent field, `TypeFormat` for an integer field
    /// that does not parse.
    pub fn from_raw(raw: &RawAnswers) -> Result<Self, AnswerError> {
        let mut questions = [0i64; 10];
        for (slot, field) in questions.iter_mut().zip(QUESTION_FIELDS) {
            *slot = raw.integer(field)?;
        }

        Ok(Self {
            questions,
            age: raw.integer("age")?,
            gender: raw.label("gender")?,
            ethnicity: raw.label("ethnicity")?,
            jaundice: raw.label("jaundice")?,
            family_history: raw.label("austim")?,
            country: raw.label("contry_of_res")?,
            used_app_before: raw.label("used_app_before")?,
            result: raw.integer("result")?,
            relation: raw.label("relation")?,
        })
    }

    /// Encode into the model's fixed-order vector.
    #[must_use]
    pub fn to_feature_vector(&self) -> FeatureVector {
        let mut v = [0.0f64; FEATURE_COUNT];
        for (slot, q) in v.iter_mut().zip(self.questions) {
            *slot = q as f64;
        }
        v[10] = self.age as f64;
        v[11] = encode_binary(&self.gender, &GENDER) as f64;
        v[12] = encode(&self.ethnicity, &ETHNICITY) as f64;
        v[13] = encode_binary(&self.jaundice, &JAUNDICE) as f64;
        v[14] = encode_binary(&self.family_history, &FAMILY_HISTORY) as f64;
        v[15] = encode(&self.country, &COUNTRY) as f64;
        v[16] = encode_binary(&self.used_app_before, &USED_APP_BEFORE) as f64;
        v[17] = self.result as f64;
        v[18] = encode(&self.relation, &RELATION) as f64;
        FeatureVector(v)
    }

    /// Values outside the instrument's usual ranges.
    ///
    /// Informational only: out-of-range answers are still scored.
    #[must_use]
    pub fn range_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (field, q) in QUESTION_FIELDS.iter().zip(self.questions) {
            if q != 0 && q != 1 {
                warnings.push(format!("{field} {q} is not 0 or 1"));
            }
        }
        if self.age < 0 {
            warnings.push(format!("age {} is negative", self.age));
        }
        if !(0..=10).contains(&self.result) {
            warnings.push(format!("result {} out of range [0, 10]", self.result));
        }
        warnings
    }
}

/// Fixed-order numeric input to the screening model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    /// Value by feature name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Assemble the feature vector from raw answers.
///
/// # Errors
/// See [`ScreeningAnswers::from_raw`].
pub fn build(raw: &RawAnswers) -> Result<FeatureVector, AnswerError> {
    let answers = ScreeningAnswers::from_raw(raw)?;
    for warning in answers.range_warnings() {
        tracing::debug!("answer outside expected range: {warning}");
    }
    Ok(answers.to_feature_vector())
}
