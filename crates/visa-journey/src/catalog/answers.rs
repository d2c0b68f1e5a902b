use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const CAS_DATE_FORMAT: &str = "%d/%m/%Y";

/// Scalar answer to a personalization question, or the expected value of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// Loose truthiness used by boolean conditions: `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            AnswerValue::Bool(value) => *value,
            AnswerValue::Number(value) => *value != 0.0 && !value.is_nan(),
            AnswerValue::Text(value) => !value.is_empty(),
        }
    }

    pub const fn kind_label(&self) -> &'static str {
        match self {
            AnswerValue::Bool(_) => "boolean",
            AnswerValue::Number(_) => "number",
            AnswerValue::Text(_) => "text",
        }
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Applicant answers keyed by question id.
///
/// The fields every catalog relies on are typed; anything else a catalog
/// asks lands in `extra` and is flattened back into the same JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationData {
    #[serde(rename = "hasCAS", default, skip_serializing_if = "Option::is_none")]
    pub has_cas: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "cas_date")]
    pub cas_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_location: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, AnswerValue>,
}

impl PersonalizationData {
    pub const HAS_CAS: &'static str = "hasCAS";
    pub const CAS_DATE: &'static str = "casDate";
    pub const STUDY_LOCATION: &'static str = "studyLocation";

    /// Parse answers arriving at the HTTP boundary.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value)
            .map_err(|err| ValidationError::InvalidPersonalization(err.to_string()))
    }

    /// Uniform lookup across typed and open-ended answers. Missing keys are `None`.
    pub fn get(&self, field: &str) -> Option<AnswerValue> {
        match field {
            Self::HAS_CAS => self.has_cas.map(AnswerValue::Bool),
            Self::CAS_DATE => self
                .cas_date
                .map(|date| AnswerValue::Text(date.format(CAS_DATE_FORMAT).to_string())),
            Self::STUDY_LOCATION => self.study_location.clone().map(AnswerValue::Text),
            other => self.extra.get(other).cloned(),
        }
    }

    /// Set an answer by question id, routing known ids to their typed slot.
    pub fn set(&mut self, field: &str, value: AnswerValue) -> Result<(), ValidationError> {
        match (field, value) {
            (Self::HAS_CAS, AnswerValue::Bool(flag)) => self.has_cas = Some(flag),
            (Self::HAS_CAS, other) => {
                return Err(ValidationError::AnswerKind {
                    field: field.to_string(),
                    expected: "boolean",
                    found: other.kind_label(),
                })
            }
            (Self::CAS_DATE, AnswerValue::Text(raw)) => self.cas_date = Some(parse_cas_date(&raw)?),
            (Self::CAS_DATE, other) => {
                return Err(ValidationError::AnswerKind {
                    field: field.to_string(),
                    expected: "date (DD/MM/YYYY)",
                    found: other.kind_label(),
                })
            }
            (Self::STUDY_LOCATION, AnswerValue::Text(location)) => {
                self.study_location = Some(location)
            }
            (Self::STUDY_LOCATION, other) => {
                return Err(ValidationError::AnswerKind {
                    field: field.to_string(),
                    expected: "text",
                    found: other.kind_label(),
                })
            }
            (other, value) => {
                self.extra.insert(other.to_string(), value);
            }
        }
        Ok(())
    }

    /// Shallow per-key overwrite; keys absent from `partial` are kept.
    pub fn merge(&mut self, partial: PersonalizationData) {
        let PersonalizationData {
            has_cas,
            cas_date,
            study_location,
            extra,
        } = partial;

        if has_cas.is_some() {
            self.has_cas = has_cas;
        }
        if cas_date.is_some() {
            self.cas_date = cas_date;
        }
        if study_location.is_some() {
            self.study_location = study_location;
        }
        self.extra.extend(extra);
    }

    /// Every answered question id with its value, typed fields first.
    pub fn entries(&self) -> Vec<(String, AnswerValue)> {
        let mut entries = Vec::with_capacity(self.extra.len() + 3);
        for field in [Self::HAS_CAS, Self::CAS_DATE, Self::STUDY_LOCATION] {
            if let Some(value) = self.get(field) {
                entries.push((field.to_string(), value));
            }
        }
        entries.extend(
            self.extra
                .iter()
                .map(|(field, value)| (field.clone(), value.clone())),
        );
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.has_cas.is_none()
            && self.cas_date.is_none()
            && self.study_location.is_none()
            && self.extra.is_empty()
    }
}

/// Strict `DD/MM/YYYY`: two-digit day and month, four-digit year, real calendar date.
pub fn parse_cas_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::InvalidCasDate {
        value: raw.to_string(),
    };

    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[2] == b'/'
        && bytes[5] == b'/'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, byte)| idx == 2 || idx == 5 || byte.is_ascii_digit());
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(raw, CAS_DATE_FORMAT).map_err(|_| invalid())
}

pub fn format_cas_date(date: NaiveDate) -> String {
    date.format(CAS_DATE_FORMAT).to_string()
}

mod cas_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&super::format_cas_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| super::parse_cas_date(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}
