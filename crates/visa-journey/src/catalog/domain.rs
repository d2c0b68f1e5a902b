use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::answers::AnswerValue;

/// Identity of a visa type: the route it applies to plus a short code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VisaTypeKey {
    pub origin: String,
    pub destination: String,
    pub code: String,
}

impl VisaTypeKey {
    /// Route slugs and codes are compared case-insensitively.
    pub fn new(origin: &str, destination: &str, code: &str) -> Self {
        Self {
            origin: normalize_slug(origin),
            destination: normalize_slug(destination),
            code: normalize_slug(code),
        }
    }
}

impl fmt::Display for VisaTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.origin, self.destination, self.code)
    }
}

pub(crate) fn normalize_slug(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Single-clause condition attached to a document, step, or fee.
///
/// Accepts both `{"field": "hasCAS", "value": true}` and the shorthand
/// `{"hasCAS": true}` on the wire; always serializes in the long form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConditionRepr")]
pub struct ConditionalLogic {
    pub field: String,
    pub value: AnswerValue,
}

impl ConditionalLogic {
    pub fn new(field: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionRepr {
    Clause { field: String, value: AnswerValue },
    Shorthand(BTreeMap<String, AnswerValue>),
}

impl TryFrom<ConditionRepr> for ConditionalLogic {
    type Error = String;

    fn try_from(repr: ConditionRepr) -> Result<Self, Self::Error> {
        match repr {
            ConditionRepr::Clause { field, value } => Ok(Self { field, value }),
            ConditionRepr::Shorthand(entries) => {
                if entries.len() != 1 {
                    return Err(format!(
                        "condition shorthand must name exactly one field, found {}",
                        entries.len()
                    ));
                }
                let (field, value) = entries
                    .into_iter()
                    .next()
                    .ok_or_else(|| "condition shorthand is empty".to_string())?;
                Ok(Self { field, value })
            }
        }
    }
}

/// Anything in the catalog that may be gated by a condition.
pub trait Conditional {
    fn condition(&self) -> Option<&ConditionalLogic>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default = "required_by_default")]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionalLogic>,
}

impl Conditional for CatalogDocument {
    fn condition(&self) -> Option<&ConditionalLogic> {
        self.condition.as_ref()
    }
}

fn required_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStep {
    pub id: String,
    pub step_number: u32,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionalLogic>,
}

impl Conditional for CatalogStep {
    fn condition(&self) -> Option<&ConditionalLogic> {
        self.condition.as_ref()
    }
}

/// Base application fee plus surcharges that apply only to some applicants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub currency: String,
    pub base: u32,
    #[serde(default)]
    pub additional: Vec<AdditionalFee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFee {
    pub name: String,
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionalLogic>,
}

impl Conditional for AdditionalFee {
    fn condition(&self) -> Option<&ConditionalLogic> {
        self.condition.as_ref()
    }
}

/// Question the catalog asks to personalize requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuestion {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum QuestionKind {
    Boolean,
    Text,
    Number,
    /// Answered as a `DD/MM/YYYY` string.
    Date,
    Choice { options: Vec<String> },
}

impl QuestionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            QuestionKind::Boolean => "boolean",
            QuestionKind::Text => "text",
            QuestionKind::Number => "number",
            QuestionKind::Date => "date (DD/MM/YYYY)",
            QuestionKind::Choice { .. } => "choice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaType {
    pub key: VisaTypeKey,
    pub name: String,
    pub description: String,
    pub documents: Vec<CatalogDocument>,
    pub steps: Vec<CatalogStep>,
    pub fees: FeeSchedule,
    #[serde(default)]
    pub custom_questions: Vec<CustomQuestion>,
}

/// Listing entry for a route's available visa types.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaTypeSummary {
    pub key: VisaTypeKey,
    pub name: String,
    pub description: String,
    pub currency: String,
    pub base_fee: u32,
    pub document_count: usize,
    pub step_count: usize,
}

impl VisaType {
    pub fn summary(&self) -> VisaTypeSummary {
        VisaTypeSummary {
            key: self.key.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            currency: self.fees.currency.clone(),
            base_fee: self.fees.base,
            document_count: self.documents.len(),
            step_count: self.steps.len(),
        }
    }

    pub fn question(&self, id: &str) -> Option<&CustomQuestion> {
        self.custom_questions.iter().find(|question| question.id == id)
    }
}
