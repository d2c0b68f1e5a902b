use serde::Serialize;

use super::answers::{parse_cas_date, AnswerValue, PersonalizationData};
use super::condition::evaluate;
use super::domain::{
    CatalogDocument, CatalogStep, Conditional, CustomQuestion, FeeSchedule, QuestionKind,
    VisaType, VisaTypeKey,
};
use crate::error::ValidationError;

/// Catalog item that survived filtering. `is_personalized` marks items that
/// were gated by a condition, whether or not that gate could have excluded them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Personalized<T> {
    #[serde(flatten)]
    pub item: T,
    pub is_personalized: bool,
}

/// Keep the items whose condition holds, in catalog order. The catalog is not modified.
pub fn personalize<T>(items: &[T], answers: &PersonalizationData) -> Vec<Personalized<T>>
where
    T: Conditional + Clone,
{
    items
        .iter()
        .filter(|item| evaluate(item.condition(), answers))
        .map(|item| Personalized {
            item: item.clone(),
            is_personalized: item.condition().is_some(),
        })
        .collect()
}

pub fn personalize_documents(
    documents: &[CatalogDocument],
    answers: &PersonalizationData,
) -> Vec<Personalized<CatalogDocument>> {
    personalize(documents, answers)
}

/// Filtered steps ordered by `step_number`; ties keep catalog order.
pub fn personalize_steps(
    steps: &[CatalogStep],
    answers: &PersonalizationData,
) -> Vec<Personalized<CatalogStep>> {
    let mut filtered = personalize(steps, answers);
    filtered.sort_by_key(|step| step.item.step_number);
    filtered
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFee {
    pub name: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub currency: String,
    pub base: u32,
    pub applied: Vec<AppliedFee>,
    pub total: u32,
}

/// Base fee plus every additional fee whose condition holds.
pub fn compute_fees(schedule: &FeeSchedule, answers: &PersonalizationData) -> FeeBreakdown {
    let applied: Vec<AppliedFee> = schedule
        .additional
        .iter()
        .filter(|fee| evaluate(fee.condition(), answers))
        .map(|fee| AppliedFee {
            name: fee.name.clone(),
            amount: fee.amount,
        })
        .collect();

    let total = applied
        .iter()
        .fold(schedule.base, |total, fee| total.saturating_add(fee.amount));

    FeeBreakdown {
        currency: schedule.currency.clone(),
        base: schedule.base,
        applied,
        total,
    }
}

/// Everything an applicant has to gather and do for one visa type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedRequirements {
    pub visa_type: VisaTypeKey,
    pub name: String,
    pub documents: Vec<Personalized<CatalogDocument>>,
    pub steps: Vec<Personalized<CatalogStep>>,
    pub fees: FeeBreakdown,
}

pub fn personalize_visa_type(
    visa_type: &VisaType,
    answers: &PersonalizationData,
) -> PersonalizedRequirements {
    PersonalizedRequirements {
        visa_type: visa_type.key.clone(),
        name: visa_type.name.clone(),
        documents: personalize_documents(&visa_type.documents, answers),
        steps: personalize_steps(&visa_type.steps, answers),
        fees: compute_fees(&visa_type.fees, answers),
    }
}

/// Check answers to declared questions against the declared kind.
/// Questions the catalog never asked are accepted as-is.
pub fn validate_answers(
    visa_type: &VisaType,
    answers: &PersonalizationData,
) -> Result<(), ValidationError> {
    for (field, answer) in answers.entries() {
        if let Some(question) = visa_type.question(&field) {
            check_answer(question, &answer)?;
        }
    }
    Ok(())
}

fn check_answer(question: &CustomQuestion, answer: &AnswerValue) -> Result<(), ValidationError> {
    let kind_mismatch = || ValidationError::AnswerKind {
        field: question.id.clone(),
        expected: question.kind.label(),
        found: answer.kind_label(),
    };

    match (&question.kind, answer) {
        (QuestionKind::Boolean, AnswerValue::Bool(_))
        | (QuestionKind::Number, AnswerValue::Number(_))
        | (QuestionKind::Text, AnswerValue::Text(_)) => Ok(()),
        (QuestionKind::Date, AnswerValue::Text(raw)) => parse_cas_date(raw).map(|_| ()),
        (QuestionKind::Choice { options }, AnswerValue::Text(choice)) => {
            if options.iter().any(|option| option == choice) {
                Ok(())
            } else {
                Err(ValidationError::InvalidChoice {
                    field: question.id.clone(),
                    value: choice.clone(),
                })
            }
        }
        _ => Err(kind_mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::{AdditionalFee, ConditionalLogic};
    use crate::catalog::standard::StandardCatalog;
    use crate::catalog::VisaCatalog;

    fn step(id: &str, number: u32, condition: Option<ConditionalLogic>) -> CatalogStep {
        CatalogStep {
            id: id.to_string(),
            step_number: number,
            title: id.to_string(),
            description: String::new(),
            condition,
        }
    }

    fn document(id: &str, condition: Option<ConditionalLogic>) -> CatalogDocument {
        CatalogDocument {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            is_required: true,
            condition,
        }
    }

    fn with_cas() -> PersonalizationData {
        PersonalizationData {
            has_cas: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn documents_keep_catalog_order_and_flag_conditional_items() {
        let documents = vec![
            document("passport", None),
            document("cas-statement", Some(ConditionalLogic::new("hasCAS", true))),
            document("no-cas-letter", Some(ConditionalLogic::new("hasCAS", false))),
            document("photo", None),
        ];

        let filtered = personalize_documents(&documents, &with_cas());
        let ids: Vec<&str> = filtered.iter().map(|doc| doc.item.id.as_str()).collect();
        assert_eq!(ids, ["passport", "cas-statement", "photo"]);
        assert!(!filtered[0].is_personalized);
        assert!(filtered[1].is_personalized);
    }

    #[test]
    fn steps_are_sorted_by_step_number_after_filtering() {
        let steps = vec![
            step("biometrics", 5, None),
            step("cas", 2, Some(ConditionalLogic::new("hasCAS", true))),
            step("atas", 3, Some(ConditionalLogic::new("requiresATAS", true))),
            step("offer", 1, None),
        ];

        let filtered = personalize_steps(&steps, &with_cas());
        let ids: Vec<&str> = filtered.iter().map(|step| step.item.id.as_str()).collect();
        assert_eq!(ids, ["offer", "cas", "biometrics"]);
    }

    #[test]
    fn repeated_personalization_is_deterministic_and_leaves_catalog_untouched() {
        let catalog = StandardCatalog::seeded();
        let key = VisaTypeKey::new("india", "uk", "student");
        let visa_type = catalog
            .visa_type(&key)
            .expect("catalog available")
            .expect("seeded visa type");
        let before = visa_type.clone();

        let first = personalize_visa_type(&visa_type, &with_cas());
        let second = personalize_visa_type(&visa_type, &with_cas());

        assert_eq!(first.documents, second.documents);
        assert_eq!(first.steps, second.steps);
        assert_eq!(first.fees, second.fees);
        assert_eq!(visa_type, before);
    }

    #[test]
    fn fee_total_adds_only_matching_surcharges() {
        let schedule = FeeSchedule {
            currency: "GBP".to_string(),
            base: 524,
            additional: vec![
                AdditionalFee {
                    name: "Immigration health surcharge".to_string(),
                    amount: 776,
                    condition: Some(ConditionalLogic::new("hasCAS", true)),
                },
                AdditionalFee {
                    name: "Priority service".to_string(),
                    amount: 500,
                    condition: Some(ConditionalLogic::new("priorityService", true)),
                },
            ],
        };

        let fees = compute_fees(&schedule, &with_cas());
        assert_eq!(fees.total, 1300);
        assert_eq!(fees.applied.len(), 1);

        let fees = compute_fees(&schedule, &PersonalizationData::default());
        assert_eq!(fees.total, 524);
        assert!(fees.applied.is_empty());
    }

    #[test]
    fn fee_schedule_accepts_shorthand_conditions() {
        let schedule: FeeSchedule = serde_json::from_value(serde_json::json!({
            "currency": "GBP",
            "base": 524,
            "additional": [
                { "name": "IHS", "amount": 776, "condition": { "hasCAS": true } },
                { "name": "Priority", "amount": 500, "condition": { "field": "priorityService", "value": true } }
            ]
        }))
        .expect("schedule parses");

        assert_eq!(compute_fees(&schedule, &with_cas()).total, 1300);
    }

    fn visa_type_asking(custom_questions: Vec<CustomQuestion>) -> VisaType {
        VisaType {
            key: VisaTypeKey::new("india", "uk", "student"),
            name: "Student visa".to_string(),
            description: String::new(),
            documents: Vec::new(),
            steps: Vec::new(),
            fees: FeeSchedule {
                currency: "GBP".to_string(),
                base: 524,
                additional: Vec::new(),
            },
            custom_questions,
        }
    }

    #[test]
    fn validation_checks_declared_question_kinds() {
        let visa_type = visa_type_asking(vec![
            CustomQuestion {
                id: "requiresATAS".to_string(),
                prompt: "Does your course require ATAS clearance?".to_string(),
                kind: QuestionKind::Boolean,
            },
            CustomQuestion {
                id: "studyLocation".to_string(),
                prompt: "Where will you study?".to_string(),
                kind: QuestionKind::Choice {
                    options: vec!["london".to_string(), "outside_london".to_string()],
                },
            },
        ]);

        let mut answers = PersonalizationData::default();
        answers.extra.insert("requiresATAS".to_string(), "yes".into());
        assert_eq!(
            validate_answers(&visa_type, &answers),
            Err(ValidationError::AnswerKind {
                field: "requiresATAS".to_string(),
                expected: "boolean",
                found: "text",
            })
        );

        let mut answers = PersonalizationData {
            study_location: Some("manchester".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_answers(&visa_type, &answers),
            Err(ValidationError::InvalidChoice { .. })
        ));

        answers.study_location = Some("london".to_string());
        answers.extra.insert("requiresATAS".to_string(), true.into());
        answers.extra.insert("undeclared".to_string(), 3.0.into());
        assert!(validate_answers(&visa_type, &answers).is_ok());
    }
}
