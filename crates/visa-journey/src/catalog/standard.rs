use std::collections::BTreeMap;

use super::answers::AnswerValue;
use super::domain::{
    normalize_slug, AdditionalFee, CatalogDocument, CatalogStep, ConditionalLogic,
    CustomQuestion, FeeSchedule, QuestionKind, VisaType, VisaTypeKey,
};
use super::repository::{CatalogError, VisaCatalog};

/// Read-only catalog shipped with the service.
#[derive(Debug, Clone)]
pub struct StandardCatalog {
    visa_types: BTreeMap<VisaTypeKey, VisaType>,
}

impl StandardCatalog {
    pub fn seeded() -> Self {
        Self::from_visa_types([
            student_visa("india"),
            student_visa("nigeria"),
            graduate_visa("india"),
        ])
    }

    pub fn from_visa_types(visa_types: impl IntoIterator<Item = VisaType>) -> Self {
        Self {
            visa_types: visa_types
                .into_iter()
                .map(|visa_type| (visa_type.key.clone(), visa_type))
                .collect(),
        }
    }
}

impl VisaCatalog for StandardCatalog {
    fn visa_type(&self, key: &VisaTypeKey) -> Result<Option<VisaType>, CatalogError> {
        Ok(self.visa_types.get(key).cloned())
    }

    fn visa_types_for_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<VisaType>, CatalogError> {
        let origin = normalize_slug(origin);
        let destination = normalize_slug(destination);
        Ok(self
            .visa_types
            .values()
            .filter(|visa_type| {
                visa_type.key.origin == origin && visa_type.key.destination == destination
            })
            .cloned()
            .collect())
    }
}

fn document(id: &str, name: &str, description: &str) -> CatalogDocument {
    CatalogDocument {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        is_required: true,
        condition: None,
    }
}

fn step(step_number: u32, id: &str, title: &str, description: &str) -> CatalogStep {
    CatalogStep {
        id: id.to_string(),
        step_number,
        title: title.to_string(),
        description: description.to_string(),
        condition: None,
    }
}

fn question(id: &str, prompt: &str, kind: QuestionKind) -> CustomQuestion {
    CustomQuestion {
        id: id.to_string(),
        prompt: prompt.to_string(),
        kind,
    }
}

fn when(field: &str, value: impl Into<AnswerValue>) -> Option<ConditionalLogic> {
    Some(ConditionalLogic::new(field, value))
}

fn priority_service_fee() -> AdditionalFee {
    AdditionalFee {
        name: "Priority service".to_string(),
        amount: 500,
        condition: when("priorityService", true),
    }
}

fn student_visa(origin: &str) -> VisaType {
    VisaType {
        key: VisaTypeKey::new(origin, "uk", "student"),
        name: "Student visa".to_string(),
        description: "Study a full-time course at a licensed UK sponsor.".to_string(),
        documents: vec![
            document(
                "passport",
                "Valid passport",
                "Current passport with at least one blank page for the vignette.",
            ),
            CatalogDocument {
                condition: when("hasCAS", true),
                ..document(
                    "cas-statement",
                    "CAS statement",
                    "Confirmation of Acceptance for Studies reference issued by your university.",
                )
            },
            CatalogDocument {
                condition: when("studyLocation", "london"),
                ..document(
                    "funds-london",
                    "Proof of funds (London)",
                    "Bank statements showing £1,483 per month for up to 9 months, held for 28 consecutive days.",
                )
            },
            CatalogDocument {
                condition: when("studyLocation", "outside_london"),
                ..document(
                    "funds-outside-london",
                    "Proof of funds (outside London)",
                    "Bank statements showing £1,136 per month for up to 9 months, held for 28 consecutive days.",
                )
            },
            document(
                "tb-certificate",
                "TB test certificate",
                "Certificate from an approved clinic, dated within the last 6 months.",
            ),
            CatalogDocument {
                condition: when("requiresATAS", true),
                ..document(
                    "atas-certificate",
                    "ATAS certificate",
                    "Academic Technology Approval Scheme clearance for sensitive subjects.",
                )
            },
            document(
                "academic-transcripts",
                "Academic transcripts",
                "Qualifications listed on your CAS.",
            ),
            CatalogDocument {
                is_required: false,
                condition: when("hasDependants", true),
                ..document(
                    "dependant-relationship",
                    "Proof of relationship",
                    "Marriage or birth certificates for each dependant.",
                )
            },
        ],
        steps: vec![
            step(
                1,
                "unconditional-offer",
                "Accept an unconditional offer",
                "Meet every offer condition and accept the unconditional offer.",
            ),
            step(
                2,
                "cas",
                "Receive your CAS",
                "Your university issues the CAS once deposits and checks are complete.",
            ),
            CatalogStep {
                condition: when("requiresATAS", true),
                ..step(
                    3,
                    "atas",
                    "Apply for ATAS clearance",
                    "Allow at least 30 working days before applying for the visa.",
                )
            },
            step(
                4,
                "financial-evidence",
                "Hold maintenance funds",
                "Keep the required funds in your account for 28 consecutive days.",
            ),
            step(
                5,
                "tb-test",
                "Book a TB test",
                "Visit an approved clinic and collect the certificate.",
            ),
            step(
                6,
                "online-application",
                "Complete the online application",
                "Submit the application no earlier than 6 months before your course starts.",
            ),
            step(
                7,
                "pay-fees",
                "Pay the application fee and surcharge",
                "Pay the visa fee and the immigration health surcharge.",
            ),
            step(
                8,
                "biometrics",
                "Attend the biometrics appointment",
                "Provide fingerprints and a photo at the visa application centre.",
            ),
            step(
                9,
                "decision",
                "Receive a decision",
                "Standard decisions arrive within 3 weeks.",
            ),
        ],
        fees: FeeSchedule {
            currency: "GBP".to_string(),
            base: 524,
            additional: vec![
                AdditionalFee {
                    name: "Immigration health surcharge".to_string(),
                    amount: 776,
                    condition: when("hasCAS", true),
                },
                priority_service_fee(),
            ],
        },
        custom_questions: vec![
            question(
                "hasCAS",
                "Have you received your CAS?",
                QuestionKind::Boolean,
            ),
            question("casDate", "When was your CAS issued?", QuestionKind::Date),
            question(
                "studyLocation",
                "Where will you study?",
                QuestionKind::Choice {
                    options: vec!["london".to_string(), "outside_london".to_string()],
                },
            ),
            question(
                "requiresATAS",
                "Does your course require ATAS clearance?",
                QuestionKind::Boolean,
            ),
            question(
                "priorityService",
                "Will you pay for priority processing?",
                QuestionKind::Boolean,
            ),
            question(
                "hasDependants",
                "Are dependants applying with you?",
                QuestionKind::Boolean,
            ),
        ],
    }
}

fn graduate_visa(origin: &str) -> VisaType {
    VisaType {
        key: VisaTypeKey::new(origin, "uk", "graduate"),
        name: "Graduate visa".to_string(),
        description: "Stay in the UK for at least 2 years after completing a degree.".to_string(),
        documents: vec![
            document(
                "passport",
                "Valid passport",
                "The passport used for your Student visa application.",
            ),
            document(
                "brp",
                "Biometric residence permit",
                "Your current BRP or eVisa share code.",
            ),
            CatalogDocument {
                is_required: false,
                condition: when("hasDependants", true),
                ..document(
                    "dependant-relationship",
                    "Proof of relationship",
                    "Evidence for dependants already in the UK on your Student visa.",
                )
            },
        ],
        steps: vec![
            step(
                1,
                "course-completion",
                "Complete your course",
                "Your university reports successful completion to the Home Office.",
            ),
            step(
                2,
                "online-application",
                "Complete the online application",
                "Apply from inside the UK before your Student visa expires.",
            ),
            step(
                3,
                "pay-fees",
                "Pay the application fee and surcharge",
                "Pay the visa fee and the immigration health surcharge.",
            ),
            step(4, "decision", "Receive a decision", "Decisions usually take 8 weeks."),
        ],
        fees: FeeSchedule {
            currency: "GBP".to_string(),
            base: 880,
            additional: vec![
                AdditionalFee {
                    name: "Immigration health surcharge".to_string(),
                    amount: 2070,
                    condition: None,
                },
                priority_service_fee(),
            ],
        },
        custom_questions: vec![
            question(
                "priorityService",
                "Will you pay for priority processing?",
                QuestionKind::Boolean,
            ),
            question(
                "hasDependants",
                "Are dependants applying with you?",
                QuestionKind::Boolean,
            ),
        ],
    }
}
