//! Visa reference data and the rules that tailor it to one applicant.

pub mod answers;
pub mod condition;
pub mod domain;
pub mod personalize;
pub mod repository;
pub mod router;
mod standard;

pub use answers::{parse_cas_date, AnswerValue, PersonalizationData};
pub use condition::evaluate;
pub use domain::{
    AdditionalFee, CatalogDocument, CatalogStep, Conditional, ConditionalLogic, CustomQuestion,
    FeeSchedule, QuestionKind, VisaType, VisaTypeKey, VisaTypeSummary,
};
pub use personalize::{
    compute_fees, personalize, personalize_documents, personalize_steps, personalize_visa_type,
    validate_answers, AppliedFee, FeeBreakdown, Personalized, PersonalizedRequirements,
};
pub use repository::{CatalogError, VisaCatalog};
pub use router::catalog_router;
pub use standard::StandardCatalog;
