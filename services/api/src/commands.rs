use crate::infra::parse_answer;
use chrono::Duration;
use clap::Args;
use visa_journey::auth::{Caller, TokenVerifier};
use visa_journey::catalog::{
    personalize_visa_type, validate_answers, AnswerValue, CatalogError, PersonalizationData,
    PersonalizedRequirements, StandardCatalog, VisaCatalog, VisaTypeKey,
};
use visa_journey::config::AppConfig;
use visa_journey::error::AppError;
use visa_journey::journey::JourneyServiceError;

#[derive(Args, Debug)]
pub(crate) struct RequirementsArgs {
    /// Origin country slug (e.g. india)
    #[arg(long)]
    pub(crate) origin: String,
    /// Destination country slug (e.g. uk)
    #[arg(long)]
    pub(crate) destination: String,
    /// Visa type code within the route (e.g. student)
    #[arg(long)]
    pub(crate) visa_type: String,
    /// Personalization answer as QUESTION=VALUE; repeat for several answers
    #[arg(long = "answer", value_parser = parse_answer)]
    pub(crate) answers: Vec<(String, AnswerValue)>,
}

#[derive(Args, Debug)]
pub(crate) struct TokenArgs {
    /// Subject (user id) embedded in the token
    #[arg(long)]
    pub(crate) user_id: String,
    /// Email embedded in the token; used to match share grants
    #[arg(long)]
    pub(crate) email: String,
    /// Token lifetime in minutes
    #[arg(long, default_value_t = 60)]
    pub(crate) ttl_minutes: i64,
}

pub(crate) fn run_requirements(args: RequirementsArgs) -> Result<(), AppError> {
    let RequirementsArgs {
        origin,
        destination,
        visa_type,
        answers,
    } = args;

    let mut data = PersonalizationData::default();
    for (field, value) in answers {
        data.set(&field, value).map_err(JourneyServiceError::from)?;
    }

    let requirements = personalized_requirements(
        &StandardCatalog::seeded(),
        &VisaTypeKey::new(&origin, &destination, &visa_type),
        &data,
    )?;
    render_requirements(&requirements);
    Ok(())
}

pub(crate) fn personalized_requirements<C: VisaCatalog>(
    catalog: &C,
    key: &VisaTypeKey,
    answers: &PersonalizationData,
) -> Result<PersonalizedRequirements, JourneyServiceError> {
    let visa_type = catalog
        .visa_type(key)?
        .ok_or_else(|| CatalogError::NotFound(key.clone()))?;
    validate_answers(&visa_type, answers)?;
    Ok(personalize_visa_type(&visa_type, answers))
}

fn render_requirements(requirements: &PersonalizedRequirements) {
    println!("{} ({})", requirements.name, requirements.visa_type);

    println!("\nDocuments");
    for document in &requirements.documents {
        let marker = if document.is_personalized { "*" } else { "-" };
        let optional = if document.item.is_required {
            ""
        } else {
            " (optional)"
        };
        println!("  {marker} {}{optional}", document.item.name);
    }

    println!("\nSteps");
    for step in &requirements.steps {
        let marker = if step.is_personalized { "*" } else { " " };
        println!(
            "  {:>2}.{marker} {}",
            step.item.step_number, step.item.title
        );
    }

    let fees = &requirements.fees;
    println!("\nFees ({})", fees.currency);
    println!("  Base application fee: {}", fees.base);
    for fee in &fees.applied {
        println!("  {}: {}", fee.name, fee.amount);
    }
    println!("  Total: {}", fees.total);
    println!("\n* included because of your answers");
}

pub(crate) fn run_token(args: TokenArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let verifier = TokenVerifier::new(&config.auth.jwt_secret);
    let caller = Caller::new(args.user_id, args.email);
    let token = verifier.issue(&caller, Duration::minutes(args.ttl_minutes))?;
    println!("{token}");
    Ok(())
}
