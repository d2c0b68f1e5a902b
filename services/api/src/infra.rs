use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use visa_journey::catalog::{AnswerValue, StandardCatalog};
use visa_journey::config::JourneyConfig;
use visa_journey::journey::{InMemoryJourneyRepository, JourneyService};

pub(crate) type AppJourneyService = JourneyService<InMemoryJourneyRepository, StandardCatalog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_journey_service(config: JourneyConfig) -> Arc<AppJourneyService> {
    let repository = Arc::new(InMemoryJourneyRepository::default());
    let catalog = Arc::new(StandardCatalog::seeded());
    Arc::new(JourneyService::new(repository, catalog, config))
}

/// Parse a `question=value` CLI answer. `true`/`false` and numbers are typed;
/// everything else (including `DD/MM/YYYY` dates) stays text.
pub(crate) fn parse_answer(raw: &str) -> Result<(String, AnswerValue), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=VALUE, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing question id in '{raw}'"));
    }

    let value = value.trim();
    let answer = match value {
        "true" => AnswerValue::Bool(true),
        "false" => AnswerValue::Bool(false),
        other => match other.parse::<f64>() {
            Ok(number) if number.is_finite() => AnswerValue::Number(number),
            _ => AnswerValue::Text(other.to_string()),
        },
    };
    Ok((field.to_string(), answer))
}
