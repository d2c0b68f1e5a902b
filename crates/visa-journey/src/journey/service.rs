use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::access::{allows, AccessLevel};
use super::coupling::{default_rules, CouplingRule};
use super::domain::{Journey, JourneyId, JourneyPhase, JourneyStatus, Route, SharePermission};
use super::lifecycle::JourneySeed;
use super::repository::{JourneyRepository, RepositoryError};
use crate::auth::Caller;
use crate::catalog::{
    personalize_visa_type, validate_answers, CatalogError, PersonalizationData,
    PersonalizedRequirements, VisaCatalog, VisaTypeKey,
};
use crate::config::JourneyConfig;
use crate::error::ValidationError;

/// Source of "now" for timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Payload for starting (or resuming) the journey on a route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJourney {
    pub origin_country: String,
    pub destination_country: String,
    #[serde(default)]
    pub user_type: String,
    pub visa_type: String,
    #[serde(default)]
    pub personalization_data: PersonalizationData,
}

impl StartJourney {
    fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("originCountry", &self.origin_country),
            ("destinationCountry", &self.destination_country),
            ("visaType", &self.visa_type),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// Outcome of [`JourneyService::create_or_resume`].
#[derive(Debug, Clone)]
pub struct StartedJourney {
    pub journey: Journey,
    /// An active journey on the route already existed.
    pub resumed: bool,
}

/// Mediates every journey mutation: access checks, domain rules, and
/// optimistic saves with a bounded retry on version conflicts.
pub struct JourneyService<R, C> {
    repository: Arc<R>,
    catalog: Arc<C>,
    rules: Vec<CouplingRule>,
    clock: Arc<dyn Clock>,
    write_attempts: u8,
}

impl<R, C> JourneyService<R, C>
where
    R: JourneyRepository + 'static,
    C: VisaCatalog + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<C>, config: JourneyConfig) -> Self {
        Self {
            repository,
            catalog,
            rules: default_rules(),
            clock: Arc::new(SystemClock),
            write_attempts: config.write_attempts.max(1),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rules(mut self, rules: Vec<CouplingRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    /// Resume the caller's active journey on the route, or start one.
    ///
    /// Resuming overwrites `userType`/`visaType` and merges the answers.
    /// Either way the write goes through coupling rules and progress.
    pub fn create_or_resume(
        &self,
        caller: &Caller,
        request: StartJourney,
    ) -> Result<StartedJourney, JourneyServiceError> {
        request.validate()?;
        let route = Route::new(&request.origin_country, &request.destination_country);
        let key = VisaTypeKey::new(&route.origin, &route.destination, &request.visa_type);
        self.check_answers(&key, &request.personalization_data)?;

        for attempt in 1..=self.write_attempts {
            let now = self.clock.now();
            let existing = self.repository.find_active_by_owner_and_route(
                &caller.user_id,
                &route.origin,
                &route.destination,
            )?;

            let resumed = existing.is_some();
            let mut journey = match existing {
                Some(mut journey) => {
                    if !request.user_type.trim().is_empty() {
                        journey.user_type = request.user_type.trim().to_string();
                    }
                    journey.visa_type = key.code.clone();
                    journey
                }
                None => Journey::start(
                    JourneyId::generate(),
                    JourneySeed {
                        user_id: caller.user_id.clone(),
                        email: caller.email.clone(),
                        route: route.clone(),
                        user_type: request.user_type.trim().to_string(),
                        visa_type: key.code.clone(),
                    },
                    now,
                ),
            };
            journey.merge_personalization(request.personalization_data.clone(), &self.rules, now);

            match self.repository.save(journey) {
                Ok(saved) => {
                    info!(
                        journey_id = %saved.id,
                        user_id = %saved.user_id,
                        origin = %saved.origin_country,
                        destination = %saved.destination_country,
                        resumed,
                        "journey saved"
                    );
                    return Ok(StartedJourney {
                        journey: saved,
                        resumed,
                    });
                }
                Err(RepositoryError::StaleVersion { .. }) | Err(RepositoryError::Conflict) => {
                    warn!(
                        user_id = %caller.user_id,
                        origin = %route.origin,
                        destination = %route.destination,
                        attempt,
                        "journey changed while starting; retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(JourneyServiceError::Conflict(format!(
            "journey for {} -> {} is being modified concurrently",
            route.origin, route.destination
        )))
    }

    pub fn get(&self, caller: &Caller, id: &JourneyId) -> Result<Journey, JourneyServiceError> {
        let journey = self.load(id)?;
        authorize(&journey, caller, AccessLevel::View)?;
        Ok(journey)
    }

    /// Journeys owned by the caller, most recent activity first.
    pub fn list(
        &self,
        caller: &Caller,
        status: Option<JourneyStatus>,
    ) -> Result<Vec<Journey>, JourneyServiceError> {
        let mut journeys = self
            .repository
            .find_all_by_owner(&caller.user_id, status)?;
        journeys.sort_by(|a, b| {
            b.timestamps
                .last_activity
                .cmp(&a.timestamps.last_activity)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(journeys)
    }

    pub fn mark_step_completed(
        &self,
        caller: &Caller,
        id: &JourneyId,
        step_id: &str,
    ) -> Result<Journey, JourneyServiceError> {
        self.set_step_completion(caller, id, step_id, true)
    }

    pub fn set_step_completion(
        &self,
        caller: &Caller,
        id: &JourneyId,
        step_id: &str,
        completed: bool,
    ) -> Result<Journey, JourneyServiceError> {
        self.mutate(caller, id, AccessLevel::Edit, "step", |journey, now| {
            journey.set_step_completion(step_id, completed, now)?;
            Ok(())
        })
    }

    pub fn update_checklist(
        &self,
        caller: &Caller,
        id: &JourneyId,
        updates: BTreeMap<String, bool>,
    ) -> Result<Journey, JourneyServiceError> {
        self.mutate(caller, id, AccessLevel::Edit, "checklist", |journey, now| {
            journey.update_checklist(updates.clone(), now)?;
            Ok(())
        })
    }

    pub fn update_personalization(
        &self,
        caller: &Caller,
        id: &JourneyId,
        partial: PersonalizationData,
    ) -> Result<Journey, JourneyServiceError> {
        self.mutate(
            caller,
            id,
            AccessLevel::Edit,
            "personalization",
            |journey, now| {
                self.check_answers(&journey.visa_type_key(), &partial)?;
                journey.merge_personalization(partial.clone(), &self.rules, now);
                Ok(())
            },
        )
    }

    pub fn update_status(
        &self,
        caller: &Caller,
        id: &JourneyId,
        status: JourneyStatus,
        phase: Option<JourneyPhase>,
    ) -> Result<Journey, JourneyServiceError> {
        self.mutate(caller, id, AccessLevel::Edit, "status", |journey, now| {
            journey.set_status(status, phase, now);
            Ok(())
        })
    }

    pub fn add_note(
        &self,
        caller: &Caller,
        id: &JourneyId,
        content: &str,
    ) -> Result<Journey, JourneyServiceError> {
        let author = if caller.email.is_empty() {
            caller.user_id.as_str()
        } else {
            caller.email.as_str()
        };
        self.mutate(caller, id, AccessLevel::Comment, "note", |journey, now| {
            journey.add_note(content, author, now)?;
            Ok(())
        })
    }

    pub fn share(
        &self,
        caller: &Caller,
        id: &JourneyId,
        email: &str,
        permission: SharePermission,
    ) -> Result<Journey, JourneyServiceError> {
        let journey = self.mutate(caller, id, AccessLevel::Owner, "share", |journey, now| {
            journey.share(email, permission, now)?;
            Ok(())
        })?;
        info!(journey_id = %journey.id, permission = ?permission, "journey shared");
        Ok(journey)
    }

    pub fn delete(&self, caller: &Caller, id: &JourneyId) -> Result<(), JourneyServiceError> {
        let journey = self.load(id)?;
        authorize(&journey, caller, AccessLevel::Owner)?;
        self.repository.delete(id)?;
        info!(journey_id = %id, user_id = %caller.user_id, "journey deleted");
        Ok(())
    }

    /// Documents, steps and fees for the journey's visa type, filtered by its answers.
    pub fn requirements(
        &self,
        caller: &Caller,
        id: &JourneyId,
    ) -> Result<PersonalizedRequirements, JourneyServiceError> {
        let journey = self.get(caller, id)?;
        let key = journey.visa_type_key();
        let visa_type = self
            .catalog
            .visa_type(&key)?
            .ok_or(CatalogError::NotFound(key))?;
        Ok(personalize_visa_type(
            &visa_type,
            &journey.personalization_data,
        ))
    }

    fn load(&self, id: &JourneyId) -> Result<Journey, JourneyServiceError> {
        self.repository
            .find_by_id(id)?
            .ok_or_else(|| JourneyServiceError::NotFound(format!("journey {id}")))
    }

    /// Declared questions are kind-checked; a visa type the catalog does not
    /// know leaves the answers unchecked.
    fn check_answers(
        &self,
        key: &VisaTypeKey,
        answers: &PersonalizationData,
    ) -> Result<(), JourneyServiceError> {
        match self.catalog.visa_type(key)? {
            Some(visa_type) => validate_answers(&visa_type, answers)?,
            None => debug!(visa_type = %key, "visa type not in catalog; answers not checked"),
        }
        Ok(())
    }

    fn mutate<F>(
        &self,
        caller: &Caller,
        id: &JourneyId,
        needed: AccessLevel,
        operation: &'static str,
        mut apply: F,
    ) -> Result<Journey, JourneyServiceError>
    where
        F: FnMut(&mut Journey, DateTime<Utc>) -> Result<(), JourneyServiceError>,
    {
        for attempt in 1..=self.write_attempts {
            let mut journey = self.load(id)?;
            authorize(&journey, caller, needed)?;
            apply(&mut journey, self.clock.now())?;

            match self.repository.save(journey) {
                Ok(saved) => {
                    debug!(
                        journey_id = %saved.id,
                        operation,
                        version = saved.version,
                        completion_percentage = saved.progress_metrics.completion_percentage,
                        "journey updated"
                    );
                    return Ok(saved);
                }
                Err(RepositoryError::StaleVersion { expected, found }) => {
                    warn!(
                        journey_id = %id,
                        operation,
                        expected,
                        found,
                        attempt,
                        "stale journey version; retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(JourneyServiceError::Conflict(format!(
            "journey {id} is being modified concurrently"
        )))
    }
}

fn authorize(
    journey: &Journey,
    caller: &Caller,
    needed: AccessLevel,
) -> Result<(), JourneyServiceError> {
    if allows(journey, caller, needed) {
        Ok(())
    } else {
        Err(JourneyServiceError::Forbidden {
            journey_id: journey.id.clone(),
            needed,
        })
    }
}

/// Error raised by the journey service.
#[derive(Debug, thiserror::Error)]
pub enum JourneyServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{level} access required for journey {journey_id}", level = .needed.label())]
    Forbidden {
        journey_id: JourneyId,
        needed: AccessLevel,
    },
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Catalog(CatalogError),
}

impl From<RepositoryError> for JourneyServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound("journey".to_string()),
            RepositoryError::Conflict => Self::Conflict(value.to_string()),
            other => Self::Repository(other),
        }
    }
}

impl From<CatalogError> for JourneyServiceError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound(key) => Self::NotFound(format!("visa type {key}")),
            other => Self::Catalog(other),
        }
    }
}

impl IntoResponse for JourneyServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            JourneyServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            JourneyServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            JourneyServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            JourneyServiceError::Conflict(_) => StatusCode::CONFLICT,
            JourneyServiceError::Repository(_) | JourneyServiceError::Catalog(_) => {
                error!(error = %self, "journey request failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
