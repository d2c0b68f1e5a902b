use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use axum::{Extension, Router};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::auth::{Caller, TokenVerifier};
use crate::catalog::{PersonalizationData, StandardCatalog};
use crate::config::JourneyConfig;
use crate::journey::{
    journey_router, Clock, InMemoryJourneyRepository, Journey, JourneyId, JourneyRepository,
    JourneyService, JourneyStatus, RepositoryError, StartJourney,
};

pub(super) const SECRET: &str = "journey-test-secret-with-32-characters!";

pub(super) fn started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(started_at()),
        })
    }

    pub(super) fn advance(&self, by: Duration) {
        *self.now.lock().expect("clock mutex poisoned") += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

pub(super) fn owner() -> Caller {
    Caller::new("user-owner", "owner@example.com")
}

pub(super) fn viewer() -> Caller {
    Caller::new("user-viewer", "parent@example.com")
}

pub(super) fn commenter() -> Caller {
    Caller::new("user-commenter", "adviser@example.com")
}

pub(super) fn editor() -> Caller {
    Caller::new("user-editor", "agent@example.com")
}

pub(super) fn stranger() -> Caller {
    Caller::new("user-stranger", "stranger@example.com")
}

pub(super) fn start_request(origin: &str) -> StartJourney {
    StartJourney {
        origin_country: origin.to_string(),
        destination_country: "uk".to_string(),
        user_type: "student".to_string(),
        visa_type: "student".to_string(),
        personalization_data: PersonalizationData::default(),
    }
}

pub(super) fn answers(value: Value) -> PersonalizationData {
    PersonalizationData::from_json(value).expect("answers parse")
}

pub(super) type TestService<R = InMemoryJourneyRepository> = JourneyService<R, StandardCatalog>;

pub(super) fn service_with<R>(repository: Arc<R>, clock: Arc<FixedClock>) -> TestService<R>
where
    R: JourneyRepository + 'static,
{
    JourneyService::new(
        repository,
        Arc::new(StandardCatalog::seeded()),
        JourneyConfig::default(),
    )
    .with_clock(clock)
}

pub(super) fn build_service() -> (TestService, Arc<InMemoryJourneyRepository>, Arc<FixedClock>) {
    let repository = Arc::new(InMemoryJourneyRepository::default());
    let clock = FixedClock::new();
    let service = service_with(repository.clone(), clock.clone());
    (service, repository, clock)
}

pub(super) fn verifier() -> TokenVerifier {
    TokenVerifier::new(SECRET)
}

pub(super) fn bearer(caller: &Caller) -> String {
    let token = verifier()
        .issue(caller, Duration::minutes(10))
        .expect("token issues");
    format!("Bearer {token}")
}

pub(super) fn router_with<R>(service: TestService<R>) -> Router
where
    R: JourneyRepository + 'static,
{
    journey_router(Arc::new(service)).layer(Extension(verifier()))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableRepository;

impl JourneyRepository for UnavailableRepository {
    fn find_active_by_owner_and_route(
        &self,
        _user_id: &str,
        _origin: &str,
        _destination: &str,
    ) -> Result<Option<Journey>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_id(&self, _id: &JourneyId) -> Result<Option<Journey>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _journey: Journey) -> Result<Journey, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &JourneyId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_all_by_owner(
        &self,
        _user_id: &str,
        _status: Option<JourneyStatus>,
    ) -> Result<Vec<Journey>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Rejects the first `stale_saves` writes of existing journeys as stale,
/// as if another request had saved in between.
#[derive(Default)]
pub(super) struct ContendedRepository {
    pub(super) inner: InMemoryJourneyRepository,
    pub(super) stale_saves: AtomicUsize,
    pub(super) save_calls: AtomicUsize,
}

impl ContendedRepository {
    pub(super) fn with_stale_saves(count: usize) -> Self {
        Self {
            stale_saves: AtomicUsize::new(count),
            ..Self::default()
        }
    }
}

impl JourneyRepository for ContendedRepository {
    fn find_active_by_owner_and_route(
        &self,
        user_id: &str,
        origin: &str,
        destination: &str,
    ) -> Result<Option<Journey>, RepositoryError> {
        self.inner
            .find_active_by_owner_and_route(user_id, origin, destination)
    }

    fn find_by_id(&self, id: &JourneyId) -> Result<Option<Journey>, RepositoryError> {
        self.inner.find_by_id(id)
    }

    fn save(&self, journey: Journey) -> Result<Journey, RepositoryError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let contended = journey.version > 0
            && self
                .stale_saves
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
        if contended {
            return Err(RepositoryError::StaleVersion {
                expected: journey.version,
                found: journey.version + 1,
            });
        }
        self.inner.save(journey)
    }

    fn delete(&self, id: &JourneyId) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }

    fn find_all_by_owner(
        &self,
        user_id: &str,
        status: Option<JourneyStatus>,
    ) -> Result<Vec<Journey>, RepositoryError> {
        self.inner.find_all_by_owner(user_id, status)
    }
}
