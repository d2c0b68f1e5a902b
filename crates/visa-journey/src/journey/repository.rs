use super::domain::{Journey, JourneyId, JourneyStatus};

/// Persistence collaborator for journeys.
///
/// `save` is a compare-and-swap on [`Journey::version`]: it only succeeds when
/// the stored version matches the incoming one (0 for new records), and it
/// returns the record with the version bumped. Implementations must also
/// reject a save that would leave two active journeys for one owner and route.
pub trait JourneyRepository: Send + Sync {
    fn find_active_by_owner_and_route(
        &self,
        user_id: &str,
        origin: &str,
        destination: &str,
    ) -> Result<Option<Journey>, RepositoryError>;
    fn find_by_id(&self, id: &JourneyId) -> Result<Option<Journey>, RepositoryError>;
    fn save(&self, journey: Journey) -> Result<Journey, RepositoryError>;
    fn delete(&self, id: &JourneyId) -> Result<(), RepositoryError>;
    fn find_all_by_owner(
        &self,
        user_id: &str,
        status: Option<JourneyStatus>,
    ) -> Result<Vec<Journey>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("an active journey already exists for this route")]
    Conflict,
    #[error("journey was modified concurrently (expected version {expected}, found {found})")]
    StaleVersion { expected: u64, found: u64 },
    #[error("journey not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
