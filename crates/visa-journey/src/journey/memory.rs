use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Journey, JourneyId, JourneyStatus};
use super::repository::{JourneyRepository, RepositoryError};

/// Process-local journey store. Clones share the same records.
#[derive(Debug, Default, Clone)]
pub struct InMemoryJourneyRepository {
    records: Arc<Mutex<HashMap<JourneyId, Journey>>>,
}

impl InMemoryJourneyRepository {
    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<JourneyId, Journey>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("journey store lock poisoned".to_string()))
    }
}

impl JourneyRepository for InMemoryJourneyRepository {
    fn find_active_by_owner_and_route(
        &self,
        user_id: &str,
        origin: &str,
        destination: &str,
    ) -> Result<Option<Journey>, RepositoryError> {
        let records = self.lock()?;
        Ok(records
            .values()
            .find(|journey| {
                journey.is_active()
                    && journey.user_id == user_id
                    && journey.origin_country == origin
                    && journey.destination_country == destination
            })
            .cloned())
    }

    fn find_by_id(&self, id: &JourneyId) -> Result<Option<Journey>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn save(&self, mut journey: Journey) -> Result<Journey, RepositoryError> {
        let mut records = self.lock()?;

        let stored_version = records.get(&journey.id).map_or(0, |stored| stored.version);
        if stored_version != journey.version {
            return Err(RepositoryError::StaleVersion {
                expected: journey.version,
                found: stored_version,
            });
        }

        if journey.is_active() {
            let duplicate = records.values().any(|other| {
                other.id != journey.id
                    && other.is_active()
                    && other.user_id == journey.user_id
                    && other.origin_country == journey.origin_country
                    && other.destination_country == journey.destination_country
            });
            if duplicate {
                return Err(RepositoryError::Conflict);
            }
        }

        journey.version += 1;
        records.insert(journey.id.clone(), journey.clone());
        Ok(journey)
    }

    fn delete(&self, id: &JourneyId) -> Result<(), RepositoryError> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn find_all_by_owner(
        &self,
        user_id: &str,
        status: Option<JourneyStatus>,
    ) -> Result<Vec<Journey>, RepositoryError> {
        let records = self.lock()?;
        Ok(records
            .values()
            .filter(|journey| journey.user_id == user_id)
            .filter(|journey| status.map_or(true, |status| journey.status == status))
            .cloned()
            .collect())
    }
}
