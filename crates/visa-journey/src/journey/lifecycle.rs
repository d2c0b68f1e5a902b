use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::coupling::{apply_rules, CouplingRule};
use super::domain::{
    Journey, JourneyEvent, JourneyId, JourneyNote, JourneyPhase, JourneyStatus, Route,
    ShareGrant, SharePermission,
};
use super::progress::{recompute, ProgressMetrics};
use crate::catalog::PersonalizationData;
use crate::error::ValidationError;

pub const MAX_NOTE_LENGTH: usize = 1000;

/// Owner-supplied fields for a brand new journey.
#[derive(Debug, Clone)]
pub struct JourneySeed {
    pub user_id: String,
    pub email: String,
    pub route: Route,
    pub user_type: String,
    pub visa_type: String,
}

impl Journey {
    pub fn start(id: JourneyId, seed: JourneySeed, now: DateTime<Utc>) -> Self {
        let JourneySeed {
            user_id,
            email,
            route,
            user_type,
            visa_type,
        } = seed;

        Self {
            id,
            user_id,
            email,
            origin_country: route.origin,
            destination_country: route.destination,
            user_type,
            visa_type,
            status: JourneyStatus::Started,
            phase: JourneyPhase::Selection,
            personalization_data: PersonalizationData::default(),
            step_completion: BTreeMap::new(),
            checklist: BTreeMap::new(),
            progress_metrics: ProgressMetrics::default(),
            timestamps: super::domain::JourneyTimestamps::started_at(now),
            notes: Vec::new(),
            shared_with: Vec::new(),
            is_shared: false,
            version: 0,
        }
    }

    pub fn refresh_progress(&mut self) {
        self.progress_metrics = recompute(&self.step_completion, &self.checklist);
    }

    pub fn mark_step_completed(
        &mut self,
        step_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.set_step_completion(step_id, true, now)
    }

    /// `false` un-completes the step but keeps its key, so it still counts toward the total.
    pub fn set_step_completion(
        &mut self,
        step_id: &str,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let step_id = step_id.trim();
        if step_id.is_empty() {
            return Err(ValidationError::MissingField("stepId"));
        }

        self.step_completion.insert(step_id.to_string(), completed);
        if completed {
            self.timestamps.record(JourneyEvent::StepCompleted, now);
        }
        self.refresh_progress();
        self.timestamps.touch(now);
        Ok(())
    }

    /// Merges entries into the checklist; items not mentioned are left alone.
    pub fn update_checklist(
        &mut self,
        updates: BTreeMap<String, bool>,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if updates.keys().any(|key| key.trim().is_empty()) {
            return Err(ValidationError::MissingField("checklist item id"));
        }

        self.checklist.extend(updates);
        self.timestamps.record(JourneyEvent::ChecklistUpdated, now);
        self.refresh_progress();
        self.timestamps.touch(now);
        Ok(())
    }

    /// Shallow-merges answers, then lets coupling rules complete implied steps.
    pub fn merge_personalization(
        &mut self,
        partial: PersonalizationData,
        rules: &[CouplingRule],
        now: DateTime<Utc>,
    ) {
        if !partial.is_empty() {
            self.personalization_data.merge(partial);
            self.timestamps
                .record(JourneyEvent::PersonalizationUpdated, now);
        }
        apply_rules(rules, self, now);
        self.refresh_progress();
        self.timestamps.touch(now);
    }

    pub fn add_note(
        &mut self,
        content: &str,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyNote);
        }
        let length = content.chars().count();
        if length > MAX_NOTE_LENGTH {
            return Err(ValidationError::NoteTooLong {
                max: MAX_NOTE_LENGTH,
                found: length,
            });
        }

        self.notes.push(JourneyNote {
            content: content.to_string(),
            author: author.to_string(),
            created_at: now,
        });
        self.timestamps.record(JourneyEvent::NoteAdded, now);
        self.timestamps.touch(now);
        Ok(())
    }

    /// Grants access to `email`, replacing the permission of an existing grant.
    pub fn share(
        &mut self,
        email: &str,
        permission: SharePermission,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let email = normalize_email(email)?;

        match self
            .shared_with
            .iter_mut()
            .find(|grant| grant.email == email)
        {
            Some(grant) => grant.permission = permission,
            None => self.shared_with.push(ShareGrant {
                email,
                permission,
                shared_at: now,
            }),
        }

        self.is_shared = true;
        self.timestamps.record(JourneyEvent::Shared, now);
        self.timestamps.touch(now);
        Ok(())
    }

    /// Any status may follow any other; uniqueness of active journeys is
    /// enforced when the journey is saved.
    pub fn set_status(
        &mut self,
        status: JourneyStatus,
        phase: Option<JourneyPhase>,
        now: DateTime<Utc>,
    ) {
        if status != self.status {
            self.status = status;
            self.timestamps.record(JourneyEvent::StatusChanged, now);
        }
        if let Some(phase) = phase {
            self.phase = phase;
        }
        self.timestamps.touch(now);
    }
}

pub(crate) fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::InvalidEmail(raw.trim().to_string()));
    }
    Ok(email)
}
