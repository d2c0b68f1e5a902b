use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::progress::ProgressMetrics;
use crate::catalog::{PersonalizationData, VisaTypeKey};

/// Identifier wrapper for persisted journeys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JourneyId(pub String);

impl JourneyId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for JourneyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Origin and destination country slugs, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: &str, destination: &str) -> Self {
        Self {
            origin: crate::catalog::domain::normalize_slug(origin),
            destination: crate::catalog::domain::normalize_slug(destination),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
    Started,
    InProgress,
    UnderReview,
    Completed,
    Abandoned,
    Cancelled,
}

impl JourneyStatus {
    /// Active journeys count toward the one-per-route limit.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            JourneyStatus::Started | JourneyStatus::InProgress | JourneyStatus::UnderReview
        )
    }
}

/// Display-only position in the application; not tied to `JourneyStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyPhase {
    Selection,
    Personalization,
    Preparation,
    Application,
    Processing,
    Decision,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SharePermission {
    #[default]
    View,
    Comment,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareGrant {
    pub email: String,
    pub permission: SharePermission,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyNote {
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Transitions whose most recent occurrence is recorded on the journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JourneyEvent {
    StepCompleted,
    ChecklistUpdated,
    PersonalizationUpdated,
    CasAutoCompleted,
    StatusChanged,
    NoteAdded,
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyTimestamps {
    pub journey_started: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalization_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cas_auto_completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_changed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_added: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<DateTime<Utc>>,
}

impl JourneyTimestamps {
    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            journey_started: now,
            last_activity: now,
            step_completed: None,
            checklist_updated: None,
            personalization_updated: None,
            cas_auto_completed: None,
            status_changed: None,
            note_added: None,
            shared: None,
        }
    }

    pub fn record(&mut self, event: JourneyEvent, at: DateTime<Utc>) {
        let slot = match event {
            JourneyEvent::StepCompleted => &mut self.step_completed,
            JourneyEvent::ChecklistUpdated => &mut self.checklist_updated,
            JourneyEvent::PersonalizationUpdated => &mut self.personalization_updated,
            JourneyEvent::CasAutoCompleted => &mut self.cas_auto_completed,
            JourneyEvent::StatusChanged => &mut self.status_changed,
            JourneyEvent::NoteAdded => &mut self.note_added,
            JourneyEvent::Shared => &mut self.shared,
        };
        *slot = Some(at);
    }

    /// Never moves backwards, even if the clock does.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }
}

/// One user's progress through one origin → destination visa application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: JourneyId,
    pub user_id: String,
    pub email: String,
    pub origin_country: String,
    pub destination_country: String,
    pub user_type: String,
    pub visa_type: String,
    pub status: JourneyStatus,
    pub phase: JourneyPhase,
    pub personalization_data: PersonalizationData,
    pub step_completion: BTreeMap<String, bool>,
    pub checklist: BTreeMap<String, bool>,
    pub progress_metrics: ProgressMetrics,
    pub timestamps: JourneyTimestamps,
    pub notes: Vec<JourneyNote>,
    pub shared_with: Vec<ShareGrant>,
    pub is_shared: bool,
    /// Optimistic concurrency token; bumped by the repository on every save.
    #[serde(default)]
    pub version: u64,
}

impl Journey {
    pub fn route(&self) -> Route {
        Route {
            origin: self.origin_country.clone(),
            destination: self.destination_country.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn visa_type_key(&self) -> VisaTypeKey {
        VisaTypeKey::new(
            &self.origin_country,
            &self.destination_country,
            &self.visa_type,
        )
    }
}
