//! Per-user visa journeys: lifecycle rules, progress metrics, sharing, and
//! the HTTP surface over them.

pub mod access;
pub mod coupling;
pub mod domain;
mod lifecycle;
pub mod memory;
pub mod progress;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use access::{access_level, allows, AccessLevel};
pub use coupling::{default_rules, CouplingRule, CAS_STEP, UNCONDITIONAL_OFFER_STEP};
pub use domain::{
    Journey, JourneyEvent, JourneyId, JourneyNote, JourneyPhase, JourneyStatus,
    JourneyTimestamps, Route, ShareGrant, SharePermission,
};
pub use lifecycle::{JourneySeed, MAX_NOTE_LENGTH};
pub use memory::InMemoryJourneyRepository;
pub use progress::{recompute, ProgressMetrics};
pub use repository::{JourneyRepository, RepositoryError};
pub use router::journey_router;
pub use service::{
    Clock, JourneyService, JourneyServiceError, StartJourney, StartedJourney, SystemClock,
};
