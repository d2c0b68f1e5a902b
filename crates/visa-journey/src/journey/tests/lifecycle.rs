use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::json;

use super::common::*;
use crate::catalog::ConditionalLogic;
use crate::error::ValidationError;
use crate::journey::{
    default_rules, CouplingRule, Journey, JourneyId, JourneySeed, JourneyStatus, Route,
    SharePermission, CAS_STEP, MAX_NOTE_LENGTH, UNCONDITIONAL_OFFER_STEP,
};

fn fresh_journey() -> Journey {
    Journey::start(
        JourneyId("journey-1".to_string()),
        JourneySeed {
            user_id: "user-owner".to_string(),
            email: "owner@example.com".to_string(),
            route: Route::new("India", "UK"),
            user_type: "student".to_string(),
            visa_type: "student".to_string(),
        },
        started_at(),
    )
}

#[test]
fn new_journeys_start_empty_on_a_normalized_route() {
    let journey = fresh_journey();
    assert_eq!(journey.origin_country, "india");
    assert_eq!(journey.destination_country, "uk");
    assert_eq!(journey.status, JourneyStatus::Started);
    assert!(journey.step_completion.is_empty());
    assert_eq!(journey.progress_metrics.completion_percentage, 0);
    assert_eq!(journey.timestamps.journey_started, started_at());
    assert_eq!(journey.timestamps.last_activity, started_at());
    assert_eq!(journey.version, 0);
}

#[test]
fn step_and_checklist_updates_recompute_progress() {
    let mut journey = fresh_journey();
    let now = started_at() + Duration::minutes(5);

    journey.mark_step_completed("a", now).expect("step a");
    journey.set_step_completion("b", false, now).expect("step b");
    journey
        .update_checklist(BTreeMap::from([("x".to_string(), true)]), now)
        .expect("checklist");

    let metrics = &journey.progress_metrics;
    assert_eq!(metrics.total_steps, 2);
    assert_eq!(metrics.completed_steps, 1);
    assert_eq!(metrics.total_checklist_items, 1);
    assert_eq!(metrics.completed_checklist_items, 1);
    assert_eq!(metrics.completion_percentage, 67);
    assert_eq!(journey.timestamps.step_completed, Some(now));
    assert_eq!(journey.timestamps.checklist_updated, Some(now));
    assert_eq!(journey.timestamps.last_activity, now);
}

#[test]
fn uncompleting_a_step_keeps_it_in_the_total() {
    let mut journey = fresh_journey();
    let now = started_at();
    journey.mark_step_completed("biometrics", now).expect("complete");
    journey
        .set_step_completion("biometrics", false, now)
        .expect("uncomplete");

    assert_eq!(journey.step_completion.get("biometrics"), Some(&false));
    assert_eq!(journey.progress_metrics.total_steps, 1);
    assert_eq!(journey.progress_metrics.completion_percentage, 0);
}

#[test]
fn blank_step_ids_are_rejected() {
    let mut journey = fresh_journey();
    assert_eq!(
        journey.mark_step_completed("  ", started_at()),
        Err(ValidationError::MissingField("stepId"))
    );
    assert!(journey.step_completion.is_empty());
}

#[test]
fn receiving_a_cas_completes_offer_and_cas_steps() {
    let mut journey = fresh_journey();
    let now = started_at() + Duration::hours(1);

    journey.merge_personalization(answers(json!({ "hasCAS": true })), &default_rules(), now);

    assert_eq!(journey.step_completion.get(UNCONDITIONAL_OFFER_STEP), Some(&true));
    assert_eq!(journey.step_completion.get(CAS_STEP), Some(&true));
    assert_eq!(journey.timestamps.cas_auto_completed, Some(now));
    assert_eq!(journey.timestamps.personalization_updated, Some(now));
    assert_eq!(journey.progress_metrics.completion_percentage, 100);
}

#[test]
fn cas_auto_completion_stamp_tracks_the_latest_merge() {
    let mut journey = fresh_journey();
    let rules = default_rules();
    let first = started_at() + Duration::hours(1);
    let later = first + Duration::days(2);

    journey.merge_personalization(answers(json!({ "hasCAS": true })), &rules, first);
    journey.merge_personalization(answers(json!({ "studyLocation": "london" })), &rules, later);

    assert_eq!(journey.timestamps.cas_auto_completed, Some(later));
}

#[test]
fn coupling_rules_never_uncomplete_steps() {
    let mut journey = fresh_journey();
    let rules = default_rules();
    journey.merge_personalization(answers(json!({ "hasCAS": true })), &rules, started_at());
    journey.merge_personalization(answers(json!({ "hasCAS": false })), &rules, started_at());

    assert_eq!(journey.personalization_data.has_cas, Some(false));
    assert_eq!(journey.step_completion.get(CAS_STEP), Some(&true));
}

#[test]
fn answers_without_a_cas_leave_steps_alone() {
    let mut journey = fresh_journey();
    journey.merge_personalization(
        answers(json!({ "hasCAS": false, "studyLocation": "london" })),
        &default_rules(),
        started_at(),
    );

    assert!(journey.step_completion.is_empty());
    assert!(journey.timestamps.cas_auto_completed.is_none());
}

#[test]
fn personalization_merges_per_key() {
    let mut journey = fresh_journey();
    let rules = default_rules();
    journey.merge_personalization(
        answers(json!({ "studyLocation": "london", "requiresATAS": true })),
        &rules,
        started_at(),
    );
    journey.merge_personalization(
        answers(json!({ "casDate": "15/01/2025", "requiresATAS": false })),
        &rules,
        started_at(),
    );

    let data = serde_json::to_value(&journey.personalization_data).expect("serializes");
    assert_eq!(
        data,
        json!({ "studyLocation": "london", "casDate": "15/01/2025", "requiresATAS": false })
    );
}

#[test]
fn extra_coupling_rules_are_declarative() {
    let mut journey = fresh_journey();
    let rules = vec![CouplingRule::new(
        ConditionalLogic::new("studyLocation", "london"),
        &["funds-london"],
    )];

    journey.merge_personalization(
        answers(json!({ "studyLocation": "london" })),
        &rules,
        started_at(),
    );

    assert_eq!(journey.step_completion.get("funds-london"), Some(&true));
    assert!(journey.timestamps.cas_auto_completed.is_none());
}

#[test]
fn notes_are_trimmed_and_bounded() {
    let mut journey = fresh_journey();
    let now = started_at();

    assert_eq!(
        journey.add_note("   ", "owner@example.com", now),
        Err(ValidationError::EmptyNote)
    );
    assert_eq!(
        journey.add_note(&"a".repeat(MAX_NOTE_LENGTH + 1), "owner@example.com", now),
        Err(ValidationError::NoteTooLong {
            max: MAX_NOTE_LENGTH,
            found: MAX_NOTE_LENGTH + 1,
        })
    );

    journey
        .add_note(" Book TB test ", "owner@example.com", now)
        .expect("first note");
    journey
        .add_note(&"b".repeat(MAX_NOTE_LENGTH), "adviser@example.com", now)
        .expect("note at the limit");

    assert_eq!(journey.notes.len(), 2);
    assert_eq!(journey.notes[0].content, "Book TB test");
    assert_eq!(journey.notes[1].author, "adviser@example.com");
    assert_eq!(journey.timestamps.note_added, Some(now));
}

#[test]
fn sharing_upserts_by_email() {
    let mut journey = fresh_journey();
    let now = started_at();

    journey
        .share("parent@example.com", SharePermission::View, now)
        .expect("share");
    journey
        .share(" Parent@Example.com ", SharePermission::Edit, now)
        .expect("reshare");

    assert!(journey.is_shared);
    assert_eq!(journey.shared_with.len(), 1);
    assert_eq!(journey.shared_with[0].email, "parent@example.com");
    assert_eq!(journey.shared_with[0].permission, SharePermission::Edit);
    assert_eq!(journey.timestamps.shared, Some(now));
}

#[test]
fn sharing_requires_a_plausible_email() {
    let mut journey = fresh_journey();
    assert_eq!(
        journey.share("  ", SharePermission::View, started_at()),
        Err(ValidationError::EmptyEmail)
    );
    assert_eq!(
        journey.share("parent.example.com", SharePermission::View, started_at()),
        Err(ValidationError::InvalidEmail("parent.example.com".to_string()))
    );
    assert!(!journey.is_shared);
}

#[test]
fn status_changes_are_permissive_and_stamped() {
    let mut journey = fresh_journey();
    let later = started_at() + Duration::days(1);

    journey.set_status(JourneyStatus::Completed, None, later);
    journey.set_status(JourneyStatus::InProgress, None, later);

    assert_eq!(journey.status, JourneyStatus::InProgress);
    assert_eq!(journey.timestamps.status_changed, Some(later));
}

#[test]
fn last_activity_never_moves_backwards() {
    let mut journey = fresh_journey();
    let later = started_at() + Duration::hours(2);
    journey.mark_step_completed("a", later).expect("step");
    journey
        .mark_step_completed("b", started_at() - Duration::hours(1))
        .expect("step with a skewed clock");

    assert_eq!(journey.timestamps.last_activity, later);
}
