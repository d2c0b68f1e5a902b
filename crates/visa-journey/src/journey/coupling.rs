use chrono::{DateTime, Utc};

use super::domain::{Journey, JourneyEvent};
use crate::catalog::{evaluate, ConditionalLogic};

pub const UNCONDITIONAL_OFFER_STEP: &str = "unconditional-offer";
pub const CAS_STEP: &str = "cas";

/// Answer that implies steps are already done, e.g. holding a CAS means the
/// offer was accepted and the CAS issued.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingRule {
    pub trigger: ConditionalLogic,
    pub completes: Vec<String>,
    pub event: Option<JourneyEvent>,
}

impl CouplingRule {
    pub fn new(trigger: ConditionalLogic, completes: &[&str]) -> Self {
        Self {
            trigger,
            completes: completes.iter().map(|step| step.to_string()).collect(),
            event: None,
        }
    }

    pub fn recording(mut self, event: JourneyEvent) -> Self {
        self.event = Some(event);
        self
    }
}

pub fn default_rules() -> Vec<CouplingRule> {
    vec![
        CouplingRule::new(
            ConditionalLogic::new("hasCAS", true),
            &[UNCONDITIONAL_OFFER_STEP, CAS_STEP],
        )
        .recording(JourneyEvent::CasAutoCompleted),
    ]
}

/// Runs every rule against the journey's current answers. Rules only ever
/// complete steps; they never un-complete one. Returns how many rules fired.
///
/// A fired rule re-stamps its event on every merge, so `casAutoCompleted`
/// holds the latest merge that satisfied `hasCAS`, not the first.
pub(crate) fn apply_rules(rules: &[CouplingRule], journey: &mut Journey, now: DateTime<Utc>) -> usize {
    let mut fired = 0;
    for rule in rules {
        if !evaluate(Some(&rule.trigger), &journey.personalization_data) {
            continue;
        }
        for step in &rule.completes {
            journey.step_completion.insert(step.clone(), true);
        }
        if let Some(event) = rule.event {
            journey.timestamps.record(event, now);
        }
        fired += 1;
    }
    fired
}
