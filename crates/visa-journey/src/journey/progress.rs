use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Completion figures derived from a journey's step and checklist maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    pub total_steps: u32,
    pub completed_steps: u32,
    pub total_checklist_items: u32,
    pub completed_checklist_items: u32,
    pub completion_percentage: u8,
}

/// Totals are the map sizes, not the catalog's step count: a key the client
/// never touched does not count toward the total.
pub fn recompute(
    step_completion: &BTreeMap<String, bool>,
    checklist: &BTreeMap<String, bool>,
) -> ProgressMetrics {
    let (total_steps, completed_steps) = tally(step_completion);
    let (total_checklist_items, completed_checklist_items) = tally(checklist);

    ProgressMetrics {
        total_steps,
        completed_steps,
        total_checklist_items,
        completed_checklist_items,
        completion_percentage: percentage(
            u64::from(completed_steps) + u64::from(completed_checklist_items),
            u64::from(total_steps) + u64::from(total_checklist_items),
        ),
    }
}

fn tally(entries: &BTreeMap<String, bool>) -> (u32, u32) {
    let total = saturating_u32(entries.len());
    let completed = saturating_u32(entries.values().filter(|done| **done).count());
    (total, completed)
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Rounds half up, clamps to 100, and is 0 for an empty denominator.
fn percentage(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (200 * done + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
