use serde::Serialize;

use super::domain::{Journey, SharePermission};
use crate::auth::Caller;

/// What a caller may do with a journey. Each level includes the ones below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    View,
    Comment,
    Edit,
    Owner,
}

impl AccessLevel {
    pub const fn label(self) -> &'static str {
        match self {
            AccessLevel::View => "view",
            AccessLevel::Comment => "comment",
            AccessLevel::Edit => "edit",
            AccessLevel::Owner => "owner",
        }
    }
}

impl From<SharePermission> for AccessLevel {
    fn from(permission: SharePermission) -> Self {
        match permission {
            SharePermission::View => AccessLevel::View,
            SharePermission::Comment => AccessLevel::Comment,
            SharePermission::Edit => AccessLevel::Edit,
        }
    }
}

/// `None` when the caller neither owns the journey nor holds a share grant.
pub fn access_level(journey: &Journey, caller: &Caller) -> Option<AccessLevel> {
    if journey.user_id == caller.user_id {
        return Some(AccessLevel::Owner);
    }
    if caller.email.is_empty() {
        return None;
    }
    journey
        .shared_with
        .iter()
        .find(|grant| grant.email.eq_ignore_ascii_case(&caller.email))
        .map(|grant| grant.permission.into())
}

pub fn allows(journey: &Journey, caller: &Caller, needed: AccessLevel) -> bool {
    access_level(journey, caller).is_some_and(|level| level >= needed)
}
