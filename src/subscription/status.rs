use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{days_until, EXPIRY_WARNING_DAYS};
use crate::models::Restaurant;

/// Lifecycle phase shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Trial,
    Active,
    Expiring,
    Expired,
}

impl Phase {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trial" => Some(Phase::Trial),
            "active" => Some(Phase::Active),
            "expiring" => Some(Phase::Expiring),
            "expired" => Some(Phase::Expired),
            _ => None,
        }
    }
}

/// Dashboard classification. Ignores `is_active`; deactivation is reported
/// separately through [`StatusView`].
pub fn classify(restaurant: &Restaurant, now: DateTime<Utc>) -> Phase {
    let Some(end) = restaurant.subscription_end else {
        return Phase::Trial;
    };

    if end < now {
        return Phase::Expired;
    }

    if days_until(end, now) <= EXPIRY_WARNING_DAYS {
        Phase::Expiring
    } else {
        Phase::Active
    }
}

/// Lifecycle phase and operator activation flag, kept orthogonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusView {
    pub phase: Phase,
    pub is_active: bool,
}

impl StatusView {
    pub fn of(restaurant: &Restaurant, now: DateTime<Utc>) -> Self {
        Self {
            phase: classify(restaurant, now),
            is_active: restaurant.is_active,
        }
    }
}
