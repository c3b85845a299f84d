//! Subscription lifecycle rules.
//!
//! Two policies live here side by side: the graded dashboard status
//! ([`status::classify`]) and the binary entitlement check served to deployed
//! instances ([`validation::evaluate`]). They intentionally disagree near the
//! end of a subscription and must not be merged.

pub mod status;
pub mod validation;

use chrono::{DateTime, Utc};

/// Length of the free trial, counted from `trial_start`.
pub const TRIAL_DAYS: i64 = 14;

/// A subscription ending within this many days is reported as expiring.
pub const EXPIRY_WARNING_DAYS: i64 = 14;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Whole days from `now` until `end`, rounded up. Negative durations round
/// toward zero, so anything less than a day in the past yields `0`.
pub fn days_until(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (end - now).num_milliseconds();
    let whole = ms.div_euclid(DAY_MS);
    if ms.rem_euclid(DAY_MS) == 0 {
        whole
    } else {
        whole + 1
    }
}
