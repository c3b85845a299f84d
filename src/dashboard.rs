//! Aggregations behind the admin dashboard: search, stats cards and the
//! monthly trend chart.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::models::Restaurant;
use crate::subscription::status::{classify, Phase, StatusView};

/// Number of months shown on the trend chart, current month included.
pub const TREND_MONTHS: u32 = 6;

/// Case-insensitive match against name, domain and contact email.
pub fn matches_search(restaurant: &Restaurant, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let hit = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(&needle));
    hit(Some(&restaurant.name))
        || hit(restaurant.domain.as_deref())
        || hit(restaurant.contact_email.as_deref())
}

/// Filter on search text and an optional lifecycle phase.
pub fn filter(
    restaurants: Vec<Restaurant>,
    search: Option<&str>,
    phase: Option<Phase>,
    now: DateTime<Utc>,
) -> Vec<Restaurant> {
    restaurants
        .into_iter()
        .filter(|r| search.is_none_or(|s| matches_search(r, s)))
        .filter(|r| phase.is_none_or(|p| classify(r, now) == p))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub trials: usize,
    pub active: usize,
    pub expiring: usize,
    pub expired: usize,
    pub deactivated: usize,
}

pub fn stats(restaurants: &[Restaurant], now: DateTime<Utc>) -> Stats {
    restaurants.iter().fold(Stats::default(), |mut acc, r| {
        let view = StatusView::of(r, now);
        acc.total += 1;
        match view.phase {
            Phase::Trial => acc.trials += 1,
            Phase::Active => acc.active += 1,
            Phase::Expiring => acc.expiring += 1,
            Phase::Expired => acc.expired += 1,
        }
        if !view.is_active {
            acc.deactivated += 1;
        }
        acc
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub month: String,
    pub active: usize,
    pub trials: usize,
    pub expired: usize,
}

/// One point per month for the last [`TREND_MONTHS`] months, oldest first.
///
/// A restaurant counts as active in a month when it is switched on, started
/// its trial before the month ended, and its subscription (if any) had not
/// ended before the month began. Expired counts subscriptions that ended
/// inside the month.
pub fn trends(restaurants: &[Restaurant], now: DateTime<Utc>) -> Vec<TrendPoint> {
    (0..TREND_MONTHS)
        .rev()
        .filter_map(|back| {
            let anchor = now.date_naive().checked_sub_months(Months::new(back))?;
            let start = month_start(anchor)?;
            let next = start.checked_add_months(Months::new(1))?;
            Some(trend_point(restaurants, start, next))
        })
        .collect()
}

fn trend_point(restaurants: &[Restaurant], start: DateTime<Utc>, next: DateTime<Utc>) -> TrendPoint {
    let started = |r: &Restaurant| r.trial_start < next;

    let active = restaurants
        .iter()
        .filter(|r| started(r) && r.is_active)
        .filter(|r| r.subscription_end.is_none_or(|end| end >= start))
        .count();

    let trials = restaurants
        .iter()
        .filter(|r| r.subscription_end.is_none() && started(r) && r.is_active)
        .count();

    let expired = restaurants
        .iter()
        .filter(|r| r.subscription_end.is_some_and(|end| end >= start && end < next))
        .count();

    TrendPoint {
        month: start.format("%b %Y").to_string(),
        active,
        trials,
        expired,
    }
}

fn month_start(day: NaiveDate) -> Option<DateTime<Utc>> {
    let first = NaiveDate::from_ymd_opt(day.year(), day.month(), 1)?;
    Some(Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?))
}
