use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_plan")]
pub enum Plan {
    #[serde(rename = "6_months")]
    #[sqlx(rename = "6_months")]
    SixMonths,
    #[serde(rename = "1_year")]
    #[sqlx(rename = "1_year")]
    OneYear,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::SixMonths => "6_months",
            Plan::OneYear => "1_year",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            Plan::SixMonths => 6,
            Plan::OneYear => 12,
        }
    }

    /// End of a subscription bought at `now`. Always counted from `now`, never
    /// from a previous end date. Day-of-month overflow clamps to the month's last day.
    pub fn end_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_months(Months::new(self.months()))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub trial_start: DateTime<Utc>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub plan: Option<Plan>,
    pub is_active: bool,
    pub linked_project_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when registering a restaurant. Only `name` is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRestaurant {
    pub name: String,
    pub domain: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub trial_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub plan: Option<Plan>,
    pub is_active: Option<bool>,
    pub linked_project_id: Option<String>,
}

impl NewRestaurant {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Materialize the record, filling `id`, `created_at` and the defaults.
    pub fn into_restaurant(self, now: DateTime<Utc>) -> Restaurant {
        Restaurant {
            id: Uuid::now_v7(),
            name: self.name,
            domain: self.domain,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            notes: self.notes,
            trial_start: self.trial_start.unwrap_or(now),
            subscription_end: self.subscription_end,
            plan: self.plan,
            is_active: self.is_active.unwrap_or(true),
            linked_project_id: self.linked_project_id,
            created_at: now,
        }
    }
}

/// Partial update. For nullable columns the outer `Option` says whether the
/// field was sent and the inner one carries the new value (`null` clears it).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub domain: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    pub trial_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub subscription_end: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub plan: Option<Option<Plan>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub linked_project_id: Option<Option<String>>,
}

impl RestaurantPatch {
    pub fn activation(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Default::default()
        }
    }

    pub fn extension(plan: Plan, now: DateTime<Utc>) -> Self {
        Self {
            plan: Some(Some(plan)),
            subscription_end: Some(Some(plan.end_from(now))),
            ..Default::default()
        }
    }

    pub fn apply(self, restaurant: &mut Restaurant) {
        if let Some(name) = self.name {
            restaurant.name = name;
        }
        if let Some(domain) = self.domain {
            restaurant.domain = domain;
        }
        if let Some(email) = self.contact_email {
            restaurant.contact_email = email;
        }
        if let Some(phone) = self.contact_phone {
            restaurant.contact_phone = phone;
        }
        if let Some(notes) = self.notes {
            restaurant.notes = notes;
        }
        if let Some(trial_start) = self.trial_start {
            restaurant.trial_start = trial_start;
        }
        if let Some(end) = self.subscription_end {
            restaurant.subscription_end = end;
        }
        if let Some(plan) = self.plan {
            restaurant.plan = plan;
        }
        if let Some(is_active) = self.is_active {
            restaurant.is_active = is_active;
        }
        if let Some(project_id) = self.linked_project_id {
            restaurant.linked_project_id = project_id;
        }
    }
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
