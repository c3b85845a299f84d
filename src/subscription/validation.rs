use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{days_until, TRIAL_DAYS};
use crate::db::{self, RepositoryError, RestaurantRepository};
use crate::models::{Plan, Restaurant};

/// Entitlement answer for a linked project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Trial {
        days_remaining: i64,
    },
    Active {
        plan: Option<Plan>,
        days_remaining: i64,
        expires_at: DateTime<Utc>,
    },
    Deactivated,
    TrialExpired,
    Expired,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Trial { .. } | Verdict::Active { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            Verdict::Trial { .. } => "trial",
            Verdict::Active { .. } => "active",
            Verdict::Deactivated => "deactivated",
            Verdict::TrialExpired => "trial_expired",
            Verdict::Expired => "expired",
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            Verdict::Deactivated => Some("Your restaurant has been deactivated."),
            Verdict::TrialExpired => Some("Trial period has ended."),
            Verdict::Expired => Some("Subscription has expired."),
            Verdict::Trial { .. } | Verdict::Active { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum ValidationError {
    MissingProjectId,
    NotFound,
    Repository(RepositoryError),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingProjectId => write!(f, "Missing project_id"),
            ValidationError::NotFound => write!(f, "Restaurant not found"),
            ValidationError::Repository(err) => write!(f, "{err}"),
        }
    }
}

impl From<RepositoryError> for ValidationError {
    fn from(err: RepositoryError) -> Self {
        ValidationError::Repository(err)
    }
}

/// Binary entitlement policy. Deactivation is checked before any date, and
/// expiry is a strict `now > end` comparison with no warning window.
pub fn evaluate(restaurant: &Restaurant, now: DateTime<Utc>) -> Verdict {
    if !restaurant.is_active {
        return Verdict::Deactivated;
    }

    match restaurant.subscription_end {
        None => {
            let trial_end = restaurant.trial_start + chrono::Duration::days(TRIAL_DAYS);
            if now > trial_end {
                Verdict::TrialExpired
            } else {
                Verdict::Trial {
                    days_remaining: days_until(trial_end, now),
                }
            }
        }
        Some(end) => {
            if now > end {
                Verdict::Expired
            } else {
                Verdict::Active {
                    plan: restaurant.plan,
                    days_remaining: days_until(end, now),
                    expires_at: end,
                }
            }
        }
    }
}

/// Resolves a project id to a restaurant and evaluates its entitlement.
#[derive(Clone)]
pub struct SubscriptionValidator {
    restaurants: Arc<dyn RestaurantRepository>,
    lookup_timeout: Duration,
}

impl SubscriptionValidator {
    pub fn new(restaurants: Arc<dyn RestaurantRepository>, lookup_timeout: Duration) -> Self {
        Self {
            restaurants,
            lookup_timeout,
        }
    }

    pub async fn validate(
        &self,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Verdict, ValidationError> {
        let project_id = project_id
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MissingProjectId)?;

        tracing::info!("Checking subscription for project: {project_id}");

        let restaurant = db::bounded(
            self.lookup_timeout,
            self.restaurants.find_by_project_id(project_id),
        )
        .await?
        .ok_or(ValidationError::NotFound)?;

        let verdict = evaluate(&restaurant, now);
        tracing::debug!(
            "Project {project_id} ({}) resolved to {}",
            restaurant.id,
            verdict.status()
        );
        Ok(verdict)
    }
}
