use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use crate::db::{self, RepositoryError, RestaurantRepository};
use crate::email::templates;
use crate::email::{MailError, Mailer};
use crate::models::Restaurant;
use crate::subscription::{days_until, EXPIRY_WARNING_DAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Per-restaurant result of a notification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub restaurant: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub processed: usize,
    pub results: Vec<NotificationOutcome>,
}

impl JobReport {
    pub fn sent(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == DeliveryStatus::Sent)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.processed - self.sent()
    }
}

#[derive(Debug)]
pub enum JobError {
    Query(RepositoryError),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::Query(err) => write!(f, "Failed to fetch expiring restaurants: {err}"),
        }
    }
}

impl std::error::Error for JobError {}

/// Emails every active restaurant whose subscription ends in the next
/// [`EXPIRY_WARNING_DAYS`] days. Nothing is remembered between runs, so
/// running twice in the same window notifies twice.
pub struct ExpiryNotificationJob {
    restaurants: Arc<dyn RestaurantRepository>,
    mailer: Arc<dyn Mailer>,
    query_timeout: Duration,
    send_timeout: Duration,
    concurrency: usize,
}

impl ExpiryNotificationJob {
    pub fn new(restaurants: Arc<dyn RestaurantRepository>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            restaurants,
            mailer,
            query_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(15),
            concurrency: 1,
        }
    }

    pub fn with_timeouts(mut self, query_timeout: Duration, send_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self.send_timeout = send_timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<JobReport, JobError> {
        let window_end = now + chrono::Duration::days(EXPIRY_WARNING_DAYS);

        let candidates = db::bounded(
            self.query_timeout,
            self.restaurants.find_expiring(now, window_end),
        )
        .await
        .map_err(JobError::Query)?;

        let processed = candidates.len();
        tracing::info!("Found {processed} restaurants with expiring subscriptions");

        // `buffered` keeps candidate order in the report.
        let results: Vec<NotificationOutcome> = stream::iter(candidates)
            .map(|restaurant| async move { self.notify(&restaurant, now).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        Ok(JobReport { processed, results })
    }

    async fn notify(&self, restaurant: &Restaurant, now: DateTime<Utc>) -> NotificationOutcome {
        match self.deliver(restaurant, now).await {
            Ok(to) => {
                tracing::info!("Email sent to {to} for {}", restaurant.name);
                NotificationOutcome {
                    restaurant: restaurant.name.clone(),
                    status: DeliveryStatus::Sent,
                    email: Some(to),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(
                    "Failed to send expiry notice for {} ({}): {e}",
                    restaurant.name,
                    restaurant.id
                );
                NotificationOutcome {
                    restaurant: restaurant.name.clone(),
                    status: DeliveryStatus::Failed,
                    email: None,
                    error: Some(e.message),
                }
            }
        }
    }

    async fn deliver(&self, restaurant: &Restaurant, now: DateTime<Utc>) -> Result<String, MailError> {
        let to = restaurant
            .contact_email
            .as_deref()
            .ok_or("Restaurant has no contact email")?;
        let expires_at = restaurant
            .subscription_end
            .ok_or("Restaurant has no subscription end date")?;

        let days = days_until(expires_at, now);
        let html = templates::render_expiry_notice(
            &restaurant.name,
            restaurant.domain.as_deref(),
            days,
            expires_at,
        )
        .map_err(|e| MailError::from(format!("Failed to render email: {e}")))?;
        let subject = templates::expiry_subject(&restaurant.name);

        match tokio::time::timeout(self.send_timeout, self.mailer.send(to, &subject, &html)).await {
            Ok(result) => {
                let sent = result?;
                tracing::debug!("Provider accepted message for {to}: {:?}", sent.id);
                Ok(to.to_string())
            }
            Err(_) => Err(MailError::from(format!(
                "Email send timed out after {:?}",
                self.send_timeout
            ))),
        }
    }
}
