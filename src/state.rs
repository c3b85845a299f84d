use std::sync::Arc;

use crate::config::Config;
use crate::db::RestaurantRepository;
use crate::email::Mailer;
use crate::notify::ExpiryNotificationJob;
use crate::rate_limit::CheckRateLimiter;
use crate::subscription::validation::SubscriptionValidator;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub restaurants: Arc<dyn RestaurantRepository>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub validator: SubscriptionValidator,
    pub check_limiter: CheckRateLimiter,
}

impl AppState {
    pub fn new(
        config: Config,
        restaurants: Arc<dyn RestaurantRepository>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let validator = SubscriptionValidator::new(restaurants.clone(), config.repository_timeout);
        Self {
            config,
            restaurants,
            mailer,
            validator,
            check_limiter: CheckRateLimiter::new(),
        }
    }

    /// The expiry job wired to the configured transport, if there is one.
    pub fn notification_job(&self) -> Option<ExpiryNotificationJob> {
        let mailer = self.mailer.clone()?;
        Some(
            ExpiryNotificationJob::new(self.restaurants.clone(), mailer)
                .with_timeouts(self.config.repository_timeout, self.config.mail_timeout)
                .with_concurrency(self.config.notify_concurrency),
        )
    }
}
