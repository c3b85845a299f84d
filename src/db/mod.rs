pub mod memory;
pub mod restaurants;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Restaurant, RestaurantPatch};

pub use memory::MemoryRestaurants;
pub use restaurants::PgRestaurants;

/// Storage port for restaurant records.
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    /// All restaurants, newest first.
    async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, RepositoryError>;

    async fn find_by_project_id(
        &self,
        project_id: &str,
    ) -> Result<Option<Restaurant>, RepositoryError>;

    /// Active restaurants with a contact email whose subscription ends within
    /// `[from, to]`, soonest first.
    async fn find_expiring(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Restaurant>, RepositoryError>;

    async fn insert(&self, restaurant: Restaurant) -> Result<Restaurant, RepositoryError>;

    /// Returns `None` when no restaurant has this id.
    async fn update(
        &self,
        id: Uuid,
        patch: RestaurantPatch,
    ) -> Result<Option<Restaurant>, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[derive(Debug)]
pub enum RepositoryError {
    Conflict(String),
    Timeout(Duration),
    Database(sqlx::Error),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            RepositoryError::Timeout(limit) => {
                write!(f, "Repository call timed out after {}s", limit.as_secs_f32())
            }
            RepositoryError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict(
                    "A restaurant is already linked to this project".to_string(),
                )
            }
            _ => RepositoryError::Database(err),
        }
    }
}

/// Run a repository call under a deadline.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Timeout(limit)),
    }
}
