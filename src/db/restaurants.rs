use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, RestaurantRepository};
use crate::models::{Restaurant, RestaurantPatch};

/// PostgreSQL-backed restaurant store.
#[derive(Clone)]
pub struct PgRestaurants {
    pool: PgPool,
}

impl PgRestaurants {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RestaurantRepository for PgRestaurants {
    async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows = sqlx::query_as::<_, Restaurant>(
            "SELECT * FROM restaurants ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_project_id(
        &self,
        project_id: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query_as::<_, Restaurant>(
            "SELECT * FROM restaurants WHERE linked_project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_expiring(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows = sqlx::query_as::<_, Restaurant>(
            "SELECT * FROM restaurants
             WHERE is_active = TRUE
               AND subscription_end IS NOT NULL
               AND contact_email IS NOT NULL
               AND subscription_end >= $1
               AND subscription_end <= $2
             ORDER BY subscription_end ASC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, restaurant: Restaurant) -> Result<Restaurant, RepositoryError> {
        let row = sqlx::query_as::<_, Restaurant>(
            "INSERT INTO restaurants
                (id, name, domain, contact_email, contact_phone, notes, trial_start,
                 subscription_end, plan, is_active, linked_project_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(restaurant.id)
        .bind(&restaurant.name)
        .bind(&restaurant.domain)
        .bind(&restaurant.contact_email)
        .bind(&restaurant.contact_phone)
        .bind(&restaurant.notes)
        .bind(restaurant.trial_start)
        .bind(restaurant.subscription_end)
        .bind(restaurant.plan)
        .bind(restaurant.is_active)
        .bind(&restaurant.linked_project_id)
        .bind(restaurant.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: RestaurantPatch,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Restaurant>(
            "SELECT * FROM restaurants WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut restaurant) = current else {
            return Ok(None);
        };
        patch.apply(&mut restaurant);

        let row = sqlx::query_as::<_, Restaurant>(
            "UPDATE restaurants SET
                name = $2, domain = $3, contact_email = $4, contact_phone = $5, notes = $6,
                trial_start = $7, subscription_end = $8, plan = $9, is_active = $10,
                linked_project_id = $11
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&restaurant.name)
        .bind(&restaurant.domain)
        .bind(&restaurant.contact_email)
        .bind(&restaurant.contact_phone)
        .bind(&restaurant.notes)
        .bind(restaurant.trial_start)
        .bind(restaurant.subscription_end)
        .bind(restaurant.plan)
        .bind(restaurant.is_active)
        .bind(&restaurant.linked_project_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM restaurants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
