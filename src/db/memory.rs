use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{RepositoryError, RestaurantRepository};
use crate::models::{Restaurant, RestaurantPatch};

/// In-memory restaurant store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryRestaurants {
    rows: DashMap<Uuid, Restaurant>,
}

impl MemoryRestaurants {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_project_free(
        &self,
        project_id: Option<&str>,
        except: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let Some(project_id) = project_id else {
            return Ok(());
        };
        let taken = self.rows.iter().any(|entry| {
            Some(entry.id) != except && entry.linked_project_id.as_deref() == Some(project_id)
        });
        if taken {
            return Err(RepositoryError::Conflict(
                "A restaurant is already linked to this project".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RestaurantRepository for MemoryRestaurants {
    async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let mut rows: Vec<Restaurant> = self.rows.iter().map(|e| e.value().clone()).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, RepositoryError> {
        Ok(self.rows.get(&id).map(|e| e.value().clone()))
    }

    async fn find_by_project_id(
        &self,
        project_id: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        Ok(self
            .rows
            .iter()
            .find(|e| e.linked_project_id.as_deref() == Some(project_id))
            .map(|e| e.value().clone()))
    }

    async fn find_expiring(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        let mut rows: Vec<Restaurant> = self
            .rows
            .iter()
            .filter(|e| e.is_active && e.contact_email.is_some())
            .filter(|e| {
                e.subscription_end
                    .is_some_and(|end| end >= from && end <= to)
            })
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|r| r.subscription_end);
        Ok(rows)
    }

    async fn insert(&self, restaurant: Restaurant) -> Result<Restaurant, RepositoryError> {
        self.ensure_project_free(restaurant.linked_project_id.as_deref(), None)?;
        self.rows.insert(restaurant.id, restaurant.clone());
        Ok(restaurant)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: RestaurantPatch,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        if let Some(Some(ref project_id)) = patch.linked_project_id {
            self.ensure_project_free(Some(project_id), Some(id))?;
        }
        let Some(mut entry) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(entry.value_mut());
        Ok(Some(entry.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.rows.remove(&id).is_some())
    }
}
