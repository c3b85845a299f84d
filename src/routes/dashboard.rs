use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::auth::extractor::AdminUser;
use crate::dashboard::{self, Stats, TrendPoint};
use crate::error::AppError;
use crate::state::SharedState;

pub async fn stats(
    _admin: AdminUser,
    State(state): State<SharedState>,
) -> Result<Json<Stats>, AppError> {
    let restaurants = state.restaurants.list().await?;
    Ok(Json(dashboard::stats(&restaurants, Utc::now())))
}

pub async fn trends(
    _admin: AdminUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    let restaurants = state.restaurants.list().await?;
    Ok(Json(dashboard::trends(&restaurants, Utc::now())))
}
