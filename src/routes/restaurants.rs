use std::sync::LazyLock;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AdminUser;
use crate::dashboard;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{NewRestaurant, Plan, Restaurant, RestaurantPatch};
use crate::state::SharedState;
use crate::subscription::status::{classify, Phase};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct SetActive {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct ExtendSubscription {
    pub plan: Plan,
}

/// A restaurant together with its derived dashboard status.
#[derive(Serialize)]
pub struct RestaurantView {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub status: Phase,
}

impl RestaurantView {
    fn of(restaurant: Restaurant, now: DateTime<Utc>) -> Self {
        let status = classify(&restaurant, now);
        Self { restaurant, status }
    }
}

pub async fn list(
    _admin: AdminUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<RestaurantView>>, AppError> {
    let phase = match params.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(other) => Some(
            Phase::parse(other)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status filter: {other}")))?,
        ),
    };

    let now = Utc::now();
    let restaurants = state.restaurants.list().await?;
    let filtered = dashboard::filter(restaurants, params.search.as_deref(), phase, now);

    Ok(Json(
        filtered
            .into_iter()
            .map(|r| RestaurantView::of(r, now))
            .collect(),
    ))
}

pub async fn create(
    admin: AdminUser,
    State(state): State<SharedState>,
    Json(mut req): Json<NewRestaurant>,
) -> Result<Json<RestaurantView>, AppError> {
    req.name = validate_name(&req.name)?;
    req.domain = normalize(req.domain);
    req.contact_email = validate_email(normalize(req.contact_email))?;
    req.contact_phone = normalize(req.contact_phone);
    req.notes = normalize(req.notes);
    req.linked_project_id = normalize(req.linked_project_id);

    let restaurant = state
        .restaurants
        .insert(req.into_restaurant(Utc::now()))
        .await?;

    audit::log_event(
        &admin,
        "created",
        restaurant.id,
        Some(json!({ "name": &restaurant.name })),
    );

    Ok(Json(RestaurantView::of(restaurant, Utc::now())))
}

pub async fn get(
    _admin: AdminUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RestaurantView>, AppError> {
    let restaurant = state
        .restaurants
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".to_string()))?;
    Ok(Json(RestaurantView::of(restaurant, Utc::now())))
}

pub async fn update(
    admin: AdminUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(mut patch): Json<RestaurantPatch>,
) -> Result<Json<RestaurantView>, AppError> {
    if let Some(ref name) = patch.name {
        patch.name = Some(validate_name(name)?);
    }
    patch.domain = patch.domain.map(normalize);
    patch.contact_email = patch
        .contact_email
        .map(|email| validate_email(normalize(email)))
        .transpose()?;
    patch.contact_phone = patch.contact_phone.map(normalize);
    patch.notes = patch.notes.map(normalize);
    patch.linked_project_id = patch.linked_project_id.map(normalize);

    let restaurant = apply(&state, id, patch).await?;
    audit::log_event(&admin, "updated", id, None);
    Ok(Json(RestaurantView::of(restaurant, Utc::now())))
}

pub async fn set_active(
    admin: AdminUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetActive>,
) -> Result<Json<RestaurantView>, AppError> {
    let restaurant = apply(&state, id, RestaurantPatch::activation(req.is_active)).await?;

    let action = if req.is_active { "activated" } else { "deactivated" };
    audit::log_event(&admin, action, id, None);

    Ok(Json(RestaurantView::of(restaurant, Utc::now())))
}

pub async fn extend(
    admin: AdminUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ExtendSubscription>,
) -> Result<Json<RestaurantView>, AppError> {
    let patch = RestaurantPatch::extension(req.plan, Utc::now());
    let restaurant = apply(&state, id, patch).await?;

    audit::log_event(
        &admin,
        "extended",
        id,
        Some(json!({
            "plan": req.plan.as_str(),
            "subscription_end": restaurant.subscription_end,
        })),
    );

    Ok(Json(RestaurantView::of(restaurant, Utc::now())))
}

pub async fn delete(
    admin: AdminUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.restaurants.delete(id).await? {
        return Err(AppError::NotFound("Restaurant not found".to_string()));
    }

    audit::log_event(&admin, "deleted", id, None);

    Ok(Json(json!({ "message": "Deleted" })))
}

async fn apply(
    state: &SharedState,
    id: Uuid,
    patch: RestaurantPatch,
) -> Result<Restaurant, AppError> {
    state
        .restaurants
        .update(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".to_string()))
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Restaurant name is required".to_string()));
    }
    if name.len() > 200 {
        return Err(AppError::BadRequest(
            "Restaurant name must be at most 200 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_email(email: Option<String>) -> Result<Option<String>, AppError> {
    match email {
        Some(ref e) if !EMAIL_RE.is_match(e) => Err(AppError::BadRequest(
            "Contact email is not a valid email address".to_string(),
        )),
        other => Ok(other),
    }
}

/// Blank optional text is stored as null.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
