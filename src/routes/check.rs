use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::client_ip;
use crate::db::RepositoryError;
use crate::state::SharedState;
use crate::subscription::validation::{ValidationError, Verdict};

const RATE_WINDOW_SECS: u64 = 60;

/// Entitlement check called by deployed restaurant instances.
pub async fn check_subscription(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ip = client_ip::resolve(&headers, addr.ip(), &state.config.trusted_proxies);
    if let Err(retry_after) =
        state
            .check_limiter
            .check(ip, state.config.check_rate_limit, RATE_WINDOW_SECS)
    {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(json!({ "valid": false, "error": "Too many requests" })),
        )
            .into_response();
    }

    let payload: Option<Value> = serde_json::from_slice(&body).ok();
    let project_id = payload
        .as_ref()
        .and_then(|p| p.get("project_id"))
        .and_then(Value::as_str);

    match state.validator.validate(project_id, Utc::now()).await {
        Ok(verdict) => (StatusCode::OK, Json(verdict_body(&verdict))).into_response(),
        Err(err) => error_response(err),
    }
}

fn verdict_body(verdict: &Verdict) -> Value {
    match verdict {
        Verdict::Trial { days_remaining } => json!({
            "valid": true,
            "status": verdict.status(),
            "days_remaining": days_remaining,
        }),
        Verdict::Active {
            plan,
            days_remaining,
            expires_at,
        } => json!({
            "valid": true,
            "status": verdict.status(),
            "plan": plan,
            "days_remaining": days_remaining,
            "expires_at": expires_at,
        }),
        Verdict::Deactivated | Verdict::TrialExpired | Verdict::Expired => json!({
            "valid": false,
            "status": verdict.status(),
            "message": verdict.message(),
        }),
    }
}

fn error_response(err: ValidationError) -> Response {
    let (status, body) = match err {
        ValidationError::MissingProjectId => (
            StatusCode::BAD_REQUEST,
            json!({ "valid": false, "error": "Missing project_id" }),
        ),
        ValidationError::NotFound => (
            StatusCode::NOT_FOUND,
            json!({
                "valid": false,
                "error": "Restaurant not found",
                "message": "This restaurant is not registered.",
            }),
        ),
        ValidationError::Repository(RepositoryError::Timeout(limit)) => {
            tracing::error!("Subscription lookup timed out after {}s", limit.as_secs());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "valid": false, "error": "Internal server error" }),
            )
        }
        ValidationError::Repository(e) => {
            tracing::error!("Subscription lookup failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "valid": false, "error": "Database error" }),
            )
        }
    };
    (status, Json(body)).into_response()
}
