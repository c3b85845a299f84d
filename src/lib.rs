pub mod auth;
pub mod client_ip;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod email;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod subscription;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::RestaurantRepository;
use crate::email::Mailer;
use crate::state::{AppState, SharedState};

pub fn build_app(
    config: Config,
    restaurants: Arc<dyn RestaurantRepository>,
    mailer: Option<Arc<dyn Mailer>>,
) -> (Router, SharedState) {
    let max_body_size = config.max_body_size;
    let state: SharedState = Arc::new(AppState::new(config, restaurants, mailer));

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(routes::function_routes())
        .route("/health", axum::routing::get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
