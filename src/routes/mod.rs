pub mod check;
pub mod dashboard;
pub mod notify;
pub mod restaurants;

use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Restaurants
        .route(
            "/api/v1/restaurants",
            get(restaurants::list).post(restaurants::create),
        )
        .route(
            "/api/v1/restaurants/{id}",
            get(restaurants::get)
                .put(restaurants::update)
                .delete(restaurants::delete),
        )
        .route("/api/v1/restaurants/{id}/active", put(restaurants::set_active))
        .route("/api/v1/restaurants/{id}/extend", post(restaurants::extend))
        // Dashboard
        .route("/api/v1/dashboard/stats", get(dashboard::stats))
        .route("/api/v1/dashboard/trends", get(dashboard::trends))
}

/// Endpoints called from outside the dashboard. Open to every origin.
pub fn function_routes() -> Router<SharedState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/v1/check-subscription", post(check::check_subscription))
        .route(
            "/v1/send-expiry-notification",
            post(notify::send_expiry_notifications),
        )
        .layer(cors)
}
