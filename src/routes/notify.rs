use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::auth::extractor::AdminUser;
use crate::state::SharedState;

/// Run the expiry notification job once, on demand.
pub async fn send_expiry_notifications(
    admin: AdminUser,
    State(state): State<SharedState>,
) -> Response {
    let Some(job) = state.notification_job() else {
        tracing::error!("Expiry notifications requested but no mail transport is configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Email transport is not configured" })),
        )
            .into_response();
    };

    tracing::info!("Expiry notification run triggered by {}", admin.subject);

    match job.run(Utc::now()).await {
        Ok(report) => {
            tracing::info!(
                "Expiry notification run finished: {} processed, {} sent, {} failed",
                report.processed,
                report.sent(),
                report.failed()
            );
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "processed": report.processed,
                    "results": report.results,
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Error in expiry notification run: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
