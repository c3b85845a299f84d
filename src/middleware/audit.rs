use uuid::Uuid;

use crate::auth::extractor::AdminUser;

/// Record an administrator mutation. Called explicitly in handlers after the
/// change has been persisted.
pub fn log_event(
    admin: &AdminUser,
    action: &str,
    resource_id: Uuid,
    details: Option<serde_json::Value>,
) {
    let details = details.map(|d| d.to_string()).unwrap_or_default();
    tracing::info!(
        target: "audit",
        actor = %admin.subject,
        action,
        resource_type = "restaurant",
        %resource_id,
        details = %details,
        "restaurant {action}"
    );
}
