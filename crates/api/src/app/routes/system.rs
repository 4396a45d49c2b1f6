use axum::{extract::Extension, response::IntoResponse, Json};

use quartermaster_auth::CallerContext;

/// Liveness probe; answers without identity.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Echo the resolved caller identity.
pub async fn whoami(Extension(caller): Extension<CallerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": caller.user_id.to_string(),
        "role": caller.role.as_str(),
        "base_id": caller.home_base.map(|b| b.to_string()),
    }))
}
