use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use quartermaster_core::{ConflictKind, DomainError};

/// Map a domain failure onto the wire.
///
/// Conflicts on records the caller may not even know exist (a processed
/// transfer, a returned assignment) answer 404, matching the wording the
/// domain errors already carry. Storage failures log the cause and answer
/// with a generic body.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "forbidden", "access denied"),
        DomainError::Conflict(kind) => {
            let status = match kind {
                ConflictKind::AssetNotAvailable | ConflictKind::AssetNotTransferable => {
                    StatusCode::BAD_REQUEST
                }
                ConflictKind::TransferAlreadyProcessed
                | ConflictKind::AssignmentAlreadyReturned => StatusCode::NOT_FOUND,
            };
            json_error(status, "conflict", kind.to_string())
        }
        DomainError::NotFound(entity) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
        }
        DomainError::Persistence(cause) => {
            tracing::error!(%cause, "storage failure while serving a request");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "storage failure",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
