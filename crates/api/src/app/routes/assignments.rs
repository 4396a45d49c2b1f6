use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};

use quartermaster_assignments::{AssignmentStatus, NewAssignment};
use quartermaster_auth::CallerContext;
use quartermaster_core::{AssetId, AssignmentId, UserId};
use quartermaster_infra::ledger_store::AssignmentFilter;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_assignment).get(list_assignments))
        .route("/:id/return", put(return_assignment))
}

pub async fn create_assignment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::CreateAssignmentRequest>,
) -> axum::response::Response {
    let asset: AssetId = match dto::parse_id(&body.asset_id, "asset_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let assigned_to: UserId = match dto::parse_id(&body.assigned_to, "assigned_to") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let assignment_date = match dto::parse_date(&body.assignment_date, "assignment_date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let input = NewAssignment {
        asset,
        assigned_to,
        assignment_date,
        notes: body.notes,
    };

    match services.assignments.create(&caller, input).await {
        Ok(assignment) => {
            (StatusCode::CREATED, Json(dto::assignment_to_json(assignment))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn return_assignment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AssignmentId = match dto::parse_id(&id, "assignment id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.assignments.return_asset(&caller, id).await {
        Ok(assignment) => {
            (StatusCode::OK, Json(dto::assignment_to_json(assignment))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_assignments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::AssignmentListQuery>,
) -> axum::response::Response {
    let base = match dto::parse_opt_id(query.base_id.as_deref(), "base_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status: Option<AssignmentStatus> =
        match dto::parse_opt_status(query.status.as_deref(), "assignment status") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

    let filter = AssignmentFilter { base, status };

    match services.assignments.list(&caller, filter).await {
        Ok(assignments) => {
            let items = assignments
                .into_iter()
                .map(dto::assignment_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
