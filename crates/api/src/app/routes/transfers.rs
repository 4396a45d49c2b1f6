use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use quartermaster_auth::CallerContext;
use quartermaster_core::{AssetId, BaseId, TransferId};
use quartermaster_infra::ledger_store::TransferFilter;
use quartermaster_transfers::{NewTransfer, TransferStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(request_transfer).get(list_transfers))
        .route("/:id", get(get_transfer))
        .route("/:id/approve", put(approve_transfer))
        .route("/:id/cancel", put(cancel_transfer))
}

pub async fn request_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::CreateTransferRequest>,
) -> axum::response::Response {
    let asset: AssetId = match dto::parse_id(&body.asset_id, "asset_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let from_base: BaseId = match dto::parse_id(&body.from_base_id, "from_base_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let to_base: BaseId = match dto::parse_id(&body.to_base_id, "to_base_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let transfer_date = match dto::parse_date(&body.transfer_date, "transfer_date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let input = NewTransfer {
        asset,
        from_base,
        to_base,
        quantity: body.quantity.unwrap_or(1),
        transfer_date,
        notes: body.notes,
    };

    match services.transfers.request(&caller, input).await {
        Ok(transfer) => (StatusCode::CREATED, Json(dto::transfer_to_json(transfer))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransferId = match dto::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transfers.get(&caller, id).await {
        Ok(transfer) => (StatusCode::OK, Json(dto::transfer_to_json(transfer))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn approve_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransferId = match dto::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transfers.approve(&caller, id).await {
        Ok(transfer) => (StatusCode::OK, Json(dto::transfer_to_json(transfer))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn cancel_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransferId = match dto::parse_id(&id, "transfer id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transfers.cancel(&caller, id).await {
        Ok(transfer) => (StatusCode::OK, Json(dto::transfer_to_json(transfer))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::TransferListQuery>,
) -> axum::response::Response {
    let base = match dto::parse_opt_id(query.base_id.as_deref(), "base_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status: Option<TransferStatus> =
        match dto::parse_opt_status(query.status.as_deref(), "transfer status") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

    let filter = TransferFilter { base, status };

    match services.transfers.list(&caller, filter).await {
        Ok(transfers) => {
            let items = transfers
                .into_iter()
                .map(dto::transfer_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
