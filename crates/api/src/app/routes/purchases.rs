use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use quartermaster_auth::CallerContext;
use quartermaster_core::{BaseId, EquipmentTypeId, PurchaseId};
use quartermaster_infra::ledger_store::PurchaseFilter;
use quartermaster_purchasing::{NewPurchase, PurchasePatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_purchase).get(list_purchases))
        .route("/:id", get(get_purchase).put(update_purchase))
}

pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::CreatePurchaseRequest>,
) -> axum::response::Response {
    let base: BaseId = match dto::parse_id(&body.base_id, "base_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let equipment_type: EquipmentTypeId =
        match dto::parse_id(&body.equipment_type_id, "equipment_type_id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
    let purchase_date = match dto::parse_date(&body.purchase_date, "purchase_date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let input = NewPurchase {
        base,
        equipment_type,
        quantity: body.quantity,
        unit_cost: body.unit_cost,
        purchase_date,
        vendor: body.vendor,
        notes: body.notes,
    };

    match services.purchases.create(&caller, input).await {
        Ok(purchase) => (StatusCode::CREATED, Json(dto::purchase_to_json(purchase))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseId = match dto::parse_id(&id, "purchase id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.purchases.get(&caller, id).await {
        Ok(purchase) => (StatusCode::OK, Json(dto::purchase_to_json(purchase))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePurchaseRequest>,
) -> axum::response::Response {
    let id: PurchaseId = match dto::parse_id(&id, "purchase id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let patch = PurchasePatch {
        unit_cost: body.unit_cost,
        vendor: body.vendor,
        notes: body.notes,
    };

    match services.purchases.update(&caller, id, patch).await {
        Ok(purchase) => (StatusCode::OK, Json(dto::purchase_to_json(purchase))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::PurchaseListQuery>,
) -> axum::response::Response {
    let base = match dto::parse_opt_id(query.base_id.as_deref(), "base_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let start = match dto::parse_opt_date(query.start_date.as_deref(), "start_date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let end = match dto::parse_opt_date(query.end_date.as_deref(), "end_date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let filter = PurchaseFilter {
        base,
        start,
        end,
        equipment_type: query.equipment_type,
    };

    match services.purchases.list(&caller, filter).await {
        Ok(purchases) => {
            let items = purchases
                .into_iter()
                .map(dto::purchase_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
