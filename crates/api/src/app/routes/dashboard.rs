use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use quartermaster_auth::CallerContext;
use quartermaster_infra::workflows::MetricsQuery;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/movement-details", get(movement_details))
}

pub async fn metrics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::DashboardQuery>,
) -> axum::response::Response {
    let query = match metrics_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.metrics.dashboard(&caller, query).await {
        Ok(metrics) => (StatusCode::OK, Json(metrics)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn movement_details(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::DashboardQuery>,
) -> axum::response::Response {
    let query = match metrics_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.metrics.movement_details(&caller, query).await {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn metrics_query(query: dto::DashboardQuery) -> Result<MetricsQuery, axum::response::Response> {
    Ok(MetricsQuery {
        base: dto::parse_opt_id(query.base_id.as_deref(), "base_id")?,
        start: dto::parse_opt_date(query.start_date.as_deref(), "start_date")?,
        end: dto::parse_opt_date(query.end_date.as_deref(), "end_date")?,
        equipment_type: query.equipment_type,
    })
}
