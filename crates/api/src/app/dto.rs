use core::str::FromStr;

use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Deserialize;

use quartermaster_assignments::Assignment;
use quartermaster_purchasing::Purchase;
use quartermaster_transfers::Transfer;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub base_id: String,
    pub equipment_type_id: String,
    pub quantity: u32,
    pub unit_cost: Option<u64>,
    pub purchase_date: String, // YYYY-MM-DD
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePurchaseRequest {
    pub unit_cost: Option<u64>,
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub asset_id: String,
    pub from_base_id: String,
    pub to_base_id: String,
    /// Defaults to 1; the ledger moves one asset per transfer.
    pub quantity: Option<u32>,
    pub transfer_date: String, // YYYY-MM-DD
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub asset_id: String,
    pub assigned_to: String,
    pub assignment_date: String, // YYYY-MM-DD
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseListQuery {
    pub base_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub equipment_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferListQuery {
    pub base_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentListQuery {
    pub base_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub base_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub equipment_type: Option<String>,
}

// -------------------------
// Parse helpers
// -------------------------

/// Parse a path or query id, mapping failure to a 400 naming the field.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.trim().parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what}"))
    })
}

pub fn parse_opt_id<T: FromStr>(
    raw: Option<&str>,
    what: &str,
) -> Result<Option<T>, axum::response::Response> {
    raw.map(|s| parse_id(s, what)).transpose()
}

/// Parse a `YYYY-MM-DD` business date.
pub fn parse_date(raw: &str, what: &str) -> Result<NaiveDate, axum::response::Response> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_date",
            format!("{what} must be YYYY-MM-DD"),
        )
    })
}

pub fn parse_opt_date(
    raw: Option<&str>,
    what: &str,
) -> Result<Option<NaiveDate>, axum::response::Response> {
    raw.map(|s| parse_date(s, what)).transpose()
}

/// Parse an optional status filter into its typed enum.
pub fn parse_opt_status<T: FromStr>(
    raw: Option<&str>,
    what: &str,
) -> Result<Option<T>, axum::response::Response> {
    match raw {
        Some(s) => s.trim().parse().map(Some).map_err(|_| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_status",
                format!("invalid {what}"),
            )
        }),
        None => Ok(None),
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn purchase_to_json(p: Purchase) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "base_id": p.base.to_string(),
        "equipment_type_id": p.equipment_type.to_string(),
        "quantity": p.quantity,
        "unit_cost": p.unit_cost,
        "total_cost": p.total_cost,
        "purchase_date": p.purchase_date.to_string(),
        "vendor": p.vendor,
        "notes": p.notes,
        "created_by": p.created_by.to_string(),
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.map(|t| t.to_rfc3339()),
    })
}

pub fn transfer_to_json(t: Transfer) -> serde_json::Value {
    serde_json::json!({
        "id": t.id.to_string(),
        "asset_id": t.asset.to_string(),
        "from_base_id": t.from_base.to_string(),
        "to_base_id": t.to_base.to_string(),
        "quantity": t.quantity,
        "status": t.status.as_str(),
        "transfer_date": t.transfer_date.to_string(),
        "requested_by": t.requested_by.to_string(),
        "approved_by": t.approved_by.map(|u| u.to_string()),
        "notes": t.notes,
        "created_at": t.created_at.to_rfc3339(),
        "completed_at": t.completed_at.map(|t| t.to_rfc3339()),
    })
}

pub fn assignment_to_json(a: Assignment) -> serde_json::Value {
    serde_json::json!({
        "id": a.id.to_string(),
        "asset_id": a.asset.to_string(),
        "assigned_to": a.assigned_to.to_string(),
        "base_id": a.base.to_string(),
        "assigned_by": a.assigned_by.to_string(),
        "assignment_date": a.assignment_date.to_string(),
        "return_date": a.return_date.map(|d| d.to_string()),
        "status": a.status.as_str(),
        "notes": a.notes,
        "created_at": a.created_at.to_rfc3339(),
    })
}
