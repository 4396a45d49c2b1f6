use axum::{routing::get, Router};

pub mod assignments;
pub mod dashboard;
pub mod purchases;
pub mod system;
pub mod transfers;

/// Router for all authenticated endpoints, mounted under `/api`.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/purchases", purchases::router())
        .nest("/transfers", transfers::router())
        .nest("/assignments", assignments::router())
        .nest("/dashboard", dashboard::router())
}
