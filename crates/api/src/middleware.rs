use axum::{http::StatusCode, middleware::Next, response::Response};

use crate::app::errors;
use crate::context;

/// Resolve the caller identity and stash it in request extensions.
///
/// Requests with missing or malformed identity headers are rejected with 401
/// before any handler runs. Authorization decisions stay in the workflows;
/// this layer only establishes who is calling.
pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let caller = context::identity_from_headers(req.headers()).map_err(|e| {
        errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string())
    })?;

    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}
