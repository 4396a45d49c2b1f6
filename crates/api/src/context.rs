use core::net::IpAddr;
use core::str::FromStr;

use axum::http::{HeaderMap, HeaderValue};
use thiserror::Error;

use quartermaster_auth::{CallerContext, Role};
use quartermaster_core::{BaseId, UserId};

/// Identity headers set by the session terminator in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const BASE_HEADER: &str = "x-base-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Why a request carries no usable identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("missing {0} header")]
    Missing(&'static str),
    #[error("malformed {0} header")]
    Malformed(&'static str),
}

/// Build the caller identity from the forwarded headers.
///
/// `x-user-id` and `x-user-role` are mandatory; `x-base-id` is optional
/// because admins may carry no home base. The origin address comes from the
/// first `x-forwarded-for` hop when one parses; a garbled hop is dropped
/// rather than rejected, since the origin only feeds audit records.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<CallerContext, IdentityError> {
    let user_id: UserId = parse_required(headers, USER_ID_HEADER)?;
    let role: Role = parse_required(headers, ROLE_HEADER)?;
    let home_base: Option<BaseId> = match headers.get(BASE_HEADER) {
        Some(value) => Some(parse_value(value, BASE_HEADER)?),
        None => None,
    };

    let mut caller = CallerContext::new(user_id, role, home_base);
    if let Some(origin) = forwarded_origin(headers) {
        caller = caller.with_origin(origin);
    }
    Ok(caller)
}

fn parse_required<T: FromStr>(headers: &HeaderMap, name: &'static str) -> Result<T, IdentityError> {
    let value = headers.get(name).ok_or(IdentityError::Missing(name))?;
    parse_value(value, name)
}

fn parse_value<T: FromStr>(value: &HeaderValue, name: &'static str) -> Result<T, IdentityError> {
    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or(IdentityError::Malformed(name))
}

fn forwarded_origin(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(FORWARDED_FOR_HEADER)?.to_str().ok()?;
    value.split(',').next()?.trim().parse().ok()
}
