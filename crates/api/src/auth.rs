//! Caller identity taken from request headers.
//!
//! Authentication itself happens upstream; this layer trusts `x-user-id`
//! and `x-user-role` as set by the gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::{Identity, Role, UserId};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller of a request.
///
/// A missing role header means `customer`.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER)?
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        let id = UserId::parse(id.trim())
            .map_err(|e| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER}: {e}")))?;

        let role = match header(parts, USER_ROLE_HEADER)? {
            Some(role) => role.parse::<Role>().map_err(ApiError::BadRequest)?,
            None => Role::Customer,
        };

        Ok(Caller(Identity { id, role }))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    parts
        .headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| ApiError::BadRequest(format!("{name} is not valid text")))
        })
        .transpose()
}
