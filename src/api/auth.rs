//! Caller identity extraction.
//!
//! Token issuance and verification live outside this service; by the time a
//! request gets here the gateway has resolved the caller and forwarded the
//! user id in the `x-user-id` header. Anything missing or malformed is
//! rejected with 401 before a handler runs.

use crate::domain::UserId;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, available to any handler as an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or(AppError::Unauthenticated)?;

        Ok(AuthUser(UserId::new(id)))
    }
}
