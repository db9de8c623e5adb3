use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Acting user resolved from the `x-user-id` header set by the API gateway.
///
/// Add this as a handler parameter to require an acting user. Whether the
/// actor may touch a given project is decided by membership resolution in the
/// workflow, not here.
#[derive(Debug, Clone, Copy)]
pub struct ActorId(pub i64);

impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::ActorMissing)?;

        raw.trim()
            .parse::<i64>()
            .map(ActorId)
            .map_err(|_| AppError::ActorInvalid)
    }
}
