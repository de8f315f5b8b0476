//! Caller identity extractor
//!
//! Reads the caller's user id from the `X-USER-ID` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use engage_core::UserId;

use crate::response::ApiError;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identified by the `X-USER-ID` header
#[derive(Debug, Clone, Copy)]
pub struct CallerId {
    pub user_id: UserId,
}

impl CallerId {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(ApiError::MissingIdentity)?
            .to_str()
            .map_err(|_| ApiError::InvalidIdentity("header is not valid ASCII".to_string()))?;

        let user_id = UserId::parse(raw).map_err(|e| {
            tracing::debug!(error = %e, "Rejected caller identity");
            ApiError::InvalidIdentity(e.to_string())
        })?;

        Ok(CallerId::new(user_id))
    }
}
