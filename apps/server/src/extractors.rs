//! Request extractors.
//!
//! Wrappers around axum's `Json`, `Query` and `Path` that reject with an
//! [`ApiError`], so a malformed request gets the same error body as every
//! other failure.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;

use crate::auth::Claims;
use crate::error::ApiError;
use caja_core::Requester;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Extractor for the authenticated caller.
///
/// Only valid behind [`auth_middleware`](crate::middleware::auth::auth_middleware),
/// which puts the decoded [`Claims`] into the request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.0.sub
    }

    pub fn requester(&self) -> Requester {
        self.0.requester()
    }

    pub fn claims(&self) -> &Claims {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}
