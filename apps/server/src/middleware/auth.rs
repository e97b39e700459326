//! Authentication middleware for protected routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::auth::extract_bearer_token;
use crate::error::ApiError;
use crate::AppState;

/// Validates the bearer token and stores its claims in the request
/// extensions for [`AuthUser`](crate::extractors::AuthUser).
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::Unauthorized("Authorization header with Bearer token is required".to_string())
            .into_response();
    };

    match state.jwt.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            ApiError::from(e).into_response()
        }
    }
}
