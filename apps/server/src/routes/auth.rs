//! Authentication routes for login, registration and the caller's profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, AuthUser};
use crate::AppState;
use caja_core::{Credentials, NewUser, User};

/// Public auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
}

/// Auth routes that need a token.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(profile))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

impl AuthResponse {
    fn issue(state: &AppState, user: User) -> ApiResult<Self> {
        Ok(AuthResponse {
            token: state.jwt.issue(&user)?,
            token_type: "Bearer",
            expires_in: state.jwt.lifetime_secs(),
            user,
        })
    }
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state.accounts.login(credentials).await?;
    Ok(Json(AuthResponse::issue(&state, user)?))
}

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = state.accounts.register(input).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::issue(&state, user)?)))
}

/// GET /auth/profile
async fn profile(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<User>> {
    let user = state.accounts.get_user(&auth.requester(), auth.user_id()).await?;
    Ok(Json(user))
}
