//! Account administration routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::routes::sales::DateRangeQuery;
use crate::AppState;
use caja_core::filter::UserFilter;
use caja_core::pagination::{Page, PageRequest};
use caja_core::report::{CashierStats, SaleRow};
use caja_core::{NewUser, PasswordChange, User, UserChanges};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/search", get(search_users))
        .route("/users/cashiers/active", get(active_cashiers))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/toggle-active", patch(toggle_active))
        .route("/users/{id}/password", patch(change_password))
        .route("/users/{id}/sales-stats", get(sales_stats))
        .route("/users/{id}/sales", get(user_sales))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /users
async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<UserFilter>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<User>>> {
    Ok(Json(state.accounts.list_users(&auth.requester(), filter, &page).await?))
}

/// GET /users/search?q=
async fn search_users(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.accounts.search_users(&auth.requester(), &query.q).await?))
}

/// GET /users/cashiers/active
async fn active_cashiers(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.accounts.active_cashiers(&auth.requester()).await?))
}

/// POST /users
async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.accounts.create_user(&auth.requester(), input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.get_user(&auth.requester(), &id).await?))
}

/// PUT /users/{id}
async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<UserChanges>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.update_user(&auth.requester(), &id, changes).await?))
}

/// DELETE /users/{id}
///
/// Deactivates the account; sales history keeps its cashier.
async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.deactivate_user(&auth.requester(), &id).await?))
}

/// PATCH /users/{id}/toggle-active
async fn toggle_active(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.toggle_active(&auth.requester(), &id).await?))
}

/// PATCH /users/{id}/password
async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(change): ApiJson<PasswordChange>,
) -> ApiResult<StatusCode> {
    state
        .accounts
        .change_password(&auth.requester(), &id, change)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/{id}/sales-stats
async fn sales_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> ApiResult<Json<CashierStats>> {
    let stats = state
        .reports
        .cashier_stats(&auth.requester(), &id, query.start_date, query.end_date)
        .await?;
    Ok(Json(stats))
}

/// GET /users/{id}/sales
async fn user_sales(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<SaleRow>>> {
    Ok(Json(state.workflow.sales_of_user(&auth.requester(), &id, &page).await?))
}
