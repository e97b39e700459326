//! Catalog routes. Reads for every signed-in user, writes for ADMIN.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::AppState;
use caja_core::filter::ProductFilter;
use caja_core::pagination::{Page, PageRequest};
use caja_core::{NewProduct, Product, ProductChanges};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/low-stock", get(low_stock))
        .route("/products/code/{code}", get(get_by_code))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/stock", patch(set_stock))
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub stock: i64,
}

/// GET /products
async fn list_products(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(filter): ApiQuery<ProductFilter>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(state.catalog.list(filter, &page).await?))
}

/// GET /products/low-stock
async fn low_stock(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<LowStockQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let threshold = query.threshold.unwrap_or(state.config.low_stock_threshold);
    Ok(Json(state.catalog.low_stock(threshold).await?))
}

/// GET /products/code/{code}
async fn get_by_code(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.catalog.get_by_code(&code).await?))
}

/// GET /products/{id}
async fn get_product(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.catalog.get(&id).await?))
}

/// POST /products
async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.catalog.create(&auth.requester(), input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id}
async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.catalog.update(&auth.requester(), &id, changes).await?))
}

/// DELETE /products/{id}
async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.catalog.delete(&auth.requester(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /products/{id}/stock
async fn set_stock(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<StockUpdate>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.catalog.set_stock(&auth.requester(), &id, update.stock).await?))
}
