//! Sale routes: ringing up, listing and canceling sales, plus the reports
//! built from them.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::AppState;
use caja_core::filter::SaleFilter;
use caja_core::order::{CancelSale, NewSale};
use caja_core::pagination::{Page, PageRequest};
use caja_core::report::{
    CashierStats, DailySummary, ProductStat, RangeReport, SaleRow, TodaySales, TopProductsBy,
};
use caja_core::SaleDetail;
use caja_db::report::{optional_range, required_range};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales).post(create_sale))
        .route("/sales/report/sales", get(range_report))
        .route("/sales/today/sales", get(today_sales))
        .route("/sales/summary/daily", get(daily_summary))
        .route("/sales/cashier/{id}", get(cashier_stats))
        .route("/sales/top-products", get(top_products))
        .route("/sales/export/csv", get(export_csv))
        .route("/sales/{id}", get(get_sale))
        .route("/sales/{id}/cancel", patch(cancel_sale))
}

/// `startDate` / `endDate` pair from the query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuery {
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
    pub cashier_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub by: TopProductsBy,
    pub limit: Option<u32>,
}

/// POST /sales
async fn create_sale(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<NewSale>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let detail = state.workflow.create_sale(&auth.requester(), request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /sales
async fn list_sales(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<SaleFilter>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<SaleRow>>> {
    Ok(Json(state.workflow.list_sales(&auth.requester(), filter, &page).await?))
}

/// GET /sales/{id}
async fn get_sale(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<SaleDetail>> {
    Ok(Json(state.workflow.get_sale(&auth.requester(), &id).await?))
}

/// PATCH /sales/{id}/cancel
///
/// The body is optional; `{"reason": "..."}` when present.
async fn cancel_sale(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    body: Bytes,
) -> ApiResult<Json<SaleDetail>> {
    let request: CancelSale = if body.iter().all(u8::is_ascii_whitespace) {
        CancelSale::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    Ok(Json(state.workflow.cancel_sale(&auth.requester(), &id, request).await?))
}

/// GET /sales/report/sales
async fn range_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> ApiResult<Json<RangeReport>> {
    let range = required_range(query.start_date, query.end_date)?;
    Ok(Json(state.reports.range_report(&auth.requester(), range).await?))
}

/// GET /sales/today/sales
async fn today_sales(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<TodaySales>> {
    Ok(Json(state.reports.today(&auth.requester()).await?))
}

/// GET /sales/summary/daily
async fn daily_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<DailyQuery>,
) -> ApiResult<Json<DailySummary>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = state
        .reports
        .daily_summary(&auth.requester(), date, query.cashier_id)
        .await?;
    Ok(Json(summary))
}

/// GET /sales/cashier/{id}
async fn cashier_stats(
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

/// GET /sales/top-products
async fn top_products(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TopProductsQuery>,
) -> ApiResult<Json<Vec<ProductStat>>> {
    let range = optional_range(query.start_date, query.end_date)?;
    let products = state
        .reports
        .top_products(&auth.requester(), range, query.by, query.limit)
        .await?;
    Ok(Json(products))
}

/// GET /sales/export/csv
async fn export_csv(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<SaleFilter>,
) -> ApiResult<impl IntoResponse> {
    let csv = state.reports.export_csv(&auth.requester(), filter).await?;
    let filename = format!("attachment; filename=\"ventas-{}.csv\"", Utc::now().format("%Y%m%d"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}
