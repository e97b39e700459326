//! # Report Service
//!
//! Loads committed sales and hands them to the pure aggregations in
//! [`caja_core::report`]. Read-only.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::error::{DbError, ServiceResult};
use crate::pool::Database;
use caja_core::filter::{validate_day, DateRange, SaleFilter};
use caja_core::policy::{self, require, Requester};
use caja_core::report::{
    sales_csv, CashierStats, DailySummary, ProductStat, RangeReport, TodaySales, TopProductsBy,
};
use caja_core::{CoreError, SaleStatus, ValidationError};

pub const DEFAULT_TOP_PRODUCTS: u32 = 10;
pub const MAX_TOP_PRODUCTS: u32 = 100;

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService { db }
    }

    /// One day's completed sales, optionally for a single cashier.
    pub async fn daily_summary(
        &self,
        requester: &Requester,
        date: NaiveDate,
        cashier_id: Option<String>,
    ) -> ServiceResult<DailySummary> {
        require(policy::can_view_reports(requester), "reports need ADMIN")?;
        validate_day("date", date)?;
        debug!(%date, ?cashier_id, "Building daily summary");

        let filter = SaleFilter {
            cashier_id,
            status: Some(SaleStatus::Completed),
            ..SaleFilter::for_range(DateRange::single_day(date))
        };
        let rows = self.db.sales().rows(&filter).await?;
        let lines = self.db.sales().lines_matching(&filter).await?;

        Ok(DailySummary::build(date, rows, &lines))
    }

    /// Totals, per-product and per-day figures for a range. Cashiers get a
    /// report over their own sales only.
    pub async fn range_report(&self, requester: &Requester, range: DateRange) -> ServiceResult<RangeReport> {
        debug!(start = %range.start, end = %range.end, "Building range report");

        let filter = SaleFilter {
            status: Some(SaleStatus::Completed),
            ..SaleFilter::for_range(range)
        }
        .scoped_to(requester);
        let rows = self.db.sales().rows(&filter).await?;
        let lines = self.db.sales().lines_matching(&filter).await?;

        Ok(RangeReport::build(range, rows, &lines))
    }

    /// Today's sales (UTC) of the requester, or of everyone for an admin.
    pub async fn today(&self, requester: &Requester) -> ServiceResult<TodaySales> {
        let date = Utc::now().date_naive();
        let filter = SaleFilter::for_range(DateRange::single_day(date)).scoped_to(requester);
        let rows = self.db.sales().rows(&filter).await?;

        Ok(TodaySales::build(date, rows))
    }

    /// Best sellers, optionally within a range. `limit` defaults to 10 and
    /// is clamped to 1..=100.
    pub async fn top_products(
        &self,
        requester: &Requester,
        range: Option<DateRange>,
        by: TopProductsBy,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<ProductStat>> {
        require(policy::can_view_reports(requester), "reports need ADMIN")?;

        let limit = limit.unwrap_or(DEFAULT_TOP_PRODUCTS).clamp(1, MAX_TOP_PRODUCTS);
        Ok(self.db.sales().top_products(range, by, limit).await?)
    }

    /// Performance of one cashier, optionally bounded by dates.
    pub async fn cashier_stats(
        &self,
        requester: &Requester,
        cashier_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ServiceResult<CashierStats> {
        require(policy::can_view_reports(requester), "reports need ADMIN")?;

        let filter = SaleFilter {
            start_date,
            end_date,
            cashier_id: Some(cashier_id.to_string()),
            status: Some(SaleStatus::Completed),
            ..Default::default()
        };
        filter.validate()?;

        let cashier = self
            .db
            .users()
            .get_by_id(cashier_id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(cashier_id.to_string()))?;
        let sales = self.db.sales().headers(&filter).await?;

        Ok(CashierStats::build(cashier, start_date, end_date, sales))
    }

    /// The filtered sale list as CSV, newest first.
    pub async fn export_csv(&self, requester: &Requester, filter: SaleFilter) -> ServiceResult<Vec<u8>> {
        require(policy::can_view_reports(requester), "exports need ADMIN")?;
        filter.validate()?;

        let rows = self.db.sales().rows(&filter).await?;
        debug!(rows = rows.len(), "Exporting sales as CSV");
        sales_csv(&rows).map_err(|e| DbError::Internal(format!("CSV export failed: {e}")).into())
    }
}

/// Builds a range from two required query dates.
pub fn required_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ServiceResult<DateRange> {
    let start = start.ok_or_else(|| ValidationError::Required {
        field: "startDate".to_string(),
    })?;
    let end = end.ok_or_else(|| ValidationError::Required {
        field: "endDate".to_string(),
    })?;
    Ok(DateRange::new(start, end)?)
}

/// Builds a range only when both dates are present.
pub fn optional_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ServiceResult<Option<DateRange>> {
    match (start, end) {
        (None, None) => Ok(None),
        (start, end) => required_range(start, end).map(Some),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
