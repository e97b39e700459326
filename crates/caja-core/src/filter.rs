//! # Filters
//!
//! Date ranges and sale list filters. Dates are whole UTC days and both
//! ends are inclusive: `2026-03-01..=2026-03-01` covers that full day.
//!
//! Timestamps are stored as RFC 3339 text, which only sorts correctly for
//! four-digit years, so query dates after [`LAST_YEAR`] are rejected.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::policy::{scope_cashier, Requester};
use crate::types::{PaymentMethod, Role, SaleStatus};
use crate::validation::{validate_amount_filter, validate_search_query, ValidationResult};

// =============================================================================
// Date Range
// =============================================================================

/// Last year a query date may fall in.
pub const LAST_YEAR: i32 = 9999;

/// Rejects a day whose timestamps would not compare correctly as text.
pub fn validate_day(field: &str, day: NaiveDate) -> ValidationResult<()> {
    if day.year() > LAST_YEAR {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("year must be at most {LAST_YEAR}"),
        });
    }
    Ok(())
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `end < start` and days past [`LAST_YEAR`].
    pub fn new(start: NaiveDate, end: NaiveDate) -> ValidationResult<Self> {
        validate_day("startDate", start)?;
        validate_day("endDate", end)?;
        if end < start {
            return Err(ValidationError::Order {
                earlier: "startDate".to_string(),
                later: "endDate".to_string(),
            });
        }
        Ok(DateRange { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        DateRange {
            start: day,
            end: day,
        }
    }

    /// First instant inside the range.
    pub fn starts_at(&self) -> DateTime<Utc> {
        day_start(self.start)
    }

    /// First instant after the range (exclusive bound). `None` when the
    /// range runs to the end of [`LAST_YEAR`] or beyond.
    pub fn ends_before(&self) -> Option<DateTime<Utc>> {
        next_day_start(self.end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.starts_at() && self.ends_before().map_or(true, |end| at < end)
    }
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn next_day_start(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.succ_opt()
        .filter(|next| next.year() <= LAST_YEAR)
        .map(day_start)
}

// =============================================================================
// Sale Filter
// =============================================================================

/// Conjunctive filters for listing sales. Every present field narrows the
/// result; absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleFilter {
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,
    pub cashier_id: Option<String>,
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    /// Minimum total, in cents.
    pub min_amount: Option<i64>,
    /// Maximum total, in cents.
    pub max_amount: Option<i64>,
}

impl SaleFilter {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(start) = self.start_date {
            validate_day("startDate", start)?;
        }
        if let Some(end) = self.end_date {
            validate_day("endDate", end)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            DateRange::new(start, end)?;
        }
        validate_amount_filter("minAmount", self.min_amount)?;
        validate_amount_filter("maxAmount", self.max_amount)?;
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if max < min {
                return Err(ValidationError::Order {
                    earlier: "minAmount".to_string(),
                    later: "maxAmount".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Pins the cashier filter according to the requester's visibility.
    pub fn scoped_to(mut self, requester: &Requester) -> Self {
        self.cashier_id = scope_cashier(requester, self.cashier_id.take());
        self
    }

    /// Lower bound on `sold_at`, inclusive.
    pub fn sold_from(&self) -> Option<DateTime<Utc>> {
        self.start_date.map(day_start)
    }

    /// Upper bound on `sold_at`, exclusive. Unbounded when no end date is
    /// set or it is the last day of [`LAST_YEAR`].
    pub fn sold_before(&self) -> Option<DateTime<Utc>> {
        self.end_date.and_then(next_day_start)
    }

    /// Filter matching every sale inside `range`.
    pub fn for_range(range: DateRange) -> Self {
        SaleFilter {
            start_date: Some(range.start),
            end_date: Some(range.end),
            ..Default::default()
        }
    }
}

// =============================================================================
// Catalog and account filters
// =============================================================================

/// Filters for the product list. Only active products are ever listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    /// Substring of name, code or description (case-insensitive).
    pub search: Option<String>,
    pub category: Option<String>,
}

impl ProductFilter {
    /// Trims the search term and drops blank values.
    pub fn normalized(self) -> ValidationResult<Self> {
        Ok(ProductFilter {
            search: normalize_search(self.search)?,
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Substring of username or email (case-insensitive).
    pub search: Option<String>,
}

impl UserFilter {
    pub fn normalized(self) -> ValidationResult<Self> {
        Ok(UserFilter {
            role: self.role,
            search: normalize_search(self.search)?,
        })
    }
}

fn normalize_search(search: Option<String>) -> ValidationResult<Option<String>> {
    match search {
        Some(q) => {
            let q = validate_search_query(&q)?;
            Ok(Some(q).filter(|q| !q.is_empty()))
        }
        None => Ok(None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
