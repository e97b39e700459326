//! # Sales Reports
//!
//! Pure aggregation over sales that the database layer has already loaded.
//! CANCELED sales never contribute to money or unit figures; a report may
//! still list them where noted.
//!
//! ```text
//!   SaleRow[] + SaleLine[]
//!          │
//!          ├──► totals()            count, revenue, average ticket
//!          ├──► payment_breakdown() per payment method
//!          ├──► product_stats()     per product: units, revenue
//!          └──► day_stats()         per calendar day
//!                    │
//!                    ▼
//!   DailySummary / RangeReport / TodaySales / CashierStats
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::filter::DateRange;
use crate::money::Money;
use crate::types::{PaymentMethod, Sale, SaleLine, User};

/// Sales listed in a range report.
pub const REPORT_SALES_LIMIT: usize = 50;

/// Products listed in a daily summary.
pub const SUMMARY_TOP_PRODUCTS: usize = 10;

/// Recent sales listed in cashier stats.
pub const RECENT_SALES_LIMIT: usize = 10;

// =============================================================================
// Rows and building blocks
// =============================================================================

/// A sale header with the bits list views need from joined tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRow {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sale: Sale,
    pub cashier_username: Option<String>,
    pub item_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesTotals {
    pub total_sales: u64,
    pub total_cents: i64,
    pub average_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStat {
    pub method: PaymentMethod,
    pub count: u64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductStat {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DayStat {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub count: u64,
    pub total_cents: i64,
    pub units: i64,
}

/// Ranking key for top products.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TopProductsBy {
    #[default]
    Quantity,
    Revenue,
}

fn counted<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> impl Iterator<Item = &'a Sale> {
    sales.into_iter().filter(|s| !s.is_canceled())
}

/// Count, revenue and average ticket over non-canceled sales.
pub fn totals<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> SalesTotals {
    let (count, total) = counted(sales).fold((0u64, Money::ZERO), |(n, sum), s| {
        (n + 1, sum + s.total())
    });
    SalesTotals {
        total_sales: count,
        total_cents: total.cents(),
        average_cents: total.average_over(count as i64).cents(),
    }
}

/// One entry per payment method, zero-filled, in CASH/CARD/TRANSFER order.
pub fn payment_breakdown<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Vec<PaymentStat> {
    let mut stats: Vec<PaymentStat> = PaymentMethod::ALL
        .iter()
        .map(|&method| PaymentStat {
            method,
            count: 0,
            total_cents: 0,
        })
        .collect();

    for sale in counted(sales) {
        if let Some(stat) = stats.iter_mut().find(|s| s.method == sale.payment_method) {
            stat.count += 1;
            stat.total_cents = stat.total_cents.saturating_add(sale.total_cents);
        }
    }
    stats
}

fn counted_sale_ids<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> HashSet<&'a str> {
    counted(sales).map(|s| s.id.as_str()).collect()
}

/// Units and revenue per product, most units first.
pub fn product_stats<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    lines: &[SaleLine],
) -> Vec<ProductStat> {
    let ids = counted_sale_ids(sales);
    let mut by_product: HashMap<&str, ProductStat> = HashMap::new();

    for line in lines.iter().filter(|l| ids.contains(l.sale_id.as_str())) {
        let stat = by_product
            .entry(line.product_id.as_str())
            .or_insert_with(|| ProductStat {
                product_id: line.product_id.clone(),
                product_code: line.product_code.clone(),
                product_name: line.product_name.clone(),
                quantity: 0,
                total_cents: 0,
            });
        stat.quantity = stat.quantity.saturating_add(line.quantity);
        stat.total_cents = stat.total_cents.saturating_add(line.subtotal_cents);
    }

    let mut stats: Vec<ProductStat> = by_product.into_values().collect();
    rank_products(&mut stats, TopProductsBy::Quantity);
    stats
}

/// Sorts product stats by the chosen key, ties broken by the other key
/// and then by code.
pub fn rank_products(stats: &mut [ProductStat], by: TopProductsBy) {
    stats.sort_by(|a, b| {
        let primary = match by {
            TopProductsBy::Quantity => b
                .quantity
                .cmp(&a.quantity)
                .then(b.total_cents.cmp(&a.total_cents)),
            TopProductsBy::Revenue => b
                .total_cents
                .cmp(&a.total_cents)
                .then(b.quantity.cmp(&a.quantity)),
        };
        primary.then_with(|| a.product_code.cmp(&b.product_code))
    });
}

/// Per-day counts, revenue and units, oldest day first.
pub fn day_stats<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    lines: &[SaleLine],
) -> Vec<DayStat> {
    let mut days: BTreeMap<NaiveDate, DayStat> = BTreeMap::new();
    let mut day_of_sale: HashMap<&str, NaiveDate> = HashMap::new();

    for sale in counted(sales) {
        let date = sale.sold_at.date_naive();
        day_of_sale.insert(sale.id.as_str(), date);
        let day = days.entry(date).or_insert(DayStat {
            date,
            count: 0,
            total_cents: 0,
            units: 0,
        });
        day.count += 1;
        day.total_cents = day.total_cents.saturating_add(sale.total_cents);
    }

    for line in lines {
        if let Some(date) = day_of_sale.get(line.sale_id.as_str()) {
            if let Some(day) = days.get_mut(date) {
                day.units = day.units.saturating_add(line.quantity);
            }
        }
    }

    days.into_values().collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Composite reports
// =============================================================================

/// One day at a glance (admin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub totals: SalesTotals,
    pub payment_methods: Vec<PaymentStat>,
    pub top_products: Vec<ProductStat>,
    /// Completed sales of the day, oldest first.
    pub sales: Vec<SaleRow>,
}

impl DailySummary {
    pub fn build(date: NaiveDate, rows: Vec<SaleRow>, lines: &[SaleLine]) -> Self {
        let mut top_products = product_stats(rows.iter().map(|r| &r.sale), lines);
        top_products.truncate(SUMMARY_TOP_PRODUCTS);

        let mut sales: Vec<SaleRow> = rows.into_iter().filter(|r| !r.sale.is_canceled()).collect();
        sales.sort_by_key(|r| r.sale.sold_at);

        DailySummary {
            date,
            totals: totals(sales.iter().map(|r| &r.sale)),
            payment_methods: payment_breakdown(sales.iter().map(|r| &r.sale)),
            top_products,
            sales,
        }
    }
}

/// Arbitrary date-range report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RangeReport {
    pub range: DateRange,
    pub totals: SalesTotals,
    pub total_units: i64,
    pub average_units_per_sale: f64,
    pub products: Vec<ProductStat>,
    pub days: Vec<DayStat>,
    /// First completed sales of the range, oldest first.
    pub sales: Vec<SaleRow>,
}

impl RangeReport {
    pub fn build(range: DateRange, rows: Vec<SaleRow>, lines: &[SaleLine]) -> Self {
        let mut sales: Vec<SaleRow> = rows.into_iter().filter(|r| !r.sale.is_canceled()).collect();
        sales.sort_by_key(|r| r.sale.sold_at);

        let totals = totals(sales.iter().map(|r| &r.sale));
        let products = product_stats(sales.iter().map(|r| &r.sale), lines);
        let days = day_stats(sales.iter().map(|r| &r.sale), lines);
        let total_units = products.iter().fold(0i64, |n, p| n.saturating_add(p.quantity));
        let average_units_per_sale = if totals.total_sales > 0 {
            round2(total_units as f64 / totals.total_sales as f64)
        } else {
            0.0
        };

        sales.truncate(REPORT_SALES_LIMIT);

        RangeReport {
            range,
            totals,
            total_units,
            average_units_per_sale,
            products,
            days,
            sales,
        }
    }
}

/// Today's sales for the requester. Lists canceled sales too, but only
/// completed ones count towards the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TodaySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub totals: SalesTotals,
    pub canceled_count: u64,
    /// Newest first.
    pub sales: Vec<SaleRow>,
}

impl TodaySales {
    pub fn build(date: NaiveDate, mut rows: Vec<SaleRow>) -> Self {
        rows.sort_by(|a, b| b.sale.sold_at.cmp(&a.sale.sold_at));
        TodaySales {
            date,
            totals: totals(rows.iter().map(|r| &r.sale)),
            canceled_count: rows.iter().filter(|r| r.sale.is_canceled()).count() as u64,
            sales: rows,
        }
    }
}

/// Performance of one cashier over an optional period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashierStats {
    pub cashier: User,
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,
    pub totals: SalesTotals,
    pub payment_methods: Vec<PaymentStat>,
    /// Most recent completed sales, newest first.
    pub recent_sales: Vec<Sale>,
}

impl CashierStats {
    pub fn build(
        cashier: User,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        sales: Vec<Sale>,
    ) -> Self {
        let mut recent_sales: Vec<Sale> = sales.into_iter().filter(|s| !s.is_canceled()).collect();
        recent_sales.sort_by(|a, b| b.sold_at.cmp(&a.sold_at));

        let totals = totals(&recent_sales);
        let payment_methods = payment_breakdown(&recent_sales);
        recent_sales.truncate(RECENT_SALES_LIMIT);

        CashierStats {
            cashier,
            start_date,
            end_date,
            totals,
            payment_methods,
            recent_sales,
        }
    }
}

// =============================================================================
// CSV export
// =============================================================================

/// Column names of the sales CSV export.
pub const SALES_CSV_COLUMNS: [&str; 7] = [
    "id",
    "sold_at",
    "invoice_number",
    "total",
    "payment_method",
    "status",
    "cashier",
];

/// Renders sale rows as CSV, one record per sale, in the given order.
/// Totals are written as plain decimals (`15.00`); lines end in `\n`.
pub fn sales_csv(rows: &[SaleRow]) -> Result<Vec<u8>, csv::Error> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(64 * (rows.len() + 1)));

    csv.write_record(SALES_CSV_COLUMNS)?;
    for row in rows {
        let sale = &row.sale;
        let sold_at = sale.sold_at.to_rfc3339();
        let total = sale.total().to_decimal();
        csv.write_record([
            sale.id.as_str(),
            sold_at.as_str(),
            sale.invoice_number.as_str(),
            total.as_str(),
            sale.payment_method.as_str(),
            sale.status.as_str(),
            row.cashier_username.as_deref().unwrap_or("N/A"),
        ])?;
    }

    csv.into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, SaleStatus};
    use chrono::{TimeZone, Utc};

    fn sale(id: &str, day: u32, total: i64, method: PaymentMethod, status: SaleStatus) -> Sale {
        let at = Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap();
        Sale {
            id: id.to_string(),
            invoice_number: format!("FAC-202603{:02}-{}", day, id),
            sold_at: at,
            total_cents: total,
            payment_method: method,
            status,
            cashier_id: "c-1".to_string(),
            notes: None,
            cancel_reason: None,
            canceled_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn line(sale_id: &str, product: &str, qty: i64, unit: i64) -> SaleLine {
        SaleLine {
            id: format!("{}-{}", sale_id, product),
            sale_id: sale_id.to_string(),
            product_id: product.to_string(),
            position: 0,
            product_code: product.to_uppercase(),
            product_name: product.to_string(),
            quantity: qty,
            unit_price_cents: unit,
            subtotal_cents: qty * unit,
        }
    }

    fn row(sale: Sale) -> SaleRow {
        SaleRow {
            sale,
            cashier_username: Some("caja1".to_string()),
            item_count: 1,
        }
    }

    fn fixture() -> (Vec<Sale>, Vec<SaleLine>) {
        let sales = vec![
            sale("a", 1, 1500, PaymentMethod::Cash, SaleStatus::Completed),
            sale("b", 1, 500, PaymentMethod::Card, SaleStatus::Completed),
            sale("c", 2, 9900, PaymentMethod::Cash, SaleStatus::Canceled),
        ];
        let lines = vec![
            line("a", "pan", 3, 500),
            line("b", "leche", 1, 500),
            line("c", "pan", 99, 100),
        ];
        (sales, lines)
    }

    #[test]
    fn test_totals_exclude_canceled() {
        let (sales, _) = fixture();
        let t = totals(&sales);
        assert_eq!(t.total_sales, 2);
        assert_eq!(t.total_cents, 2000);
        assert_eq!(t.average_cents, 1000);
    }

    #[test]
    fn test_totals_of_nothing() {
        let none: Vec<Sale> = Vec::new();
        assert_eq!(totals(&none), SalesTotals::default());
    }

    #[test]
    fn test_payment_breakdown() {
        let (sales, _) = fixture();
        let stats = payment_breakdown(&sales);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].method, PaymentMethod::Cash);
        assert_eq!((stats[0].count, stats[0].total_cents), (1, 1500));
        assert_eq!((stats[1].count, stats[1].total_cents), (1, 500));
        assert_eq!((stats[2].count, stats[2].total_cents), (0, 0));
    }

    #[test]
    fn test_product_stats_ignore_canceled_lines() {
        let (sales, lines) = fixture();
        let stats = product_stats(&sales, &lines);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].product_id, "pan");
        assert_eq!(stats[0].quantity, 3);
        assert_eq!(stats[0].total_cents, 1500);
        assert_eq!(stats[1].product_id, "leche");
    }

    #[test]
    fn test_rank_by_revenue() {
        let mut stats = vec![
            ProductStat {
                product_id: "a".into(),
                product_code: "A".into(),
                product_name: "a".into(),
                quantity: 10,
                total_cents: 100,
            },
            ProductStat {
                product_id: "b".into(),
                product_code: "B".into(),
                product_name: "b".into(),
                quantity: 1,
                total_cents: 5000,
            },
        ];
        rank_products(&mut stats, TopProductsBy::Revenue);
        assert_eq!(stats[0].product_id, "b");
        rank_products(&mut stats, TopProductsBy::Quantity);
        assert_eq!(stats[0].product_id, "a");
    }

    #[test]
    fn test_day_stats() {
        let (sales, lines) = fixture();
        let days = day_stats(&sales, &lines);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(days[0].count, 2);
        assert_eq!(days[0].total_cents, 2000);
        assert_eq!(days[0].units, 4);
    }

    #[test]
    fn test_range_report() {
        let (sales, lines) = fixture();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        )
        .unwrap();
        let report = RangeReport::build(range, sales.into_iter().map(row).collect(), &lines);

        assert_eq!(report.totals.total_sales, 2);
        assert_eq!(report.total_units, 4);
        assert_eq!(report.average_units_per_sale, 2.0);
        assert_eq!(report.sales.len(), 2);
        assert!(report.sales.iter().all(|r| !r.sale.is_canceled()));
    }

    #[test]
    fn test_daily_summary_lists_completed_only() {
        let (sales, lines) = fixture();
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let summary = DailySummary::build(day, sales.into_iter().map(row).collect(), &lines);
        assert_eq!(summary.sales.len(), 2);
        assert_eq!(summary.totals.total_cents, 2000);
        assert_eq!(summary.top_products[0].product_id, "pan");
    }

    #[test]
    fn test_today_lists_canceled_but_does_not_count_them() {
        let (sales, _) = fixture();
        let today = TodaySales::build(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            sales.into_iter().map(row).collect(),
        );
        assert_eq!(today.sales.len(), 3);
        assert_eq!(today.canceled_count, 1);
        assert_eq!(today.totals.total_sales, 2);
        assert_eq!(today.sales[0].sale.id, "c");
    }

    #[test]
    fn test_cashier_stats() {
        let (sales, _) = fixture();
        let now = Utc::now();
        let cashier = User {
            id: "c-1".into(),
            username: "caja1".into(),
            email: "caja1@tienda.com".into(),
            role: Role::Cashier,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let stats = CashierStats::build(cashier, None, None, sales);
        assert_eq!(stats.totals.total_sales, 2);
        assert_eq!(stats.recent_sales.len(), 2);
        assert_eq!(stats.payment_methods[0].total_cents, 1500);
    }

    #[test]
    fn test_sales_csv() {
        let (sales, _) = fixture();
        let mut rows: Vec<SaleRow> = sales.into_iter().map(row).collect();
        rows[1].cashier_username = Some("Pérez, Ana".to_string());
        rows[2].cashier_username = None;

        let csv = String::from_utf8(sales_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], SALES_CSV_COLUMNS.join(","));
        assert!(lines[1].starts_with("a,2026-03-01T12:00:00+00:00,FAC-20260301-a,15.00,CASH,COMPLETED,caja1"));
        assert!(lines[2].ends_with(",5.00,CARD,COMPLETED,\"Pérez, Ana\""));
        assert!(lines[3].ends_with(",99.00,CASH,CANCELED,N/A"));
        assert!(csv.ends_with("N/A\n"));
    }

    #[test]
    fn test_sales_csv_escapes_quotes_and_line_breaks() {
        let (sales, _) = fixture();
        let mut rows: Vec<SaleRow> = sales.into_iter().take(1).map(row).collect();
        rows[0].cashier_username = Some("Ana \"La Rápida\"\nPérez".to_string());

        let csv = String::from_utf8(sales_csv(&rows).unwrap()).unwrap();
        assert!(csv.ends_with(",\"Ana \"\"La Rápida\"\"\nPérez\"\n"));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[6], "Ana \"La Rápida\"\nPérez");
    }
}
