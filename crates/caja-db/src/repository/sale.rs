//! # Sale Repository
//!
//! Sale headers and their lines. Writes happen only inside the sale
//! workflow's transactions, so the write helpers take a connection instead
//! of using the pool.
//!
//! ## Snapshot Pattern
//! Product code, name and unit price are copied onto each line when the
//! sale is written. Later catalog edits never change history.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::filter::{DateRange, SaleFilter};
use caja_core::pagination::{Page, PageRequest};
use caja_core::report::{ProductStat, SaleRow, TopProductsBy};
use caja_core::{Sale, SaleDetail, SaleLine, SaleStatus, UserSummary};

const SALE_COLUMNS: &str = "s.id, s.invoice_number, s.sold_at, s.total_cents, s.payment_method, \
     s.status, s.cashier_id, s.notes, s.cancel_reason, s.canceled_at, s.created_at, s.updated_at";

const LINE_COLUMNS: &str = "l.id, l.sale_id, l.product_id, l.position, l.product_code, \
     l.product_name, l.quantity, l.unit_price_cents, l.subtotal_cents";

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Writes (transaction-bound)
    // -------------------------------------------------------------------------

    /// Inserts a sale header on the caller's connection.
    ///
    /// ## Errors
    /// `UniqueViolation` on `sales.invoice_number` when the number is taken.
    pub async fn insert_header(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, sold_at, total_cents, payment_method, status,
                cashier_id, notes, cancel_reason, canceled_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(sale.sold_at)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.status)
        .bind(&sale.cashier_id)
        .bind(&sale.notes)
        .bind(&sale.cancel_reason)
        .bind(sale.canceled_at)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).with_value(&sale.invoice_number))?;

        Ok(())
    }

    pub async fn insert_line(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
        debug!(sale_id = %line.sale_id, product_id = %line.product_id, "Inserting sale line");

        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, product_id, position, product_code, product_name,
                quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(&line.product_id)
        .bind(line.position)
        .bind(&line.product_code)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.subtotal_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Flips a COMPLETED sale to CANCELED. Returns `false` when the sale was
    /// not COMPLETED any more (already canceled, possibly concurrently).
    pub async fn mark_canceled(
        conn: &mut SqliteConnection,
        id: &str,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = ?1, cancel_reason = ?2, canceled_at = ?3, updated_at = ?3
            WHERE id = ?4 AND status = ?5
            "#,
        )
        .bind(SaleStatus::Canceled)
        .bind(reason)
        .bind(at)
        .bind(id)
        .bind(SaleStatus::Completed)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lines of a sale, read on the caller's connection.
    pub async fn lines_on(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM sale_lines l WHERE l.sale_id = ?1 ORDER BY l.position");
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(lines)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales s WHERE s.id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM sale_lines l WHERE l.sale_id = ?1 ORDER BY l.position");
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    /// Header, lines and cashier summary.
    pub async fn detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let lines = self.lines(id).await?;
        let cashier = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email FROM users WHERE id = ?1",
        )
        .bind(&sale.cashier_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some(SaleDetail {
            sale,
            lines,
            cashier,
        }))
    }

    /// Filtered, paginated list, newest first.
    pub async fn list(&self, filter: &SaleFilter, page: &PageRequest) -> DbResult<Page<SaleRow>> {
        debug!(?filter, page = page.page(), limit = page.limit(), "Listing sales");

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sales s");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = row_select();
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY s.sold_at DESC, s.id DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows: Vec<SaleRow> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(Page::new(rows, page, total as u64))
    }

    /// Every sale matching `filter`, newest first. For reports and exports.
    pub async fn rows(&self, filter: &SaleFilter) -> DbResult<Vec<SaleRow>> {
        let mut select = row_select();
        push_filter(&mut select, filter);
        select.push(" ORDER BY s.sold_at DESC, s.id DESC");

        let rows: Vec<SaleRow> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Headers only, newest first.
    pub async fn headers(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {SALE_COLUMNS} FROM sales s"));
        push_filter(&mut select, filter);
        select.push(" ORDER BY s.sold_at DESC, s.id DESC");

        let sales: Vec<Sale> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    /// Lines of every sale matching `filter`.
    pub async fn lines_matching(&self, filter: &SaleFilter) -> DbResult<Vec<SaleLine>> {
        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines l JOIN sales s ON s.id = l.sale_id"
        ));
        push_filter(&mut select, filter);
        select.push(" ORDER BY s.sold_at, l.position");

        let lines: Vec<SaleLine> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(lines)
    }

    /// Best-selling products over non-canceled sales, grouped in SQL.
    pub async fn top_products(
        &self,
        range: Option<DateRange>,
        by: TopProductsBy,
        limit: u32,
    ) -> DbResult<Vec<ProductStat>> {
        let mut select = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT l.product_id AS product_id,
                   p.code AS product_code,
                   p.name AS product_name,
                   SUM(l.quantity) AS quantity,
                   SUM(l.subtotal_cents) AS total_cents
            FROM sale_lines l
            JOIN sales s ON s.id = l.sale_id
            JOIN products p ON p.id = l.product_id
            WHERE s.status <> "#,
        );
        select.push_bind(SaleStatus::Canceled);

        if let Some(range) = range {
            select.push(" AND s.sold_at >= ").push_bind(range.starts_at());
            if let Some(before) = range.ends_before() {
                select.push(" AND s.sold_at < ").push_bind(before);
            }
        }

        select.push(" GROUP BY l.product_id, p.code, p.name ORDER BY ");
        select.push(match by {
            TopProductsBy::Quantity => "quantity DESC, total_cents DESC",
            TopProductsBy::Revenue => "total_cents DESC, quantity DESC",
        });
        select.push(", p.code LIMIT ").push_bind(limit as i64);

        let stats: Vec<ProductStat> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(stats)
    }
}

fn row_select() -> QueryBuilder<'static, Sqlite> {
    QueryBuilder::new(format!(
        "SELECT {SALE_COLUMNS}, u.username AS cashier_username, \
         (SELECT COUNT(*) FROM sale_lines l WHERE l.sale_id = s.id) AS item_count \
         FROM sales s LEFT JOIN users u ON u.id = s.cashier_id"
    ))
}

/// Appends the conjunctive sale filter. Dates are whole UTC days with an
/// exclusive upper bound.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(from) = filter.sold_from() {
        qb.push(" AND s.sold_at >= ").push_bind(from);
    }
    if let Some(before) = filter.sold_before() {
        qb.push(" AND s.sold_at < ").push_bind(before);
    }
    if let Some(cashier_id) = &filter.cashier_id {
        qb.push(" AND s.cashier_id = ").push_bind(cashier_id.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND s.status = ").push_bind(status);
    }
    if let Some(method) = filter.payment_method {
        qb.push(" AND s.payment_method = ").push_bind(method);
    }
    if let Some(min) = filter.min_amount {
        qb.push(" AND s.total_cents >= ").push_bind(min);
    }
    if let Some(max) = filter.max_amount {
        qb.push(" AND s.total_cents <= ").push_bind(max);
    }
}
