//! # Sale Workflow
//!
//! Creating and canceling sales, plus the scoped reads that go with them.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  policy: only cashiers ring up sales                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  NewSale::validate()       empty order, line count, notes length       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_order(snapshot)     missing product, bad quantity, short stock  │
//! │       │                    (nothing written yet)                       │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    INSERT sales            fresh invoice number on collision (≤ 5)     │
//! │    INSERT sale_lines                                                    │
//! │    ledger::reserve × n     a concurrent sale may still win the stock   │
//! │  COMMIT                    any error above → ROLLBACK                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancel
//! `COMPLETED → CANCELED` through a guarded update, then every line's
//! quantity goes back on the shelf, all in one transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, ServiceResult};
use crate::ledger;
use crate::pool::Database;
use crate::repository::sale::SaleRepository;
use caja_core::filter::SaleFilter;
use caja_core::invoice::{generate_invoice_number, INVOICE_RETRY_LIMIT};
use caja_core::order::{price_order, CancelSale, NewSale, PricedOrder};
use caja_core::pagination::{Page, PageRequest};
use caja_core::policy::{self, require, Requester};
use caja_core::report::SaleRow;
use caja_core::{CoreError, Sale, SaleDetail, SaleLine, SaleStatus};

/// Owns the sale lifecycle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SaleWorkflow {
    db: Database,
}

impl SaleWorkflow {
    pub fn new(db: Database) -> Self {
        SaleWorkflow { db }
    }

    /// Rings up a sale for the requesting cashier.
    pub async fn create_sale(&self, requester: &Requester, request: NewSale) -> ServiceResult<SaleDetail> {
        require(
            policy::can_create_sale(requester),
            "only cashiers can register sales",
        )?;
        request.validate()?;

        let priced = self.price(&request).await?;
        self.record(requester, request, priced).await
    }

    /// Prices the request against a catalog snapshot. Nothing is written;
    /// stock may change before [`Self::record`] reserves it.
    async fn price(&self, request: &NewSale) -> ServiceResult<PricedOrder> {
        let catalog = self.db.products().get_many(&request.product_ids()).await?;
        Ok(price_order(&request.items, &catalog)?)
    }

    /// Writes header and lines and reserves stock in one transaction.
    async fn record(
        &self,
        requester: &Requester,
        request: NewSale,
        priced: PricedOrder,
    ) -> ServiceResult<SaleDetail> {
        let now = Utc::now();
        let sale_id = Uuid::new_v4().to_string();
        let mut sale = Sale {
            id: sale_id.clone(),
            invoice_number: String::new(),
            sold_at: now,
            total_cents: priced.total.cents(),
            payment_method: request.payment_method,
            status: SaleStatus::Completed,
            cashier_id: requester.user_id.clone(),
            notes: request.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            cancel_reason: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        };
        let lines = build_lines(&sale_id, &priced);

        let mut tx = self.db.pool().begin().await?;

        insert_with_fresh_invoice(&mut tx, &mut sale, generate_invoice_number).await?;
        for line in &lines {
            SaleRepository::insert_line(&mut tx, line).await?;
        }
        for (product_id, quantity) in priced.quantities_by_product() {
            ledger::reserve(&mut tx, &product_id, quantity).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice_number = %sale.invoice_number,
            cashier_id = %sale.cashier_id,
            total_cents = sale.total_cents,
            lines = lines.len(),
            "Sale created"
        );

        let cashier = self.db.users().get_by_id(&sale.cashier_id).await?.map(|u| u.summary());
        Ok(SaleDetail {
            sale,
            lines,
            cashier,
        })
    }

    /// Cancels a completed sale and returns its stock.
    pub async fn cancel_sale(
        &self,
        requester: &Requester,
        sale_id: &str,
        request: CancelSale,
    ) -> ServiceResult<SaleDetail> {
        request.validate()?;

        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        require(
            policy::can_cancel_sale(requester, &sale),
            "cashiers can only cancel their own sales",
        )?;
        if sale.is_canceled() {
            return Err(CoreError::AlreadyCanceled(sale.invoice_number).into());
        }

        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let mut tx = self.db.pool().begin().await?;

        if !SaleRepository::mark_canceled(&mut tx, sale_id, reason, Utc::now()).await? {
            return Err(CoreError::AlreadyCanceled(sale.invoice_number).into());
        }
        for line in SaleRepository::lines_on(&mut tx, sale_id).await? {
            ledger::release(&mut tx, &line.product_id, line.quantity).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            invoice_number = %sale.invoice_number,
            canceled_by = %requester.user_id,
            "Sale canceled"
        );

        self.load_detail(sale_id).await
    }

    /// One sale, if the requester may see it.
    pub async fn get_sale(&self, requester: &Requester, sale_id: &str) -> ServiceResult<SaleDetail> {
        let detail = self.load_detail(sale_id).await?;
        require(
            policy::can_view_sale(requester, &detail.sale),
            "cashiers can only view their own sales",
        )?;
        Ok(detail)
    }

    /// Filtered list. Cashiers are pinned to their own sales.
    pub async fn list_sales(
        &self,
        requester: &Requester,
        filter: SaleFilter,
        page: &PageRequest,
    ) -> ServiceResult<Page<SaleRow>> {
        filter.validate()?;
        let filter = filter.scoped_to(requester);
        Ok(self.db.sales().list(&filter, page).await?)
    }

    /// Sales rung up by one user. Cashiers may only ask about themselves.
    pub async fn sales_of_user(
        &self,
        requester: &Requester,
        user_id: &str,
        page: &PageRequest,
    ) -> ServiceResult<Page<SaleRow>> {
        require(
            policy::can_view_user(requester, user_id),
            "cashiers can only view their own sales",
        )?;
        if self.db.users().get_by_id(user_id).await?.is_none() {
            return Err(CoreError::UserNotFound(user_id.to_string()).into());
        }

        let filter = SaleFilter {
            cashier_id: Some(user_id.to_string()),
            ..Default::default()
        };
        Ok(self.db.sales().list(&filter, page).await?)
    }

    async fn load_detail(&self, sale_id: &str) -> ServiceResult<SaleDetail> {
        self.db
            .sales()
            .detail(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()).into())
    }
}

fn build_lines(sale_id: &str, priced: &PricedOrder) -> Vec<SaleLine> {
    priced
        .lines
        .iter()
        .enumerate()
        .map(|(position, line)| SaleLine {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: line.product_id.clone(),
            position: position as i64,
            product_code: line.product_code.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            subtotal_cents: line.subtotal.cents(),
        })
        .collect()
}

/// Inserts the header, drawing a new invoice number from `next_number`
/// whenever the previous one was already taken.
async fn insert_with_fresh_invoice(
    conn: &mut SqliteConnection,
    sale: &mut Sale,
    mut next_number: impl FnMut(DateTime<Utc>) -> String,
) -> ServiceResult<()> {
    let mut last_err = None;

    for attempt in 1..=INVOICE_RETRY_LIMIT {
        sale.invoice_number = next_number(sale.sold_at);

        match SaleRepository::insert_header(conn, sale).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_unique_violation_on("sales.invoice_number") => {
                warn!(
                    attempt,
                    invoice_number = %sale.invoice_number,
                    "Invoice number collision, retrying"
                );
                last_err = Some(err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(last_err
        .unwrap_or_else(|| DbError::duplicate("sales.invoice_number", &sale.invoice_number))
        .into())
}

// =============================================================================
// Unit Tests
// =============================================================================
