//! # Inventory Ledger
//!
//! The only code that moves stock because of a sale. Both operations run
//! on the caller's connection, normally an open transaction, and hold no
//! locks of their own.
//!
//! ```text
//! reserve(P, 3)                         release(P, 3)
//!   UPDATE products                       UPDATE products
//!   SET stock = stock - 3                 SET stock = stock + 3
//!   WHERE id = P AND is_active = 1        WHERE id = P
//!     AND stock >= 3                      RETURNING stock
//!   RETURNING stock
//!        │
//!        ├── row  → new stock level
//!        └── none → look up P: missing/inactive → ProductNotFound
//!                               otherwise       → InsufficientStock
//! ```
//!
//! The check and the decrement are one statement, so two registers selling
//! the last unit cannot both succeed.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::ServiceResult;
use caja_core::CoreError;

/// Takes `quantity` units of an active product. Returns the new stock.
pub async fn reserve(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> ServiceResult<i64> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity {
            product_id: product_id.to_string(),
            quantity,
        }
        .into());
    }

    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock - ?1, updated_at = ?2
        WHERE id = ?3 AND is_active = 1 AND stock >= ?1
        RETURNING stock
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = remaining {
        debug!(product_id = %product_id, quantity, stock, "Stock reserved");
        return Ok(stock);
    }

    let current: Option<(String, i64, bool)> =
        sqlx::query_as("SELECT code, stock, is_active FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        Some((code, stock, true)) => Err(CoreError::InsufficientStock {
            code,
            available: stock,
            requested: quantity,
        }
        .into()),
        _ => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
    }
}

/// Puts `quantity` units back. Only used to reverse an earlier reserve, so
/// it applies to inactive products too.
pub async fn release(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> ServiceResult<i64> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity {
            product_id: product_id.to_string(),
            quantity,
        }
        .into());
    }

    let stock: Option<i64> = sqlx::query_scalar(
        "UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3 RETURNING stock",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    match stock {
        Some(stock) => {
            debug!(product_id = %product_id, quantity, stock, "Stock released");
            Ok(stock)
        }
        None => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
