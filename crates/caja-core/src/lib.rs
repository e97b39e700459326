//! # caja-core: Pure Business Logic for Caja POS
//!
//! Everything the register needs to decide, with nothing it needs to fetch.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Caja POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    caja-server (axum)                           │   │
//! │  │    /api/auth ── /api/products ── /api/sales ── /api/users       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (SQLite)                             │   │
//! │  │    repositories, inventory ledger, sale workflow, reports       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  order  │ │ policy  │ │ report  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, User, Sale, SaleLine, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//! - [`order`] - Pricing an order against a catalog snapshot
//! - [`policy`] - Who may do what
//! - [`invoice`] - Invoice number format
//! - [`filter`] - Date ranges and sale list filters
//! - [`pagination`] - Page requests and page envelopes
//! - [`report`] - Aggregation over committed sales
//! - [`password`] - Argon2id hashing
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use caja_core::order::{price_order, OrderItem};
//! use caja_core::Product;
//!
//! let product = Product::new("COCA-500", "Coca-Cola 500ml", 500, 10);
//! let catalog = HashMap::from([(product.id.clone(), product.clone())]);
//!
//! let order = price_order(&[OrderItem::new(&product.id, 3)], &catalog).unwrap();
//! assert_eq!(order.total.cents(), 1500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod filter;
pub mod invoice;
pub mod money;
pub mod order;
pub mod pagination;
pub mod password;
pub mod policy;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::Requester;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted in a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum length of free-text sale notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Maximum length of a cancellation reason.
pub const MAX_CANCEL_REASON_LEN: usize = 200;

/// Products at or below this stock level show up in the low-stock list.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
