//! # caja-db: Database Layer for Caja POS
//!
//! SQLite storage plus the services that need it: the inventory ledger, the
//! sale workflow, account management and reports.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Data Flow                               │
//! │                                                                         │
//! │  caja-server handler (POST /api/sales)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     caja-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   SaleWorkflow ── CatalogService ── AccountService ── Reports   │   │
//! │  │        │                 │                │                     │   │
//! │  │        ▼                 ▼                ▼                     │   │
//! │  │   ledger ◄──── Repositories (product, sale, user)               │   │
//! │  │                          │                                      │   │
//! │  │                   Database (pool.rs) + migrations               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{Database, DbConfig, SaleWorkflow};
//!
//! let db = Database::new(DbConfig::new("./caja.db")).await?;
//! let workflow = SaleWorkflow::new(db.clone());
//! let detail = workflow.create_sale(&requester, new_sale).await?;
//! ```

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod report;
pub mod repository;
pub mod workflow;

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};
pub use report::ReportService;
pub use workflow::SaleWorkflow;

pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::UserRepository;
