//! # Repositories
//!
//! One repository per table family. Each holds a pool handle, so clones are
//! cheap and handlers can ask [`crate::Database`] for a fresh one per call.
//!
//! - [`ProductRepository`](product::ProductRepository) - catalog reads and admin edits
//! - [`SaleRepository`](sale::SaleRepository) - sale headers, lines, filtered lists
//! - [`UserRepository`](user::UserRepository) - accounts and credentials

pub mod product;
pub mod sale;
pub mod user;
