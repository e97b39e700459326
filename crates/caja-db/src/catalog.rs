//! # Catalog Service
//!
//! Product administration on top of [`ProductRepository`]. Reads are open to
//! every signed-in user; writes need ADMIN.
//!
//! [`ProductRepository`]: crate::repository::product::ProductRepository

use tracing::info;

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::pool::Database;
use caja_core::filter::ProductFilter;
use caja_core::pagination::{Page, PageRequest};
use caja_core::policy::{self, require, Requester};
use caja_core::validation::validate_stock;
use caja_core::{CoreError, NewProduct, Product, ProductChanges};

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    /// Active products ordered by name.
    pub async fn list(&self, filter: ProductFilter, page: &PageRequest) -> ServiceResult<Page<Product>> {
        let filter = filter.normalized()?;
        Ok(self.db.products().list(&filter, page).await?)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Product> {
        self.db
            .products()
            .get_active(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    pub async fn get_by_code(&self, code: &str) -> ServiceResult<Product> {
        self.db
            .products()
            .get_by_code(code.trim())
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(code.to_string()).into())
    }

    pub async fn create(&self, requester: &Requester, input: NewProduct) -> ServiceResult<Product> {
        require(policy::can_manage_catalog(requester), "managing products needs ADMIN")?;
        input.validate()?;

        let product = self.db.products().create(input).await?;
        info!(product_id = %product.id, code = %product.code, by = %requester.user_id, "Product created");
        Ok(product)
    }

    pub async fn update(
        &self,
        requester: &Requester,
        id: &str,
        changes: ProductChanges,
    ) -> ServiceResult<Product> {
        require(policy::can_manage_catalog(requester), "managing products needs ADMIN")?;
        changes.validate()?;

        let product = self
            .db
            .products()
            .update(id, changes)
            .await
            .map_err(|e| not_found_as_product(e, id))?;
        info!(product_id = %id, by = %requester.user_id, "Product updated");
        Ok(product)
    }

    /// Soft delete. Past sales keep pointing at the row.
    pub async fn delete(&self, requester: &Requester, id: &str) -> ServiceResult<()> {
        require(policy::can_manage_catalog(requester), "managing products needs ADMIN")?;

        self.db
            .products()
            .deactivate(id)
            .await
            .map_err(|e| not_found_as_product(e, id))?;
        info!(product_id = %id, by = %requester.user_id, "Product deactivated");
        Ok(())
    }

    /// Administrative stock correction, outside of any sale.
    pub async fn set_stock(&self, requester: &Requester, id: &str, stock: i64) -> ServiceResult<Product> {
        require(policy::can_manage_catalog(requester), "managing products needs ADMIN")?;
        validate_stock(stock)?;

        let product = self
            .db
            .products()
            .set_stock(id, stock)
            .await
            .map_err(|e| not_found_as_product(e, id))?;
        info!(product_id = %id, stock, by = %requester.user_id, "Stock set");
        Ok(product)
    }

    pub async fn low_stock(&self, threshold: i64) -> ServiceResult<Vec<Product>> {
        validate_stock(threshold)?;
        Ok(self.db.products().low_stock(threshold).await?)
    }
}

fn not_found_as_product(err: DbError, id: &str) -> ServiceError {
    match err {
        DbError::NotFound { .. } => CoreError::ProductNotFound(id.to_string()).into(),
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
