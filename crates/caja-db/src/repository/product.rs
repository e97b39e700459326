//! # Product Repository
//!
//! Catalog reads and administrative edits. Stock changes made by sales go
//! through [`crate::ledger`], never through this repository.
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET /api/products?search=coca&category=Bebidas&page=1&limit=20        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WHERE is_active = 1                                                   │
//! │    AND (instr(lower(name), 'coca') > 0                                 │
//! │         OR instr(lower(code), 'coca') > 0                              │
//! │         OR instr(lower(description), 'coca') > 0)                      │
//! │    AND category = 'Bebidas'                                            │
//! │  ORDER BY name                                                         │
//! │  LIMIT 20 OFFSET 0                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `instr` instead of `LIKE` keeps `%` and `_` in user input literal.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use caja_core::filter::ProductFilter;
use caja_core::pagination::{Page, PageRequest};
use caja_core::{NewProduct, Product, ProductChanges};

pub(crate) const PRODUCT_COLUMNS: &str = "id, code, name, description, price_cents, stock, \
     category, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products matching `filter`, ordered by name.
    pub async fn list(&self, filter: &ProductFilter, page: &PageRequest) -> DbResult<Page<Product>> {
        debug!(search = ?filter.search, category = ?filter.category, page = page.page(), "Listing products");

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY name, code LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let products: Vec<Product> = select.build_query_as().fetch_all(&self.pool).await?;

        debug!(count = products.len(), total, "Product list returned");
        Ok(Page::new(products, page, total as u64))
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets an active product by ID.
    pub async fn get_active(&self, id: &str) -> DbResult<Option<Product>> {
        Ok(self.get_by_id(id).await?.filter(|p| p.is_active))
    }

    /// Gets an active product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1 AND is_active = 1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Loads the given products (active or not), keyed by id. Missing ids
    /// are simply absent from the map.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("
        ));
        let mut separated = select.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let products: Vec<Product> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Creates a product from validated input.
    ///
    /// ## Errors
    /// `UniqueViolation` on `products.code` when the code is taken.
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            category: input.category,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.insert(&product).await?;
        Ok(product)
    }

    /// Inserts a fully built product row.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, description, price_cents, stock,
                category, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&product.code))?;

        Ok(())
    }

    /// Applies a partial update. Inactive products can be edited (and
    /// reactivated through `is_active`).
    pub async fn update(&self, id: &str, changes: ProductChanges) -> DbResult<Product> {
        let mut product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        changes.apply(&mut product);
        product.updated_at = Utc::now();

        debug!(id = %id, code = %product.code, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET code = ?1, name = ?2, description = ?3, price_cents = ?4,
                stock = ?5, category = ?6, is_active = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
        )
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&product.code))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Soft-deletes an active product.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Overwrites the stock level of an active product (stock count,
    /// delivery received, shrinkage).
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<Product> {
        debug!(id = %id, stock, "Setting stock");

        let result = sqlx::query(
            "UPDATE products SET stock = ?1, updated_at = ?2 WHERE id = ?3 AND is_active = 1",
        )
        .bind(stock)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Active products with `stock <= threshold`, lowest stock first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND stock <= ?1 ORDER BY stock, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Number of product rows, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    qb.push(" WHERE is_active = 1");

    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        qb.push(" AND (instr(lower(name), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(code), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(coalesce(description, '')), ")
            .push_bind(needle)
            .push(") > 0)");
    }

    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;

    fn new_product(code: &str, name: &str, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: name.to_string(),
            description: None,
            price_cents,
            stock,
            category: Some("Bebidas".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();

        let created = repo
            .create(new_product(" COCA-500 ", "Coca-Cola 500ml", 500, 10))
            .await
            .unwrap();
        assert_eq!(created.code, "COCA-500");

        let by_id = repo.get_active(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_code = repo.get_by_code("COCA-500").await.unwrap().unwrap();
        assert_eq!(by_code.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();

        repo.create(new_product("AGUA-1L", "Agua 1L", 300, 5))
            .await
            .unwrap();
        let err = repo
            .create(new_product("AGUA-1L", "Agua otra", 300, 5))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("products.code"));
    }

    #[tokio::test]
    async fn test_list_search_and_paging() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();

        repo.create(new_product("COCA-500", "Coca-Cola 500ml", 500, 10)).await.unwrap();
        repo.create(new_product("COCA-1L", "Coca-Cola 1L", 900, 10)).await.unwrap();
        repo.create(new_product("PAN-01", "Pan de molde", 250, 10)).await.unwrap();

        let filter = ProductFilter {
            search: Some("coca".to_string()),
            category: None,
        };
        let page = repo.list(&filter, &PageRequest::new(1, 1)).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].code, "COCA-1L");

        let all = repo
            .list(&ProductFilter::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.items.len(), 3);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();
        repo.create(new_product("PAN-01", "Pan", 250, 10)).await.unwrap();

        let filter = ProductFilter {
            search: Some("%".to_string()),
            category: None,
        };
        let page = repo.list(&filter, &PageRequest::default()).await.unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_deactivate_hides_product() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();
        let p = repo.create(new_product("PAN-01", "Pan", 250, 10)).await.unwrap();

        repo.deactivate(&p.id).await.unwrap();

        assert!(repo.get_active(&p.id).await.unwrap().is_none());
        assert!(repo.get_by_code("PAN-01").await.unwrap().is_none());
        assert!(repo.get_by_id(&p.id).await.unwrap().is_some());
        assert!(matches!(
            repo.deactivate(&p.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_and_set_stock() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();
        let p = repo.create(new_product("PAN-01", "Pan", 250, 10)).await.unwrap();

        let updated = repo
            .update(
                &p.id,
                ProductChanges {
                    price_cents: Some(300),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 300);
        assert_eq!(updated.name, "Pan");

        let restocked = repo.set_stock(&p.id, 3).await.unwrap();
        assert_eq!(restocked.stock, 3);

        let low = repo.low_stock(5).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_many() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.products();
        let a = repo.create(new_product("A-1", "A", 100, 1)).await.unwrap();

        let found = repo
            .get_many(&[a.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&a.id));
    }
}
