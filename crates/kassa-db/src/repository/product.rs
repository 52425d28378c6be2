//! # Product Repository
//!
//! Database operations for the shop catalog.
//!
//! ## Key Operations
//! - In-stock listing in display order (what the shop shows)
//! - Full listing for the back office
//! - Validated inserts
//!
//! Prices are stored ex. moms in öre. `tax_category` may be NULL on rows
//! created before categories existed; such products price at the reduced
//! rate. New rows always carry a category.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kassa_core::validation::validate_new_product;
use kassa_core::{Money, NewProduct, Product, TaxCategory};

const PRODUCT_COLUMNS: &str = "id, title, description, price, original_price, tax_category, \
     discount_active, in_stock, sort_order, created_at, updated_at";

/// Row shape of the `products` table.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    title: String,
    description: Option<String>,
    price: i64,
    original_price: Option<i64>,
    tax_category: Option<TaxCategory>,
    discount_active: bool,
    in_stock: bool,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            description: row.description,
            price: Money::from_ore(row.price),
            original_price: row.original_price.map(Money::from_ore),
            tax_category: row.tax_category,
            discount_active: row.discount_active,
            in_stock: row.in_stock,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let shop = repo.list_in_stock().await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products currently in stock, in display order.
    ///
    /// Ordered by `sort_order`, then title so equal sort keys stay stable.
    pub async fn list_in_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE in_stock = 1 ORDER BY sort_order, title"
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Listed in-stock products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Lists every product, including out-of-stock ones.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sort_order, title");
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Gets a product by ID, failing with [`DbError::NotFound`] when absent.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Inserts a new product.
    ///
    /// The repository assigns the id and timestamps. The product is
    /// validated first; a missing tax category is rejected here.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::Validation)` - The input broke a field rule
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            description: new.description.clone(),
            price: new.price,
            original_price: new.original_price,
            tax_category: new.tax_category,
            discount_active: new.discount_active,
            in_stock: new.in_stock,
            sort_order: new.sort_order,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, title = %product.title, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, description, price, original_price, tax_category,
                discount_active, in_stock, sort_order, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price.ore())
        .bind(product.original_price.map(|m| m.ore()))
        .bind(product.tax_category)
        .bind(product.discount_active)
        .bind(product.in_stock)
        .bind(product.sort_order)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Flips a product's stock flag.
    pub async fn set_in_stock(&self, id: &str, in_stock: bool) -> DbResult<()> {
        debug!(id = %id, in_stock, "Updating stock flag");

        let result = sqlx::query("UPDATE products SET in_stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(in_stock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use kassa_core::ValidationError;

    async fn repo() -> ProductRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
    }

    fn book(title: &str, sort_order: i64) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: None,
            price: Money::from_kronor(94),
            original_price: None,
            tax_category: Some(TaxCategory::Book),
            discount_active: false,
            in_stock: true,
            sort_order,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let stored = repo.insert(&book("Att bli till", 1)).await.unwrap();

        let loaded = repo.get_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Att bli till");
        assert_eq!(loaded.price, Money::from_kronor(94));
        assert_eq!(loaded.tax_category, Some(TaxCategory::Book));
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_in_stock_orders_and_filters() {
        let repo = repo().await;
        repo.insert(&book("B", 2)).await.unwrap();
        repo.insert(&book("A", 1)).await.unwrap();
        let hidden = repo.insert(&book("C", 0)).await.unwrap();
        repo.set_in_stock(&hidden.id, false).await.unwrap();

        let titles: Vec<String> = repo
            .list_in_stock()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_insert_requires_category() {
        let repo = repo().await;
        let mut product = book("Utan moms", 0);
        product.tax_category = None;

        let err = repo.insert(&product).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::Required { .. })
        ));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_legacy_row_without_category_loads() {
        let repo = repo().await;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO products (id, title, price, created_at, updated_at) VALUES ('old', 'Gammal bok', 9400, ?1, ?1)",
        )
        .bind(now)
        .execute(&repo.pool)
        .await
        .unwrap();

        let product = repo.require("old").await.unwrap();
        assert_eq!(product.tax_category, None);
        assert!(product.in_stock);
    }

    #[tokio::test]
    async fn test_set_in_stock_missing_product() {
        let repo = repo().await;
        let err = repo.set_in_stock("missing", false).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
