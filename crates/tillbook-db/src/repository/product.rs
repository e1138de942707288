//! # Product Repository
//!
//! Catalog CRUD, category and low-stock queries. Every statement is scoped
//! by `user_id`; every successful write is announced on the change feed.
//!
//! ## Low-Stock Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock <= low_stock_threshold  ──►  low stock                          │
//! │                                                                         │
//! │  Cola   stock  4 / threshold 10  ──► LOW                               │
//! │  Tea    stock 10 / threshold 10  ──► LOW   (inclusive)                 │
//! │  Chips  stock 40 / threshold 10  ──► ok                                │
//! │  Cable  stock  0 / threshold  0  ──► LOW   (explicit zero is kept)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::live::{ChangeFeed, Collection};
use tillbook_core::validation::ProductDraft;
use tillbook_core::{Product, ProductCategory};

const PRODUCT_COLUMNS: &str = r#"
    id, user_id, name, category, price_cents, stock, low_stock_threshold,
    description, barcode, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    user_id: String,
    name: String,
    category: ProductCategory,
    price_cents: i64,
    stock: i64,
    low_stock_threshold: i64,
    description: Option<String>,
    barcode: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            category: row.category,
            price_cents: row.price_cents,
            stock: row.stock,
            low_stock_threshold: row.low_stock_threshold,
            description: row.description,
            barcode: row.barcode,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let all = repo.list(&user_id).await?;
/// let snacks = repo.list_by_category(&user_id, ProductCategory::Snacks).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ProductRepository { pool, feed }
    }

    /// All of a user's products, by name.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = ?1 ORDER BY name COLLATE NOCASE, id"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(user_id, count = rows.len(), "Listed products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// The POS grid filtered to one category.
    pub async fn list_by_category(&self, user_id: &str, category: ProductCategory) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE user_id = ?1 AND category = ?2 ORDER BY name COLLATE NOCASE, id"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(user_id)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Products at or below their low-stock threshold, emptiest first.
    pub async fn low_stock(&self, user_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE user_id = ?1 AND stock <= low_stock_threshold ORDER BY stock, name COLLATE NOCASE"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found and owned by `user_id`
    /// * `Ok(None)` - Product missing or owned by someone else
    pub async fn find(&self, user_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Like [`find`](Self::find) but a missing product is an error.
    pub async fn get(&self, user_id: &str, id: &str) -> DbResult<Product> {
        self.find(user_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Inserts a validated product.
    pub async fn insert(&self, user_id: &str, draft: &ProductDraft) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: draft.name.clone(),
            category: draft.category,
            price_cents: draft.price_cents,
            stock: draft.stock,
            low_stock_threshold: draft.low_stock_threshold,
            description: draft.description.clone(),
            barcode: draft.barcode.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, user_id, name, category, price_cents, stock,
                low_stock_threshold, description, barcode, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.user_id)
        .bind(&product.name)
        .bind(product.category)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        self.feed.publish(Collection::Products, user_id);
        Ok(product)
    }

    /// Replaces every editable field of a product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The product as now stored
    /// * `Err(DbError::NotFound)` - Product missing or not owned by `user_id`
    pub async fn update(&self, user_id: &str, id: &str, draft: &ProductDraft) -> DbResult<Product> {
        debug!(id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                category = ?4,
                price_cents = ?5,
                stock = ?6,
                low_stock_threshold = ?7,
                description = ?8,
                barcode = ?9,
                updated_at = ?10
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&draft.name)
        .bind(draft.category)
        .bind(draft.price_cents)
        .bind(draft.stock)
        .bind(draft.low_stock_threshold)
        .bind(&draft.description)
        .bind(&draft.barcode)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.feed.publish(Collection::Products, user_id);
        self.get(user_id, id).await
    }

    /// Deletes a product. Past sales keep their snapshot of it.
    pub async fn delete(&self, user_id: &str, id: &str) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.feed.publish(Collection::Products, user_id);
        Ok(())
    }

    /// Counts a user's products (for diagnostics and the seed tool).
    pub async fn count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::db_with_user;

    fn draft(name: &str, category: ProductCategory, stock: i64, threshold: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            category,
            price_cents: 5000,
            stock,
            low_stock_threshold: threshold,
            description: None,
            barcode: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_sorted_by_name() {
        let (db, user) = db_with_user("a@shop.in").await;
        let repo = db.products();

        repo.insert(&user, &draft("chips", ProductCategory::Snacks, 40, 10)).await.unwrap();
        repo.insert(&user, &draft("Cola", ProductCategory::Beverages, 4, 10)).await.unwrap();

        let names: Vec<String> = repo.list(&user).await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["chips", "Cola"]);
        assert_eq!(repo.count(&user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_other_users_products_are_invisible() {
        let (db, alice) = db_with_user("alice@shop.in").await;
        let bob = crate::test_support::add_user(&db, "bob@shop.in").await;
        let repo = db.products();

        let p = repo.insert(&alice, &draft("Cola", ProductCategory::Beverages, 5, 10)).await.unwrap();

        assert!(repo.list(&bob).await.unwrap().is_empty());
        assert!(repo.find(&bob, &p.id).await.unwrap().is_none());
        assert!(repo.delete(&bob, &p.id).await.unwrap_err().is_not_found());
        assert!(repo
            .update(&bob, &p.id, &draft("Hijack", ProductCategory::Other, 0, 0))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_low_stock_and_category_filters() {
        let (db, user) = db_with_user("a@shop.in").await;
        let repo = db.products();

        repo.insert(&user, &draft("Cola", ProductCategory::Beverages, 4, 10)).await.unwrap();
        repo.insert(&user, &draft("Tea", ProductCategory::Beverages, 10, 10)).await.unwrap();
        repo.insert(&user, &draft("Chips", ProductCategory::Snacks, 40, 10)).await.unwrap();
        repo.insert(&user, &draft("Cable", ProductCategory::Electronics, 0, 0)).await.unwrap();

        let low: Vec<String> = repo.low_stock(&user).await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(low, vec!["Cable", "Cola", "Tea"]);

        let drinks = repo.list_by_category(&user, ProductCategory::Beverages).await.unwrap();
        assert_eq!(drinks.len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, user) = db_with_user("a@shop.in").await;
        let repo = db.products();
        let p = repo.insert(&user, &draft("Cola", ProductCategory::Beverages, 5, 10)).await.unwrap();

        let mut changed = draft("Cola Zero", ProductCategory::Beverages, 12, 3);
        changed.barcode = Some("8901234567890".to_string());
        let updated = repo.update(&user, &p.id, &changed).await.unwrap();
        assert_eq!(updated.name, "Cola Zero");
        assert_eq!(updated.stock, 12);
        assert_eq!(updated.barcode.as_deref(), Some("8901234567890"));
        assert_eq!(updated.created_at, p.created_at);

        repo.delete(&user, &p.id).await.unwrap();
        assert!(repo.get(&user, &p.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        use futures::StreamExt;

        let (db, user) = db_with_user("a@shop.in").await;
        let repo = db.products();
        let live_repo = repo.clone();
        let live_user = user.clone();
        let mut live = db.feed().live(&user, &[Collection::Products], move || {
            let repo = live_repo.clone();
            let user = live_user.clone();
            async move { repo.list(&user).await }
        });

        assert!(live.next().await.unwrap().unwrap().is_empty());
        repo.insert(&user, &draft("Cola", ProductCategory::Beverages, 5, 10)).await.unwrap();
        assert_eq!(live.next().await.unwrap().unwrap().len(), 1);
    }
}
