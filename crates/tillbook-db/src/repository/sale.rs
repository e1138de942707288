//! # Sale Repository
//!
//! Read side of the sales history. Sales are immutable and only ever
//! written by [`CheckoutRepository`](super::checkout::CheckoutRepository),
//! through [`insert_sale`] inside the checkout transaction.
//!
//! ## Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales (1) ──────────────< sale_lines (N)                               │
//! │  id, user_id, total,       sale_id, position, product_id,               │
//! │  payment_method, customer  product_name, quantity, unit_price           │
//! │                                                                         │
//! │  Lines are read back in `position` order: the order they had in the    │
//! │  cart.                                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillbook_core::{PaymentMethod, Sale, SaleLine};

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    user_id: String,
    total_cents: i64,
    payment_method: PaymentMethod,
    customer: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SaleLineRow {
    sale_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_cents: i64,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleLine>) -> Sale {
        Sale {
            id: self.id,
            user_id: self.user_id,
            items,
            total_cents: self.total_cents,
            payment_method: self.payment_method,
            customer: self.customer,
            created_at: self.created_at,
        }
    }
}

impl From<SaleLineRow> for SaleLine {
    fn from(row: SaleLineRow) -> Self {
        SaleLine {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
        }
    }
}

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// A user's sales, newest first, with their lines.
    ///
    /// ## Arguments
    /// * `limit` - Most recent N only; `None` for the whole history
    pub async fn list(&self, user_id: &str, limit: Option<u32>) -> DbResult<Vec<Sale>> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map(i64::from).unwrap_or(-1);

        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, user_id, total_cents, payment_method, customer, created_at
            FROM sales
            WHERE user_id = ?1
            ORDER BY created_at DESC, id
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, SaleLineRow>(
            r#"
            SELECT l.sale_id, l.product_id, l.product_name, l.quantity, l.unit_price_cents
            FROM sale_lines l
            WHERE l.sale_id IN (
                SELECT id FROM sales WHERE user_id = ?1 ORDER BY created_at DESC, id LIMIT ?2
            )
            ORDER BY l.sale_id, l.position
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
        for line in lines {
            by_sale.entry(line.sale_id.clone()).or_default().push(line.into());
        }

        debug!(user_id, count = rows.len(), "Listed sales");
        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_sale.remove(&row.id).unwrap_or_default();
                row.into_sale(items)
            })
            .collect())
    }

    /// Gets one sale with its lines.
    pub async fn get(&self, user_id: &str, id: &str) -> DbResult<Sale> {
        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, user_id, total_cents, payment_method, customer, created_at
            FROM sales
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", id))?;

        let lines = sqlx::query_as::<_, SaleLineRow>(
            r#"
            SELECT sale_id, product_id, product_name, quantity, unit_price_cents
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(row.into_sale(lines.into_iter().map(SaleLine::from).collect()))
    }

    pub async fn count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Writes a sale and its lines on an open connection (the checkout
/// transaction).
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total_cents = sale.total_cents, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (id, user_id, total_cents, payment_method, customer, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.user_id)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(&sale.customer)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for (position, line) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (sale_id, position, product_id, product_name, quantity, unit_price_cents)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&sale.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
