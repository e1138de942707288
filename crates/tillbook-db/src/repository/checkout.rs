//! # Checkout Repository
//!
//! Commits a [`CheckoutPlan`] atomically.
//!
//! ## Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    BEGIN                                                │
//! │                      │                                                  │
//! │   for each line:     ▼                                                  │
//! │     UPDATE products SET stock = stock - qty ... RETURNING stock         │
//! │       ├── no row          → NotFound         ──► ROLLBACK               │
//! │       ├── stock < 0 and                                                 │
//! │       │   overselling off → InsufficientStock ──► ROLLBACK              │
//! │       └── stock < 0       → remember as oversold                        │
//! │                      │                                                  │
//! │     INSERT sale + sale_lines                                            │
//! │     INSERT invoice + invoice_lines                                      │
//! │                      │                                                  │
//! │                    COMMIT ──► publish Products, Sales, Invoices         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock UPDATE runs first so the write lock is taken up front; two
//! tills checking out at once serialize on it instead of failing on a
//! read-to-write lock upgrade.
//!
//! Any early return drops the transaction, which rolls it back.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::live::{ChangeFeed, Collection};
use crate::repository::invoice::insert_invoice;
use crate::repository::sale::insert_sale;
use tillbook_core::checkout::CheckoutPlan;
use tillbook_core::{Invoice, Sale};

/// What a committed checkout produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub sale: Sale,
    pub invoice: Invoice,
    /// Products whose stock went below zero with this checkout.
    pub oversold: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl CheckoutRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        CheckoutRepository { pool, feed }
    }

    /// Writes the sale, its paid invoice and the stock decrements, or none
    /// of them.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - A line's product no longer exists
    /// * `Err(DbError::InsufficientStock)` - Overselling is off and a line
    ///   asks for more than is on the shelf
    pub async fn commit(&self, plan: &CheckoutPlan, allow_negative_stock: bool) -> DbResult<CheckoutReceipt> {
        let user_id = plan.sale.user_id.as_str();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut oversold = Vec::new();
        for line in &plan.stock_moves {
            let remaining: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE products
                SET stock = stock - ?3, updated_at = ?4
                WHERE id = ?1 AND user_id = ?2
                RETURNING stock
                "#,
            )
            .bind(&line.product_id)
            .bind(user_id)
            .bind(line.quantity)
            .bind(plan.sale.created_at)
            .fetch_optional(&mut *tx)
            .await?;

            let remaining = remaining.ok_or_else(|| DbError::not_found("Product", &line.product_id))?;

            if remaining < 0 {
                if !allow_negative_stock {
                    return Err(DbError::InsufficientStock {
                        product: line.product_name.clone(),
                        available: remaining + line.quantity,
                        requested: line.quantity,
                    });
                }
                warn!(
                    product_id = %line.product_id,
                    product = %line.product_name,
                    stock = remaining,
                    "Checkout oversold product"
                );
                oversold.push(line.product_id.clone());
            }
        }

        insert_sale(&mut tx, &plan.sale).await?;
        insert_invoice(&mut tx, &plan.invoice).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            sale_id = %plan.sale.id,
            invoice_id = %plan.invoice.id,
            total_cents = plan.sale.total_cents,
            lines = plan.sale.items.len(),
            "Checkout committed"
        );

        self.feed.publish(Collection::Products, user_id);
        self.feed.publish(Collection::Sales, user_id);
        self.feed.publish(Collection::Invoices, user_id);

        Ok(CheckoutReceipt {
            sale: plan.sale.clone(),
            invoice: plan.invoice.clone(),
            oversold,
        })
    }
}
