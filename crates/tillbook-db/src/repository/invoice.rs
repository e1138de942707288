//! # Invoice Repository
//!
//! Hand-written invoices are created and edited here; POS invoices are
//! written by the checkout transaction through [`insert_invoice`]. There is
//! no delete.
//!
//! Only `Pending` and `Paid` reach the `status` column. `Overdue` is
//! computed on read by `tillbook_core::invoice::display_status`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::live::{ChangeFeed, Collection};
use tillbook_core::validation::InvoiceDraft;
use tillbook_core::{Invoice, InvoiceLine, InvoiceStatus};

const INVOICE_COLUMNS: &str = r#"
    id, user_id, client, email, amount_cents, description, due_date, status, sale_id, created_at
"#;

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    user_id: String,
    client: String,
    email: Option<String>,
    amount_cents: i64,
    description: String,
    due_date: NaiveDate,
    status: InvoiceStatus,
    sale_id: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct InvoiceLineRow {
    invoice_id: String,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
    total_cents: i64,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceLine>) -> Invoice {
        Invoice {
            id: self.id,
            user_id: self.user_id,
            client: self.client,
            email: self.email,
            amount_cents: self.amount_cents,
            description: self.description,
            items,
            due_date: self.due_date,
            status: self.status,
            created_at: self.created_at,
            sale_id: self.sale_id,
        }
    }
}

impl From<InvoiceLineRow> for InvoiceLine {
    fn from(row: InvoiceLineRow) -> Self {
        InvoiceLine {
            name: row.name,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            total_cents: row.total_cents,
        }
    }
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        InvoiceRepository { pool, feed }
    }

    /// A user's invoices, newest first, with their lines.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = ?1 ORDER BY created_at DESC, id"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let lines = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT l.invoice_id, l.name, l.quantity, l.unit_price_cents, l.total_cents
            FROM invoice_lines l
            JOIN invoices i ON i.id = l.invoice_id
            WHERE i.user_id = ?1
            ORDER BY l.invoice_id, l.position
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_invoice: HashMap<String, Vec<InvoiceLine>> = HashMap::new();
        for line in lines {
            by_invoice.entry(line.invoice_id.clone()).or_default().push(line.into());
        }

        debug!(user_id, count = rows.len(), "Listed invoices");
        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_invoice.remove(&row.id).unwrap_or_default();
                row.into_invoice(items)
            })
            .collect())
    }

    /// Gets an invoice. Missing and not-owned are both `NotFound`.
    pub async fn get(&self, user_id: &str, id: &str) -> DbResult<Invoice> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;

        let lines = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT invoice_id, name, quantity, unit_price_cents, total_cents
            FROM invoice_lines
            WHERE invoice_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(row.into_invoice(lines.into_iter().map(InvoiceLine::from).collect()))
    }

    /// Creates a hand-written invoice from a validated form.
    pub async fn create(&self, user_id: &str, draft: InvoiceDraft) -> DbResult<Invoice> {
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            client: draft.client,
            email: draft.email,
            amount_cents: draft.amount_cents,
            description: draft.description,
            items: Vec::new(),
            due_date: draft.due_date,
            status: draft.status,
            created_at: Utc::now(),
            sale_id: None,
        };

        let mut conn = self.pool.acquire().await?;
        insert_invoice(&mut conn, &invoice).await?;

        self.feed.publish(Collection::Invoices, user_id);
        Ok(invoice)
    }

    /// Writes the editable fields of an invoice. Status transitions are
    /// checked by the caller (`tillbook_core::invoice::apply_update`).
    pub async fn update(&self, invoice: &Invoice) -> DbResult<Invoice> {
        debug!(id = %invoice.id, status = %invoice.status, "Updating invoice");

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                client = ?3,
                email = ?4,
                amount_cents = ?5,
                description = ?6,
                due_date = ?7,
                status = ?8,
                updated_at = ?9
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.user_id)
        .bind(&invoice.client)
        .bind(&invoice.email)
        .bind(invoice.amount_cents)
        .bind(&invoice.description)
        .bind(invoice.due_date)
        .bind(invoice.status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", &invoice.id));
        }

        self.feed.publish(Collection::Invoices, &invoice.user_id);
        self.get(&invoice.user_id, &invoice.id).await
    }

    /// Sets the stored status to `Paid`. Calling it on a paid invoice is a
    /// no-op that still returns the invoice.
    pub async fn mark_paid(&self, user_id: &str, id: &str) -> DbResult<Invoice> {
        let result = sqlx::query(
            "UPDATE invoices SET status = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2 AND status != ?3",
        )
        .bind(id)
        .bind(user_id)
        .bind(InvoiceStatus::Paid)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        // Zero rows: either already paid, or not ours; `get` tells which.
        let invoice = self.get(user_id, id).await?;
        if result.rows_affected() > 0 {
            debug!(id, "Invoice marked paid");
            self.feed.publish(Collection::Invoices, user_id);
        }
        Ok(invoice)
    }
}

/// Writes an invoice and its lines on an open connection.
pub(crate) async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, sale_id = ?invoice.sale_id, "Inserting invoice");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, user_id, client, email, amount_cents, description,
            due_date, status, sale_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.user_id)
    .bind(&invoice.client)
    .bind(&invoice.email)
    .bind(invoice.amount_cents)
    .bind(&invoice.description)
    .bind(invoice.due_date)
    .bind(invoice.status)
    .bind(&invoice.sale_id)
    .bind(invoice.created_at)
    .execute(&mut *conn)
    .await?;

    for (position, line) in invoice.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (invoice_id, position, name, quantity, unit_price_cents, total_cents)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&invoice.id)
        .bind(position as i64)
        .bind(&line.name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.total_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_user, db_with_user};
    use tillbook_core::invoice::apply_update;

    fn draft(client: &str, due: NaiveDate, status: InvoiceStatus) -> InvoiceDraft {
        InvoiceDraft {
            client: client.to_string(),
            email: None,
            amount_cents: 250_000,
            description: "Website design".to_string(),
            due_date: due,
            status,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let (db, user) = db_with_user("a@shop.in").await;
        let repo = db.invoices();

        let created = repo
            .create(&user, draft("Acme", day(2026, 12, 1), InvoiceStatus::Pending))
            .await
            .unwrap();
        let fetched = repo.get(&user, &created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert!(!fetched.is_pos_sale());
        assert_eq!(repo.list(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let (db, user) = db_with_user("a@shop.in").await;
        let repo = db.invoices();
        let inv = repo
            .create(&user, draft("Acme", day(2026, 12, 1), InvoiceStatus::Pending))
            .await
            .unwrap();

        assert_eq!(repo.mark_paid(&user, &inv.id).await.unwrap().status, InvoiceStatus::Paid);
        assert_eq!(repo.mark_paid(&user, &inv.id).await.unwrap().status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_foreign_invoice_is_not_found() {
        let (db, alice) = db_with_user("alice@shop.in").await;
        let bob = add_user(&db, "bob@shop.in").await;
        let repo = db.invoices();
        let inv = repo
            .create(&alice, draft("Acme", day(2026, 12, 1), InvoiceStatus::Pending))
            .await
            .unwrap();

        assert!(repo.get(&bob, &inv.id).await.unwrap_err().is_not_found());
        assert!(repo.mark_paid(&bob, &inv.id).await.unwrap_err().is_not_found());
        assert!(repo.list(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_writes_edit() {
        let (db, user) = db_with_user("a@shop.in").await;
        let repo = db.invoices();
        let inv = repo
            .create(&user, draft("Acme", day(2026, 12, 1), InvoiceStatus::Pending))
            .await
            .unwrap();

        let mut edit = draft("Acme Pvt Ltd", day(2020, 1, 1), InvoiceStatus::Paid);
        edit.email = Some("billing@acme.in".to_string());
        let edited = apply_update(&inv, edit).unwrap();
        let saved = repo.update(&edited).await.unwrap();

        assert_eq!(saved.client, "Acme Pvt Ltd");
        assert_eq!(saved.due_date, day(2020, 1, 1));
        assert_eq!(saved.status, InvoiceStatus::Paid);
        assert_eq!(saved.created_at, inv.created_at);
    }
}
