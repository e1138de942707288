//! # tillbook-db: Database Layer for Tillbook
//!
//! SQLite persistence for users, sessions, the catalog, sales and invoices,
//! plus the change feed that powers live views.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /api/pos/checkout)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tillbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceRepo   │    │ 001_initial  │  │   │
//! │  │   │ ChangeFeed    │    │ CheckoutRepo  │    │ _schema.sql  │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ publish                                             │   │
//! │  │           ▼                                                     │   │
//! │  │   live.rs: LiveStream<T> (snapshot, re-query on change)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`live`] - Change feed and live queries
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tillbook.db")).await?;
//!
//! let low = db.products().low_stock(&user_id).await?;
//! let receipt = db.checkout().commit(&plan, true).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod live;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use live::{Change, ChangeFeed, Collection, LiveStream};
pub use pool::{Database, DbConfig};

pub use repository::checkout::{CheckoutReceipt, CheckoutRepository};
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::session::SessionRepository;
pub use repository::user::{UserCredentials, UserRepository};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Database, DbConfig};

    /// A fresh in-memory database with one signed-up user.
    pub async fn db_with_user(email: &str) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = add_user(&db, email).await;
        (db, user)
    }

    pub async fn add_user(db: &Database, email: &str) -> String {
        db.users().create(email, "not-a-real-hash").await.unwrap().id
    }
}
