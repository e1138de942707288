//! # Repository Module
//!
//! Database repository implementations for Tillbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().list(&user_id)                                  │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list / list_by_category / low_stock                               │
//! │  ├── get                                                               │
//! │  ├── insert / update / delete ──► ChangeFeed::publish                  │
//! │       │                                                                 │
//! │       │  SQL (always filtered by user_id)                               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A record owned by another user is reported exactly like a missing one.
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Sign-up and credential lookup
//! - [`session::SessionRepository`] - Issued tokens and sign-out
//! - [`product::ProductRepository`] - Catalog CRUD and low-stock queries
//! - [`sale::SaleRepository`] - Sales history reads
//! - [`invoice::InvoiceRepository`] - Invoice create/edit/mark-paid
//! - [`checkout::CheckoutRepository`] - Atomic POS checkout commit

pub mod checkout;
pub mod invoice;
pub mod product;
pub mod sale;
pub mod session;
pub mod user;

