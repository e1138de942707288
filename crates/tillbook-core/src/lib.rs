//! # tillbook-core: Pure Business Logic for Tillbook
//!
//! Every rule the shop relies on lives here as a pure function: what a valid
//! product looks like, how a cart behaves, what a checkout writes, when an
//! invoice counts as overdue, and how the invoice page is laid out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Web frontend (catalog, POS, invoices)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / SSE                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tillbook-server (axum routes)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tillbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │   cart   │ │ invoice │ │ layout │  │   │
//! │  │   │ Product │ │  Money  │ │ checkout │ │ status  │ │  PDF   │  │   │
//! │  │   │  Sale   │ │ parsing │ │  states  │ │  email  │ │  ops   │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                tillbook-db (SQLite + change feed)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Sale, Invoice, User)
//! - [`money`] - Integer money with decimal parsing and formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Product, invoice and credential form rules
//! - [`cart`] - POS cart state machine
//! - [`checkout`] - Sale + invoice derivation from a cart snapshot
//! - [`invoice`] - Display status and lifecycle transitions
//! - [`analytics`] - Dashboard aggregates and sales history filtering
//! - [`email`] - Notification template parameters
//! - [`layout`] - Invoice page as a list of drawing operations
//!
//! ## Example Usage
//!
//! ```rust
//! use tillbook_core::money::Money;
//!
//! let price = Money::parse_decimal("49.50").unwrap();
//! assert_eq!(price.cents(), 4950);
//! assert_eq!((price * 2).to_decimal_string(), "99.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod error;
pub mod invoice;
pub mod layout;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartPhase};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in the cart.
///
/// Stops fat-finger entries (1000 instead of 10) at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Low-stock threshold applied when the product form leaves it blank.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Number of most recent sales the analytics views read.
pub const ANALYTICS_SALES_LIMIT: u32 = 100;

/// Currency symbol used when nothing else is configured.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

/// Client name written on invoices produced by an anonymous POS checkout.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";
