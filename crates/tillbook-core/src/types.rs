//! # Domain Types
//!
//! Core records shared by every layer of Tillbook.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  category       │   │  items[]  ──────┼──►│  items[]        │       │
//! │  │  price_cents    │   │  total_cents    │   │  amount_cents   │       │
//! │  │  stock          │   │  payment_method │   │  due_date       │       │
//! │  │  threshold      │   │  customer       │   │  status         │       │
//! │  └─────────────────┘   └────────┬────────┘   │  sale_id ───────┼──┐    │
//! │                                 └────────────┼─────────────────┼──┘    │
//! │                                              └─────────────────┘       │
//! │                                                                         │
//! │  Line items are SNAPSHOTS: name and price are copied at write time so  │
//! │  later catalog edits never rewrite history.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record carries `user_id`; all reads and writes are scoped by it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product Category
// =============================================================================

/// Fixed set of catalog categories.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ProductCategory {
    General,
    Beverages,
    Snacks,
    Electronics,
    Clothing,
    Other,
}

impl ProductCategory {
    /// Every category, in the order the catalog form lists them.
    pub const ALL: [ProductCategory; 6] = [
        ProductCategory::General,
        ProductCategory::Beverages,
        ProductCategory::Snacks,
        ProductCategory::Electronics,
        ProductCategory::Clothing,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::General => "General",
            ProductCategory::Beverages => "Beverages",
            ProductCategory::Snacks => "Snacks",
            ProductCategory::Electronics => "Electronics",
            ProductCategory::Clothing => "Clothing",
            ProductCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: ProductCategory::ALL.iter().map(|c| c.to_string()).collect(),
            })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owner of this catalog entry.
    pub user_id: String,

    pub name: String,

    pub category: ProductCategory,

    /// Unit price in minor units.
    pub price_cents: i64,

    /// Units on the shelf. Checkout may drive it negative when allowed.
    pub stock: i64,

    /// At or below this stock level the product is flagged low-stock.
    pub low_stock_threshold: i64,

    pub description: Option<String>,

    pub barcode: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// `stock <= threshold`.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Digital,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Digital];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Digital => "digital",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line of a completed sale. Name and price are frozen at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in minor units at time of sale (frozen).
    pub unit_price_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A completed POS sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub user_id: String,
    pub items: Vec<SaleLine>,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Free-text customer label typed at the till.
    pub customer: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Invoice status.
///
/// Only `Pending` and `Paid` are ever stored. `Overdue` is what a pending
/// invoice *displays as* once its due date has passed; see
/// [`crate::invoice::display_status`].
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
        }
    }

    /// Whether this status may be written to the store.
    #[inline]
    pub fn is_storable(&self) -> bool {
        !matches!(self, InvoiceStatus::Overdue)
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Pending
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["Pending".to_string(), "Paid".to_string()],
            }),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A structured invoice line (POS invoices carry these).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

/// An invoice, created by hand or derived from a POS checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub user_id: String,
    pub client: String,
    pub email: Option<String>,
    pub amount_cents: i64,
    pub description: String,
    /// Empty for hand-written invoices.
    pub items: Vec<InvoiceLine>,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Stored status: `Pending` or `Paid`.
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Set when the invoice was produced by a POS checkout.
    pub sale_id: Option<String>,
}

impl Invoice {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Whether this invoice came out of the POS.
    #[inline]
    pub fn is_pos_sale(&self) -> bool {
        self.sale_id.is_some()
    }
}

// =============================================================================
// User
// =============================================================================

/// A signed-up shop owner. The password hash never leaves tillbook-db.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
