//! # Analytics
//!
//! Dashboard aggregates over a user's sales, invoices and products, plus
//! the search/date filter behind the sales history page.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  recent sales (≤100) ─┐                                                 │
//! │  invoices ────────────┼──► summarize() ──► AnalyticsSummary             │
//! │  products ────────────┘                                                 │
//! │                                                                         │
//! │  all sales ──► SalesFilter::apply() ──► filtered ──► SalesSummary       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice status counts use the *display* status, so a pending invoice
//! past its due date is counted as overdue.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, PaymentMethod, Product, ProductCategory, Sale};

/// Number of rows per page on the sales history table.
pub const SALES_PAGE_SIZE: usize = 50;

// =============================================================================
// Dashboard Summary
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusCounts {
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentMethodCounts {
    pub cash: usize,
    pub card: usize,
    pub digital: usize,
}

impl PaymentMethodCounts {
    fn record(&mut self, method: PaymentMethod) {
        match method {
            PaymentMethod::Cash => self.cash += 1,
            PaymentMethod::Card => self.card += 1,
            PaymentMethod::Digital => self.digital += 1,
        }
    }
}

/// Low-stock row for the alert table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockItem {
    pub product_id: String,
    pub name: String,
    pub category: ProductCategory,
    pub stock: i64,
    pub low_stock_threshold: i64,
}

impl From<&Product> for LowStockItem {
    fn from(p: &Product) -> Self {
        LowStockItem {
            product_id: p.id.clone(),
            name: p.name.clone(),
            category: p.category,
            stock: p.stock,
            low_stock_threshold: p.low_stock_threshold,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsSummary {
    pub total_revenue_cents: i64,
    pub total_invoice_amount_cents: i64,
    pub sale_count: usize,
    pub invoice_count: usize,
    pub invoice_status: StatusCounts,
    pub payment_methods: PaymentMethodCounts,
    /// Product count per category; categories with no products are absent.
    #[ts(as = "BTreeMap<String, usize>")]
    pub products_by_category: BTreeMap<ProductCategory, usize>,
    pub low_stock: Vec<LowStockItem>,
}

/// Aggregates the dashboard numbers.
///
/// `sales` is expected to already be the most recent window (see
/// [`crate::ANALYTICS_SALES_LIMIT`]); invoices and products are complete.
pub fn summarize(
    sales: &[Sale],
    invoices: &[Invoice],
    products: &[Product],
    today: NaiveDate,
) -> AnalyticsSummary {
    let mut summary = AnalyticsSummary {
        total_revenue_cents: sales.iter().map(Sale::total).sum::<Money>().cents(),
        total_invoice_amount_cents: invoices.iter().map(Invoice::amount).sum::<Money>().cents(),
        sale_count: sales.len(),
        invoice_count: invoices.len(),
        ..Default::default()
    };

    for invoice in invoices {
        match invoice.display_status(today) {
            InvoiceStatus::Paid => summary.invoice_status.paid += 1,
            InvoiceStatus::Pending => summary.invoice_status.pending += 1,
            InvoiceStatus::Overdue => summary.invoice_status.overdue += 1,
        }
    }

    for sale in sales {
        summary.payment_methods.record(sale.payment_method);
    }

    for product in products {
        *summary.products_by_category.entry(product.category).or_default() += 1;
    }

    summary.low_stock = products
        .iter()
        .filter(|p| p.is_low_stock())
        .map(LowStockItem::from)
        .collect();

    summary
}

// =============================================================================
// Sales History
// =============================================================================

/// Search and date-range filter for the sales history table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct SalesFilter {
    /// Matched case-insensitively against item names and payment method.
    pub query: Option<String>,
    /// First day included (UTC calendar day).
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    /// Last day included (UTC calendar day).
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}

impl SalesFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = query.to_lowercase();
            let by_item = sale
                .items
                .iter()
                .any(|line| line.product_name.to_lowercase().contains(&needle));
            let by_method = sale.payment_method.as_str().contains(&needle);
            if !by_item && !by_method {
                return false;
            }
        }

        let day = sale.created_at.date_naive();
        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }
        true
    }

    /// Filters `sales`, keeping their order.
    pub fn apply<'a>(&self, sales: &'a [Sale]) -> Vec<&'a Sale> {
        sales.iter().filter(|s| self.matches(s)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummary {
    pub revenue_cents: i64,
    pub count: usize,
    /// Revenue divided by count, rounded half away from zero; zero when empty.
    pub average_order_cents: i64,
}

impl SalesSummary {
    pub fn of<'a, I>(sales: I) -> Self
    where
        I: IntoIterator<Item = &'a Sale>,
    {
        let (revenue, count) = sales
            .into_iter()
            .fold((0i64, 0usize), |(sum, n), s| (sum + s.total_cents, n + 1));

        let average = if count == 0 {
            0
        } else {
            let n = count as i64;
            let half = if revenue >= 0 { n / 2 } else { -(n / 2) };
            (revenue + half) / n
        };

        SalesSummary {
            revenue_cents: revenue,
            count,
            average_order_cents: average,
        }
    }
}
