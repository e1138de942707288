//! # Checkout
//!
//! Turns a cart snapshot into everything a POS checkout writes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart lines ──► plan_checkout() ──► CheckoutPlan                        │
//! │                                     ├── sale        (lines, total)      │
//! │                                     ├── invoice     (Paid, due today)   │
//! │                                     └── stock_moves (-qty per product)  │
//! │                                                                         │
//! │  tillbook-db commits the whole plan in ONE transaction:                 │
//! │  either all three land or none do.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartItem;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Invoice, InvoiceLine, InvoiceStatus, PaymentMethod, Sale, SaleLine};
use crate::validation::validate_email;
use crate::WALK_IN_CUSTOMER;

/// Leading text of every POS-derived invoice description.
pub const POS_DESCRIPTION_PREFIX: &str = "POS Sale - ";

/// What the cashier enters at the till besides the cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    /// Customer label; blank means an anonymous walk-in.
    pub customer: Option<String>,
    /// Where to send the invoice; blank means no email.
    pub customer_email: Option<String>,
}

/// One stock decrement produced by a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMove {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
}

/// Everything a checkout commits.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub sale: Sale,
    pub invoice: Invoice,
    pub stock_moves: Vec<StockMove>,
}

/// Derives the sale, its paid invoice and the stock decrements from the
/// cart lines captured by [`crate::Cart::begin_checkout`].
///
/// ## Derived invoice
/// - client: the customer label, or `Walk-in Customer`
/// - amount: the sale total
/// - status: `Paid`; due date: the checkout date
/// - description: `POS Sale - Cola (2), Chips (1)`
/// - email: the customer address when it is well formed, otherwise none.
///   A malformed address is reported by the notification step instead.
pub fn plan_checkout(
    user_id: &str,
    lines: &[CartItem],
    request: &CheckoutRequest,
    now: DateTime<Utc>,
) -> CoreResult<CheckoutPlan> {
    if lines.is_empty() {
        return Err(CoreError::CartEmpty);
    }

    let customer = trimmed(request.customer.as_deref());
    let email = trimmed(request.customer_email.as_deref())
        .and_then(|address| validate_email("customerEmail", &address).ok());

    let total: Money = lines.iter().map(CartItem::line_total).sum();

    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        items: lines
            .iter()
            .map(|l| SaleLine {
                product_id: l.product_id.clone(),
                product_name: l.name.clone(),
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
            })
            .collect(),
        total_cents: total.cents(),
        payment_method: request.payment_method,
        customer: customer.clone(),
        created_at: now,
    };

    let invoice = Invoice {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        client: customer.unwrap_or_else(|| WALK_IN_CUSTOMER.to_string()),
        email,
        amount_cents: total.cents(),
        description: pos_description(lines),
        items: lines
            .iter()
            .map(|l| InvoiceLine {
                name: l.name.clone(),
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
                total_cents: l.line_total().cents(),
            })
            .collect(),
        due_date: now.date_naive(),
        status: InvoiceStatus::Paid,
        created_at: now,
        sale_id: Some(sale.id.clone()),
    };

    let stock_moves = lines
        .iter()
        .map(|l| StockMove {
            product_id: l.product_id.clone(),
            product_name: l.name.clone(),
            quantity: l.quantity,
        })
        .collect();

    Ok(CheckoutPlan {
        sale,
        invoice,
        stock_moves,
    })
}

/// `POS Sale - Cola (2), Chips (1)`
pub fn pos_description(lines: &[CartItem]) -> String {
    let parts: Vec<String> = lines
        .iter()
        .map(|l| format!("{} ({})", l.name, l.quantity))
        .collect();
    format!("{}{}", POS_DESCRIPTION_PREFIX, parts.join(", "))
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(id: &str, name: &str, price: i64, qty: i64) -> CartItem {
        CartItem {
            product_id: id.to_string(),
            name: name.to_string(),
            unit_price_cents: price,
            quantity: qty,
            added_at: Utc::now(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_cash_checkout_without_email() {
        let lines = vec![line("A", "Alpha", 50, 2), line("B", "Beta", 30, 1)];
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            ..Default::default()
        };

        let plan = plan_checkout("u1", &lines, &request, now()).unwrap();

        assert_eq!(plan.sale.total_cents, 130);
        assert_eq!(plan.sale.items.len(), 2);
        assert_eq!(plan.sale.payment_method, PaymentMethod::Cash);
        assert_eq!(plan.invoice.amount_cents, 130);
        assert_eq!(plan.invoice.status, InvoiceStatus::Paid);
        assert_eq!(plan.invoice.client, WALK_IN_CUSTOMER);
        assert_eq!(plan.invoice.sale_id.as_deref(), Some(plan.sale.id.as_str()));
        assert_eq!(plan.invoice.due_date, now().date_naive());
        assert_eq!(plan.invoice.description, "POS Sale - Alpha (2), Beta (1)");
        assert_eq!(plan.invoice.items[0].total_cents, 100);
        assert!(plan.invoice.email.is_none());
    }

    #[test]
    fn test_customer_and_email_are_trimmed() {
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Card,
            customer: Some("  Priya ".to_string()),
            customer_email: Some(" priya@example.com ".to_string()),
        };

        let plan = plan_checkout("u1", &[line("A", "Alpha", 10, 1)], &request, now()).unwrap();

        assert_eq!(plan.sale.customer.as_deref(), Some("Priya"));
        assert_eq!(plan.invoice.client, "Priya");
        assert_eq!(plan.invoice.email.as_deref(), Some("priya@example.com"));
    }

    #[test]
    fn test_malformed_email_not_stored() {
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            customer: Some("Priya".to_string()),
            customer_email: Some("priya-at-example".to_string()),
        };

        let plan = plan_checkout("u1", &[line("A", "Alpha", 10, 1)], &request, now()).unwrap();

        assert!(plan.invoice.email.is_none());
        assert_eq!(plan.invoice.client, "Priya");
    }

    #[test]
    fn test_stock_moves_follow_lines() {
        let lines = vec![line("A", "Alpha", 50, 2), line("B", "Beta", 30, 5)];
        let plan = plan_checkout("u1", &lines, &CheckoutRequest::default(), now()).unwrap();

        let moves: Vec<(&str, i64)> = plan
            .stock_moves
            .iter()
            .map(|m| (m.product_id.as_str(), m.quantity))
            .collect();
        assert_eq!(moves, vec![("A", 2), ("B", 5)]);
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(
            plan_checkout("u1", &[], &CheckoutRequest::default(), now()),
            Err(CoreError::CartEmpty)
        );
    }
}
