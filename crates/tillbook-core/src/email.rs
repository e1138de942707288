//! # Invoice Email Parameters
//!
//! Builds the template parameters for an invoice notification and checks
//! the preconditions for sending one. Delivery itself lives in the server
//! (`EmailSender`); nothing here touches the network.
//!
//! ```text
//!   invoice + lines ──► pos_invoice_params()    ──┐
//!   invoice ──────────► manual_invoice_params() ──┼──► EmailParams
//!                                                 │
//!   credentials + address ──► precheck() ─────────┴──► send or EmailOutcome::Failed
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Invoice, InvoiceLine};
use crate::validation::validate_email;

/// Name used when a POS customer left the name blank.
pub const DEFAULT_CUSTOMER_NAME: &str = "Valued Customer";

/// `items` text for invoices that carry no structured lines.
pub const MANUAL_ITEMS_TEXT: &str = "Please check the attached invoice for details";

/// Key value shipped in unconfigured deployments.
pub const PLACEHOLDER_PUBLIC_KEY: &str = "YOUR_EMAILJS_PUBLIC_KEY";

/// Template parameters, serialized with the provider's snake_case names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailParams {
    pub to_email: String,
    pub to_name: String,
    pub customer_name: String,
    pub invoice_id: String,
    /// Two decimals, no symbol: `"130.00"`.
    pub total_amount: String,
    pub invoice_url: String,
    pub items: String,
}

/// Provider credentials for the notification template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailCredentials {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

impl EmailCredentials {
    pub fn is_configured(&self) -> bool {
        let key = self.public_key.trim();
        !key.is_empty()
            && key != PLACEHOLDER_PUBLIC_KEY
            && !self.service_id.trim().is_empty()
            && !self.template_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailPrecheckError {
    #[error("Email service is not configured")]
    NotConfigured,

    #[error("Email address is required")]
    MissingAddress,

    #[error("Invalid email address format")]
    InvalidAddress,
}

/// What happened to the notification that accompanies a save or checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export)]
pub enum EmailOutcome {
    NotRequested,
    Sent,
    Failed { reason: String },
}

impl EmailOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        EmailOutcome::Failed {
            reason: reason.into(),
        }
    }
}

/// Checks that a notification can be attempted. Returns the trimmed address.
pub fn precheck(credentials: &EmailCredentials, address: &str) -> Result<String, EmailPrecheckError> {
    if !credentials.is_configured() {
        return Err(EmailPrecheckError::NotConfigured);
    }
    if address.trim().is_empty() {
        return Err(EmailPrecheckError::MissingAddress);
    }
    validate_email("email", address).map_err(|_| EmailPrecheckError::InvalidAddress)
}

/// `{base}/print/{id}`
pub fn invoice_url(public_base_url: &str, invoice_id: &str) -> String {
    format!("{}/print/{}", public_base_url.trim_end_matches('/'), invoice_id)
}

/// `Cola x 2 = ₹100.00`, one line per item.
pub fn format_item_lines(lines: &[InvoiceLine], currency_symbol: &str) -> String {
    lines
        .iter()
        .map(|l| {
            format!(
                "{} x {} = {}",
                l.name,
                l.quantity,
                Money::from_cents(l.total_cents).format_with(currency_symbol)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parameters for an invoice produced by a POS checkout.
pub fn pos_invoice_params(
    invoice: &Invoice,
    to_email: &str,
    customer_name: Option<&str>,
    public_base_url: &str,
    currency_symbol: &str,
) -> EmailParams {
    let name = customer_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_CUSTOMER_NAME)
        .to_string();

    EmailParams {
        to_email: to_email.trim().to_string(),
        to_name: name.clone(),
        customer_name: name,
        invoice_id: invoice.id.clone(),
        total_amount: invoice.amount().to_decimal_string(),
        invoice_url: invoice_url(public_base_url, &invoice.id),
        items: format_item_lines(&invoice.items, currency_symbol),
    }
}

/// Parameters for a hand-written invoice.
pub fn manual_invoice_params(invoice: &Invoice, to_email: &str, public_base_url: &str) -> EmailParams {
    EmailParams {
        to_email: to_email.trim().to_string(),
        to_name: invoice.client.clone(),
        customer_name: invoice.client.clone(),
        invoice_id: invoice.id.clone(),
        total_amount: invoice.amount().to_decimal_string(),
        invoice_url: invoice_url(public_base_url, &invoice.id),
        items: MANUAL_ITEMS_TEXT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvoiceStatus;
    use chrono::{NaiveDate, Utc};

    fn credentials() -> EmailCredentials {
        EmailCredentials {
            service_id: "service_x".to_string(),
            template_id: "template_x".to_string(),
            public_key: "pk_live".to_string(),
        }
    }

    fn pos_invoice() -> Invoice {
        Invoice {
            id: "inv-42".to_string(),
            user_id: "u1".to_string(),
            client: "Walk-in Customer".to_string(),
            email: Some("a@b.co".to_string()),
            amount_cents: 13000,
            description: "POS Sale - Alpha (2), Beta (1)".to_string(),
            items: vec![
                InvoiceLine {
                    name: "Alpha".to_string(),
                    quantity: 2,
                    unit_price_cents: 5000,
                    total_cents: 10000,
                },
                InvoiceLine {
                    name: "Beta".to_string(),
                    quantity: 1,
                    unit_price_cents: 3000,
                    total_cents: 3000,
                },
            ],
            due_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            status: InvoiceStatus::Paid,
            created_at: Utc::now(),
            sale_id: Some("sale-1".to_string()),
        }
    }

    #[test]
    fn test_pos_params() {
        let params = pos_invoice_params(&pos_invoice(), " a@b.co ", None, "https://shop.example/", "₹");

        assert_eq!(params.to_email, "a@b.co");
        assert_eq!(params.to_name, DEFAULT_CUSTOMER_NAME);
        assert_eq!(params.total_amount, "130.00");
        assert_eq!(params.invoice_url, "https://shop.example/print/inv-42");
        assert_eq!(params.items, "Alpha x 2 = ₹100.00\nBeta x 1 = ₹30.00");
    }

    #[test]
    fn test_manual_params_use_placeholder_items() {
        let mut invoice = pos_invoice();
        invoice.client = "Acme".to_string();
        invoice.items.clear();

        let params = manual_invoice_params(&invoice, "billing@acme.in", "http://localhost:8080");
        assert_eq!(params.customer_name, "Acme");
        assert_eq!(params.items, MANUAL_ITEMS_TEXT);
    }

    #[test]
    fn test_params_serialize_with_template_names() {
        let params = manual_invoice_params(&pos_invoice(), "a@b.co", "http://x");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["to_email"], "a@b.co");
        assert_eq!(json["total_amount"], "130.00");
    }

    #[test]
    fn test_precheck() {
        assert_eq!(precheck(&credentials(), " a@b.co ").unwrap(), "a@b.co");
        assert_eq!(precheck(&credentials(), "  "), Err(EmailPrecheckError::MissingAddress));
        assert_eq!(precheck(&credentials(), "a@b"), Err(EmailPrecheckError::InvalidAddress));

        let placeholder = EmailCredentials {
            public_key: PLACEHOLDER_PUBLIC_KEY.to_string(),
            ..credentials()
        };
        assert_eq!(precheck(&placeholder, "a@b.co"), Err(EmailPrecheckError::NotConfigured));
        assert_eq!(
            precheck(&EmailCredentials::default(), "a@b.co"),
            Err(EmailPrecheckError::NotConfigured)
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(EmailOutcome::failed("Invalid email address format")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "Invalid email address format");
        let json = serde_json::to_value(EmailOutcome::NotRequested).unwrap();
        assert_eq!(json["status"], "not_requested");
    }
}
