//! # Invoice Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Invoice States                                      │
//! │                                                                         │
//! │   stored:    Pending ──────── mark_paid / edit ────────► Paid           │
//! │                 │                                         ▲             │
//! │   displayed:    │ due_date < today                        │             │
//! │                 ▼                                         │             │
//! │              Overdue ─────────── mark_paid ───────────────┘             │
//! │                                                                         │
//! │   Overdue is never written. It is a pure function of                   │
//! │   (due_date, stored status, today).                                    │
//! │   Paid ──► Pending is rejected. There is no delete.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Invoice, InvoiceStatus};
use crate::validation::InvoiceDraft;

/// Status an invoice shows on screen.
///
/// A due date is a whole calendar day: an invoice due today is not yet
/// overdue.
pub fn display_status(due_date: NaiveDate, status: InvoiceStatus, today: NaiveDate) -> InvoiceStatus {
    match status {
        InvoiceStatus::Paid => InvoiceStatus::Paid,
        _ if due_date < today => InvoiceStatus::Overdue,
        other => other,
    }
}

impl Invoice {
    pub fn display_status(&self, today: NaiveDate) -> InvoiceStatus {
        display_status(self.due_date, self.status, today)
    }
}

/// Checks a stored-status change requested by an edit.
pub fn check_transition(from: InvoiceStatus, to: InvoiceStatus) -> CoreResult<()> {
    if !to.is_storable() {
        return Err(CoreError::Validation(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["Pending".to_string(), "Paid".to_string()],
        }));
    }
    if from == InvoiceStatus::Paid && to == InvoiceStatus::Pending {
        return Err(CoreError::InvalidStatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

/// Applies a validated edit to an existing invoice. The link to an
/// originating sale and its line items are kept.
pub fn apply_update(invoice: &Invoice, draft: InvoiceDraft) -> CoreResult<Invoice> {
    check_transition(invoice.status, draft.status)?;
    Ok(Invoice {
        client: draft.client,
        email: draft.email,
        amount_cents: draft.amount_cents,
        description: draft.description,
        due_date: draft.due_date,
        status: draft.status,
        ..invoice.clone()
    })
}

/// Marks an invoice paid. Returns `false` when it already was.
pub fn mark_paid(invoice: &mut Invoice) -> bool {
    if invoice.status == InvoiceStatus::Paid {
        return false;
    }
    invoice.status = InvoiceStatus::Paid;
    true
}

// =============================================================================
// List Filter
// =============================================================================

/// Status filter on the invoice dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum InvoiceFilter {
    #[default]
    All,
    Paid,
    Pending,
    Overdue,
}

impl InvoiceFilter {
    /// Whether an invoice belongs in the filtered list, by display status.
    pub fn matches(&self, invoice: &Invoice, today: NaiveDate) -> bool {
        match self {
            InvoiceFilter::All => true,
            InvoiceFilter::Paid => invoice.display_status(today) == InvoiceStatus::Paid,
            InvoiceFilter::Pending => invoice.display_status(today) == InvoiceStatus::Pending,
            InvoiceFilter::Overdue => invoice.display_status(today) == InvoiceStatus::Overdue,
        }
    }
}

impl FromStr for InvoiceFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(InvoiceFilter::All),
            "paid" => Ok(InvoiceFilter::Paid),
            "pending" => Ok(InvoiceFilter::Pending),
            "overdue" => Ok(InvoiceFilter::Overdue),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ["All", "Paid", "Pending", "Overdue"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// An invoice together with the status it displays as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub display_status: InvoiceStatus,
}

impl InvoiceView {
    pub fn new(invoice: Invoice, today: NaiveDate) -> Self {
        let display_status = invoice.display_status(today);
        InvoiceView {
            invoice,
            display_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(due: NaiveDate, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            user_id: "u1".to_string(),
            client: "Acme".to_string(),
            email: None,
            amount_cents: 1000,
            description: "Work".to_string(),
            items: Vec::new(),
            due_date: due,
            status,
            created_at: Utc::now(),
            sale_id: None,
        }
    }

    #[test]
    fn test_past_due_pending_displays_overdue() {
        let today = date(2026, 6, 10);
        assert_eq!(
            display_status(date(2026, 6, 9), InvoiceStatus::Pending, today),
            InvoiceStatus::Overdue
        );
        assert_eq!(
            display_status(date(2026, 6, 10), InvoiceStatus::Pending, today),
            InvoiceStatus::Pending
        );
        assert_eq!(
            display_status(date(2020, 1, 1), InvoiceStatus::Paid, today),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn test_display_status_does_not_touch_stored_status() {
        let inv = invoice(date(2020, 1, 1), InvoiceStatus::Pending);
        assert_eq!(inv.display_status(date(2026, 1, 1)), InvoiceStatus::Overdue);
        assert_eq!(inv.status, InvoiceStatus::Pending);
    }

    #[test]
    fn test_mark_paid_is_idempotent() {
        let mut inv = invoice(date(2026, 1, 1), InvoiceStatus::Pending);
        assert!(mark_paid(&mut inv));
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert!(!mark_paid(&mut inv));
        assert_eq!(inv.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_paid_cannot_go_back_to_pending() {
        assert!(check_transition(InvoiceStatus::Pending, InvoiceStatus::Paid).is_ok());
        assert!(check_transition(InvoiceStatus::Paid, InvoiceStatus::Paid).is_ok());
        assert!(matches!(
            check_transition(InvoiceStatus::Paid, InvoiceStatus::Pending),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
        assert!(check_transition(InvoiceStatus::Pending, InvoiceStatus::Overdue).is_err());
    }

    #[test]
    fn test_apply_update_keeps_sale_link() {
        let mut inv = invoice(date(2026, 1, 1), InvoiceStatus::Pending);
        inv.sale_id = Some("sale-1".to_string());
        let draft = InvoiceDraft {
            client: "Acme Ltd".to_string(),
            email: Some("billing@acme.in".to_string()),
            amount_cents: 2500,
            description: "Revised".to_string(),
            due_date: date(2026, 2, 1),
            status: InvoiceStatus::Paid,
        };

        let updated = apply_update(&inv, draft).unwrap();
        assert_eq!(updated.id, inv.id);
        assert_eq!(updated.client, "Acme Ltd");
        assert_eq!(updated.status, InvoiceStatus::Paid);
        assert_eq!(updated.sale_id.as_deref(), Some("sale-1"));
    }

    #[test]
    fn test_filter_uses_display_status() {
        let today = date(2026, 6, 10);
        let overdue = invoice(date(2026, 6, 1), InvoiceStatus::Pending);
        let pending = invoice(date(2026, 7, 1), InvoiceStatus::Pending);

        assert!(InvoiceFilter::Overdue.matches(&overdue, today));
        assert!(!InvoiceFilter::Pending.matches(&overdue, today));
        assert!(InvoiceFilter::Pending.matches(&pending, today));
        assert!(InvoiceFilter::All.matches(&overdue, today));
        assert_eq!("overdue".parse::<InvoiceFilter>().unwrap(), InvoiceFilter::Overdue);
        assert!("late".parse::<InvoiceFilter>().is_err());
    }
}
