//! # Validation Module
//!
//! Form validation for the catalog, invoice and sign-up screens.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend                                                      │
//! │  └── Immediate feedback while typing                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Route handler (Rust)                                          │
//! │  ├── Deserialization (FormNumber accepts 12, 12.5 or "12.5")           │
//! │  └── THIS MODULE: raw form ──► typed draft, or a field-level error     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  └── CHECK / NOT NULL / UNIQUE constraints                              │
//! │                                                                         │
//! │  A draft only exists if every rule passed, so no write can happen      │
//! │  with invalid input.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::validation::{validate_product, FormNumber, ProductForm};
//!
//! let form = ProductForm {
//!     name: "Cola".into(),
//!     category: "Beverages".into(),
//!     price: Some(FormNumber::Text("49.50".into())),
//!     stock: Some(FormNumber::Int(5)),
//!     ..Default::default()
//! };
//! let draft = validate_product(&form).unwrap();
//! assert_eq!(draft.price_cents, 4950);
//! assert_eq!(draft.low_stock_threshold, 10);
//! ```

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, MoneyParseError};
use crate::types::{InvoiceStatus, ProductCategory};
use crate::{DEFAULT_LOW_STOCK_THRESHOLD, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;
const MIN_PASSWORD_LEN: usize = 6;

/// Days after today that a new invoice falls due when the form leaves the
/// due date empty.
pub const DEFAULT_DUE_DAYS: u64 = 30;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

// =============================================================================
// Form Number
// =============================================================================

/// A numeric form field that may arrive as a JSON number or as the text the
/// user typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FormNumber {
    fn is_blank(&self) -> bool {
        matches!(self, FormNumber::Text(s) if s.trim().is_empty())
    }

    fn to_text(&self) -> String {
        match self {
            FormNumber::Int(i) => i.to_string(),
            FormNumber::Float(f) => f.to_string(),
            FormNumber::Text(s) => s.trim().to_string(),
        }
    }

    /// Parses as a money amount with at most two decimals.
    fn to_money(&self, field: &str) -> ValidationResult<Money> {
        Money::parse_decimal(&self.to_text()).map_err(|e| match e {
            MoneyParseError::Empty => ValidationError::Required {
                field: field.to_string(),
            },
            MoneyParseError::TooManyDecimals => ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "at most two decimal places".to_string(),
            },
            MoneyParseError::Invalid | MoneyParseError::Overflow => ValidationError::NotANumber {
                field: field.to_string(),
            },
        })
    }

    /// Parses as a whole number.
    fn to_whole(&self, field: &str) -> ValidationResult<i64> {
        match self {
            FormNumber::Int(i) => Ok(*i),
            FormNumber::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i64),
            FormNumber::Float(_) => Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "must be a whole number".to_string(),
            }),
            FormNumber::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Err(ValidationError::Required {
                        field: field.to_string(),
                    });
                }
                s.parse::<i64>().map_err(|_| match s.parse::<f64>() {
                    Ok(_) => ValidationError::InvalidFormat {
                        field: field.to_string(),
                        reason: "must be a whole number".to_string(),
                    },
                    Err(_) => ValidationError::NotANumber {
                        field: field.to_string(),
                    },
                })
            }
        }
    }
}

// =============================================================================
// Product Form
// =============================================================================

/// Product form as submitted by the catalog screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductForm {
    pub name: String,
    pub category: String,
    pub price: Option<FormNumber>,
    pub stock: Option<FormNumber>,
    /// Blank or absent means [`DEFAULT_LOW_STOCK_THRESHOLD`].
    #[serde(alias = "lowStockThreshold")]
    pub threshold: Option<FormNumber>,
    pub description: Option<String>,
    pub barcode: Option<String>,
}

/// A product form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub category: ProductCategory,
    pub price_cents: i64,
    pub stock: i64,
    pub low_stock_threshold: i64,
    pub description: Option<String>,
    pub barcode: Option<String>,
}

/// Validates a product form.
///
/// ## Rules
/// - name and category required, category from the fixed set
/// - price and stock required, numeric, not negative; stock whole
/// - threshold defaults to 10 when absent or blank, otherwise same as stock
/// - description and barcode kept only when non-blank
pub fn validate_product(form: &ProductForm) -> ValidationResult<ProductDraft> {
    let name = validate_product_name(&form.name)?;

    if form.category.trim().is_empty() {
        return Err(required("category"));
    }
    let category: ProductCategory = form.category.parse()?;

    let price = form
        .price
        .as_ref()
        .ok_or_else(|| required("price"))?
        .to_money("price")?;
    if price.is_negative() {
        return Err(negative("price"));
    }

    let stock = form
        .stock
        .as_ref()
        .ok_or_else(|| required("stock"))?
        .to_whole("stock")?;
    if stock < 0 {
        return Err(negative("stock"));
    }

    let low_stock_threshold = match &form.threshold {
        None => DEFAULT_LOW_STOCK_THRESHOLD,
        Some(t) if t.is_blank() => DEFAULT_LOW_STOCK_THRESHOLD,
        Some(t) => t.to_whole("threshold")?,
    };
    if low_stock_threshold < 0 {
        return Err(negative("threshold"));
    }

    Ok(ProductDraft {
        name,
        category,
        price_cents: price.cents(),
        stock,
        low_stock_threshold,
        description: non_blank(form.description.as_deref()),
        barcode: non_blank(form.barcode.as_deref()),
    })
}

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(required("name"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

// =============================================================================
// Invoice Form
// =============================================================================

/// Invoice form as submitted by the create/edit screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceForm {
    pub client: String,
    pub email: Option<String>,
    pub amount: Option<FormNumber>,
    pub description: String,
    /// `YYYY-MM-DD`.
    pub due_date: Option<String>,
    pub status: Option<String>,
}

/// An invoice form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub client: String,
    pub email: Option<String>,
    pub amount_cents: i64,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

/// Validates a new invoice. The due date may not lie before `today`; an
/// empty due date means `today + 30 days`.
pub fn validate_invoice_create(form: &InvoiceForm, today: NaiveDate) -> ValidationResult<InvoiceDraft> {
    let due_date = match form.due_date.as_deref().map(str::trim) {
        None | Some("") => today
            .checked_add_days(Days::new(DEFAULT_DUE_DAYS))
            .unwrap_or(today),
        Some(raw) => parse_date("dueDate", raw)?,
    };
    if due_date < today {
        return Err(ValidationError::DateInPast {
            field: "dueDate".to_string(),
        });
    }
    validate_invoice_fields(form, due_date)
}

/// Validates an edit of an existing invoice. Past due dates are allowed so
/// an overdue invoice can still be corrected.
pub fn validate_invoice_update(form: &InvoiceForm) -> ValidationResult<InvoiceDraft> {
    let raw = form
        .due_date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| required("dueDate"))?;
    let due_date = parse_date("dueDate", raw)?;
    validate_invoice_fields(form, due_date)
}

fn validate_invoice_fields(form: &InvoiceForm, due_date: NaiveDate) -> ValidationResult<InvoiceDraft> {
    let client = form.client.trim();
    if client.is_empty() {
        return Err(required("client"));
    }
    if client.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "client".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    let email = match non_blank(form.email.as_deref()) {
        Some(e) => Some(validate_email("email", &e)?),
        None => None,
    };

    let amount = form
        .amount
        .as_ref()
        .ok_or_else(|| required("amount"))?
        .to_money("amount")?;
    if amount.is_negative() {
        return Err(negative("amount"));
    }

    let description = form.description.trim();
    if description.is_empty() {
        return Err(required("description"));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    let status = match form.status.as_deref().map(str::trim) {
        None | Some("") => InvoiceStatus::Pending,
        Some(raw) => {
            let status: InvoiceStatus = raw.parse()?;
            if !status.is_storable() {
                return Err(ValidationError::NotAllowed {
                    field: "status".to_string(),
                    allowed: vec!["Pending".to_string(), "Paid".to_string()],
                });
            }
            status
        }
    };

    Ok(InvoiceDraft {
        client: client.to_string(),
        email,
        amount_cents: amount.cents(),
        description: description.to_string(),
        due_date,
        status,
    })
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(field: &str, raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "expected YYYY-MM-DD".to_string(),
    })
}

// =============================================================================
// Credentials
// =============================================================================

/// Validates an email address and returns it trimmed.
///
/// ```rust
/// use tillbook_core::validation::validate_email;
///
/// assert!(validate_email("email", " a@b.co ").is_ok());
/// assert!(validate_email("email", "a@b").is_err());
/// assert!(validate_email("email", "a b@c.d").is_err());
/// ```
pub fn validate_email(field: &str, email: &str) -> ValidationResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(required(field));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "not a valid email address".to_string(),
        });
    }
    Ok(email.to_string())
}

/// Validates a sign-up form. Returns the normalised (trimmed) email.
pub fn validate_sign_up(email: &str, password: &str, confirm: Option<&str>) -> ValidationResult<String> {
    let email = validate_email("email", email)?;

    if password.is_empty() {
        return Err(required("password"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    if let Some(confirm) = confirm {
        if confirm != password {
            return Err(ValidationError::Mismatch {
                field: "confirmPassword".to_string(),
            });
        }
    }

    Ok(email)
}

// =============================================================================
// Cart & Query Validators
// =============================================================================

/// Validates a cart line quantity (1..=999).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a free-text search query (at most 100 characters) and returns
/// it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a UUID path parameter.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn negative(field: &str) -> ValidationError {
    ValidationError::Negative {
        field: field.to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product_form() -> ProductForm {
        ProductForm {
            name: "Cola 330ml".to_string(),
            category: "Beverages".to_string(),
            price: Some(FormNumber::Float(49.5)),
            stock: Some(FormNumber::Int(5)),
            ..Default::default()
        }
    }

    fn invoice_form(due: &str) -> InvoiceForm {
        InvoiceForm {
            client: "Acme Traders".to_string(),
            email: None,
            amount: Some(FormNumber::Text("1200".to_string())),
            description: "Consulting".to_string(),
            due_date: Some(due.to_string()),
            status: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn test_product_threshold_defaults_to_ten() {
        let draft = validate_product(&product_form()).unwrap();
        assert_eq!(draft.low_stock_threshold, 10);
        assert_eq!(draft.stock, 5);
        assert_eq!(draft.price_cents, 4950);

        let mut form = product_form();
        form.threshold = Some(FormNumber::Text("  ".to_string()));
        assert_eq!(validate_product(&form).unwrap().low_stock_threshold, 10);

        form.threshold = Some(FormNumber::Text("3".to_string()));
        assert_eq!(validate_product(&form).unwrap().low_stock_threshold, 3);
    }

    #[test]
    fn test_product_required_fields() {
        let mut form = product_form();
        form.name = "   ".to_string();
        assert_eq!(validate_product(&form).unwrap_err().field(), "name");

        let mut form = product_form();
        form.category = String::new();
        assert_eq!(validate_product(&form).unwrap_err().field(), "category");

        let mut form = product_form();
        form.price = None;
        assert_eq!(validate_product(&form).unwrap_err().field(), "price");

        let mut form = product_form();
        form.stock = Some(FormNumber::Text(String::new()));
        assert_eq!(validate_product(&form).unwrap_err().field(), "stock");
    }

    #[test]
    fn test_product_rejects_negative_and_non_numeric() {
        let mut form = product_form();
        form.price = Some(FormNumber::Text("-1".to_string()));
        assert!(matches!(
            validate_product(&form),
            Err(ValidationError::Negative { .. })
        ));

        let mut form = product_form();
        form.stock = Some(FormNumber::Text("lots".to_string()));
        assert!(matches!(
            validate_product(&form),
            Err(ValidationError::NotANumber { .. })
        ));

        let mut form = product_form();
        form.stock = Some(FormNumber::Float(2.5));
        assert!(matches!(
            validate_product(&form),
            Err(ValidationError::InvalidFormat { .. })
        ));

        let mut form = product_form();
        form.threshold = Some(FormNumber::Int(-4));
        assert_eq!(validate_product(&form).unwrap_err().field(), "threshold");
    }

    #[test]
    fn test_product_description_kept_only_when_non_blank() {
        let mut form = product_form();
        form.description = Some("   ".to_string());
        assert_eq!(validate_product(&form).unwrap().description, None);

        form.description = Some("  Chilled  ".to_string());
        assert_eq!(
            validate_product(&form).unwrap().description.as_deref(),
            Some("Chilled")
        );
    }

    #[test]
    fn test_form_number_deserializes_from_number_or_text() {
        let form: ProductForm = serde_json::from_str(
            r#"{"name":"Chips","category":"Snacks","price":"20","stock":7,"lowStockThreshold":2}"#,
        )
        .unwrap();
        let draft = validate_product(&form).unwrap();
        assert_eq!(draft.price_cents, 2000);
        assert_eq!(draft.stock, 7);
        assert_eq!(draft.low_stock_threshold, 2);
    }

    #[test]
    fn test_invoice_due_date_in_past_rejected() {
        let err = validate_invoice_create(&invoice_form("2026-03-14"), today()).unwrap_err();
        assert!(matches!(err, ValidationError::DateInPast { .. }));

        assert!(validate_invoice_create(&invoice_form("2026-03-15"), today()).is_ok());
    }

    #[test]
    fn test_invoice_defaults() {
        let mut form = invoice_form("");
        form.due_date = None;
        let draft = validate_invoice_create(&form, today()).unwrap();
        assert_eq!(draft.status, InvoiceStatus::Pending);
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2026, 4, 14).unwrap());
        assert_eq!(draft.amount_cents, 120_000);
    }

    #[test]
    fn test_invoice_status_cannot_be_overdue() {
        let mut form = invoice_form("2026-04-01");
        form.status = Some("Overdue".to_string());
        assert_eq!(
            validate_invoice_create(&form, today()).unwrap_err().field(),
            "status"
        );

        form.status = Some("Paid".to_string());
        assert_eq!(
            validate_invoice_create(&form, today()).unwrap().status,
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn test_invoice_email_checked_when_present() {
        let mut form = invoice_form("2026-04-01");
        form.email = Some("not-an-email".to_string());
        assert_eq!(
            validate_invoice_create(&form, today()).unwrap_err().field(),
            "email"
        );

        form.email = Some("  ".to_string());
        assert_eq!(validate_invoice_create(&form, today()).unwrap().email, None);
    }

    #[test]
    fn test_invoice_update_allows_past_due_date() {
        let draft = validate_invoice_update(&invoice_form("2020-01-01")).unwrap();
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());

        let mut form = invoice_form("");
        form.due_date = None;
        assert_eq!(validate_invoice_update(&form).unwrap_err().field(), "dueDate");
    }

    #[test]
    fn test_sign_up_rules() {
        assert_eq!(
            validate_sign_up(" owner@shop.in ", "secret1", Some("secret1")).unwrap(),
            "owner@shop.in"
        );
        assert!(matches!(
            validate_sign_up("owner@shop.in", "short", None),
            Err(ValidationError::TooShort { .. })
        ));
        assert!(matches!(
            validate_sign_up("owner@shop.in", "secret1", Some("secret2")),
            Err(ValidationError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
