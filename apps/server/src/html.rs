//! HTML pages: the printable invoice and the small shells around the API.

use chrono::NaiveDate;

use tillbook_core::checkout::POS_DESCRIPTION_PREFIX;
use tillbook_core::layout::format_date;
use tillbook_core::{Invoice, InvoiceStatus, Money};

/// Escapes text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn status_color(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Paid => "#4caf50",
        InvoiceStatus::Overdue => "#f44336",
        InvoiceStatus::Pending => "#2196f3",
    }
}

const PRINT_STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; margin: 0; color: #000; }
.page { max-width: 800px; margin: 0 auto; }
header { background: #1890ff; color: #fff; text-align: center; padding: 24px 0; }
header h1 { margin: 0; font-size: 32px; }
.top { display: flex; justify-content: space-between; padding: 24px 20px; border-bottom: 1px solid #c8c8c8; }
.muted { color: #646464; }
table { width: calc(100% - 40px); margin: 20px; border-collapse: collapse; }
th { background: #f5f5f5; text-align: left; padding: 8px; }
td { padding: 8px; }
tr:nth-child(even) td { background: #fafafa; }
.num { text-align: right; }
.totals { margin: 0 20px 0 auto; width: 260px; background: #f8f9fa; border: 1px solid #dcdcdc; padding: 12px; }
.totals div { display: flex; justify-content: space-between; margin: 4px 0; }
.description { padding: 0 20px; white-space: pre-wrap; }
footer { text-align: center; color: #646464; margin-top: 40px; }
@media print { .no-print { display: none; } }
"#;

/// Printable invoice that opens the browser's print dialog on load.
pub fn invoice_page(invoice: &Invoice, today: NaiveDate, currency_symbol: &str) -> String {
    let money = |cents: i64| escape(&Money::from_cents(cents).format_with(currency_symbol));
    let status = invoice.display_status(today);

    let body = if invoice.items.is_empty() {
        let description = match invoice.description.strip_prefix(POS_DESCRIPTION_PREFIX) {
            Some(items) => format!(
                "<p><strong>Point of Sale Transaction</strong></p><p>Items: {}</p>",
                escape(items)
            ),
            None => format!("<p>{}</p>", escape(&invoice.description)),
        };
        format!(r#"<section class="description"><h3>Description</h3>{description}</section>"#)
    } else {
        let rows: String = invoice
            .items
            .iter()
            .map(|l| {
                format!(
                    r#"<tr><td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
                    escape(&l.name),
                    l.quantity,
                    money(l.unit_price_cents),
                    money(l.total_cents),
                )
            })
            .collect();
        format!(
            r#"<table><thead><tr><th>Item</th><th class="num">Qty</th><th class="num">Price</th><th class="num">Total</th></tr></thead><tbody>{rows}</tbody></table>"#
        )
    };

    let email = invoice
        .email
        .as_deref()
        .map(|e| format!(r#"<div class="muted">{}</div>"#, escape(e)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Invoice {id}</title>
<style>{style}</style>
</head>
<body onload="window.print()">
<div class="page">
<header><h1>INVOICE</h1><div>Invoice #{id}</div></header>
<div class="top">
  <div><div class="muted">Bill To:</div><strong>{client}</strong>{email}</div>
  <div>
    <div>Invoice Date: {created}</div>
    <div>Due Date: {due}</div>
    <div>Status: <strong style="color: {color}">{status}</strong></div>
  </div>
</div>
{body}
<div class="totals">
  <div><span>Subtotal:</span><span>{amount}</span></div>
  <div><span>Tax:</span><span>{zero}</span></div>
  <div><strong>Total:</strong><strong>{amount}</strong></div>
</div>
<footer>Thank you for your business!</footer>
<p class="no-print" style="text-align:center"><button onclick="window.print()">Print</button></p>
</div>
</body>
</html>"#,
        id = escape(&invoice.id),
        style = PRINT_STYLE,
        client = escape(&invoice.client),
        email = email,
        created = format_date(invoice.created_at.date_naive()),
        due = format_date(invoice.due_date),
        color = status_color(status),
        status = status,
        body = body,
        amount = money(invoice.amount_cents),
        zero = money(0),
    )
}

const AUTH_SCRIPT: &str = r#"
async function submitAuth(event, path) {
  event.preventDefault();
  const form = event.target;
  const body = Object.fromEntries(new FormData(form));
  const res = await fetch(path, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    credentials: 'same-origin',
    body: JSON.stringify(body),
  });
  if (res.ok) { window.location = '/'; return; }
  const err = await res.json().catch(() => ({ message: 'Request failed' }));
  document.getElementById('error').textContent = err.message;
}
"#;

fn auth_page(title: &str, path: &str, confirm: bool, alternate: (&str, &str)) -> String {
    let confirm_field = if confirm {
        r#"<label>Confirm password <input name="confirmPassword" type="password" required></label>"#
    } else {
        ""
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Tillbook - {title}</title></head>
<body>
<h1>{title}</h1>
<form onsubmit="submitAuth(event, '{path}')">
<label>Email <input name="email" type="email" required></label>
<label>Password <input name="password" type="password" required></label>
{confirm_field}
<button type="submit">{title}</button>
</form>
<p id="error" style="color:#f44336"></p>
<p><a href="{alt_href}">{alt_label}</a></p>
<script>{script}</script>
</body>
</html>"#,
        alt_href = alternate.0,
        alt_label = alternate.1,
        script = AUTH_SCRIPT,
    )
}

pub fn login_page() -> String {
    auth_page("Sign in", "/api/auth/signin", false, ("/signup", "Create an account"))
}

pub fn signup_page() -> String {
    auth_page("Sign up", "/api/auth/signup", true, ("/login", "Already have an account? Sign in"))
}

/// Landing page for a signed-in user.
pub fn home_page(email: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Tillbook</title></head>
<body>
<h1>Tillbook</h1>
<p>Signed in as {}</p>
<ul>
<li><a href="/api/invoices">Invoices</a></li>
<li><a href="/api/products">Products</a></li>
<li><a href="/api/sales">Sales history</a></li>
<li><a href="/api/analytics">Analytics</a></li>
</ul>
</body>
</html>"#,
        escape(email)
    )
}
