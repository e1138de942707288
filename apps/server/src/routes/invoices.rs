//! Invoice endpoints.
//!
//! Lists and single reads return [`InvoiceView`], which carries the status
//! the invoice displays as today (an unpaid invoice past its due date shows
//! as `Overdue`). Saves that name an email address attempt one notification
//! and report the outcome next to the saved invoice.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use tillbook_core::email::{manual_invoice_params, EmailOutcome};
use tillbook_core::invoice::{apply_update, InvoiceFilter, InvoiceView};
use tillbook_core::layout::layout_invoice;
use tillbook_core::validation::{validate_invoice_create, validate_invoice_update, InvoiceForm};
use tillbook_core::Invoice;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::pdf::{pdf_currency_symbol, render_pdf};
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/invoices", get(list_invoices).post(create_invoice))
        .route("/api/invoices/{id}", get(get_invoice).put(update_invoice))
        .route("/api/invoices/{id}/mark-paid", post(mark_paid))
        .route("/api/invoices/{id}/pdf", get(download_pdf))
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedInvoice {
    pub invoice: InvoiceView,
    pub email: EmailOutcome,
}

async fn list_invoices(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<InvoiceQuery>,
) -> ApiResult<Json<Vec<InvoiceView>>> {
    let filter: InvoiceFilter = query.status.as_deref().unwrap_or_default().parse()?;
    let today = state.today();

    let invoices = state
        .db
        .invoices()
        .list(&user.user_id)
        .await?
        .into_iter()
        .filter(|inv| filter.matches(inv, today))
        .map(|inv| InvoiceView::new(inv, today))
        .collect();
    Ok(Json(invoices))
}

async fn get_invoice(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceView>> {
    let invoice = state.db.invoices().get(&user.user_id, &id).await?;
    Ok(Json(InvoiceView::new(invoice, state.today())))
}

async fn create_invoice(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Json(form): Json<InvoiceForm>,
) -> ApiResult<(StatusCode, Json<SavedInvoice>)> {
    let draft = validate_invoice_create(&form, state.today())?;
    let invoice = state.db.invoices().create(&user.user_id, draft).await?;
    info!(invoice_id = %invoice.id, "Invoice created");

    let saved = saved(&state, invoice).await;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn update_invoice(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(mut form): Json<InvoiceForm>,
) -> ApiResult<Json<SavedInvoice>> {
    let current = state.db.invoices().get(&user.user_id, &id).await?;

    // No status in the edit keeps the stored one
    if form.status.as_deref().map_or(true, |s| s.trim().is_empty()) {
        form.status = Some(current.status.to_string());
    }
    let draft = validate_invoice_update(&form)?;
    let next = apply_update(&current, draft)?;
    let invoice = state.db.invoices().update(&next).await?;
    info!(invoice_id = %invoice.id, "Invoice updated");

    Ok(Json(saved(&state, invoice).await))
}

/// Idempotent: marking a paid invoice again returns it unchanged.
async fn mark_paid(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceView>> {
    let invoice = state.db.invoices().mark_paid(&user.user_id, &id).await?;
    Ok(Json(InvoiceView::new(invoice, state.today())))
}

async fn download_pdf(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let invoice = state.db.invoices().get(&user.user_id, &id).await?;
    let symbol = pdf_currency_symbol(&state.config.currency_symbol);
    let page = layout_invoice(&invoice, state.today(), &symbol);
    let bytes = render_pdf(&page).map_err(|e| ApiError::Internal(e.to_string()))?;

    let disposition = format!("attachment; filename=\"{}\"", page.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Wraps a saved invoice with the outcome of its notification.
async fn saved(state: &SharedState, invoice: Invoice) -> SavedInvoice {
    let email = state
        .notifier
        .notify(&invoice.id, invoice.email.as_deref(), |to| {
            manual_invoice_params(&invoice, to, &state.config.public_url)
        })
        .await;

    SavedInvoice {
        invoice: InvoiceView::new(invoice, state.today()),
        email,
    }
}
