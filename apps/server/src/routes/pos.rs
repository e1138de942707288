//! Point-of-sale endpoints: the cart and checkout.
//!
//! ## Checkout
//! ```text
//! cart ──begin_checkout──► CheckingOut ──plan──► commit (one transaction)
//!                               │                   │
//!                               │ any error         ├─ ok  → cart emptied,
//!                               ▼                   │        email attempted
//!                          Populated ◄──────────────┘ err → cart kept
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tillbook_core::cart::CheckoutResult;
use tillbook_core::checkout::{plan_checkout, CheckoutRequest};
use tillbook_core::email::{pos_invoice_params, EmailOutcome};
use tillbook_core::CartItem;
use tillbook_db::CheckoutReceipt;

use crate::auth::AuthUser;
use crate::carts::CartView;
use crate::error::{ApiError, ApiResult};
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/pos/cart", get(view_cart).delete(discard_cart))
        .route("/api/pos/cart/items", post(add_item))
        .route(
            "/api/pos/cart/items/{product_id}",
            put(set_quantity).delete(remove_item),
        )
        .route("/api/pos/cart/items/{product_id}/decrement", post(decrement))
        .route("/api/pos/checkout", post(checkout))
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub receipt: CheckoutReceipt,
    pub email: EmailOutcome,
}

async fn view_cart(State(state): State<SharedState>, Extension(user): Extension<AuthUser>) -> Json<CartView> {
    Json(state.carts.view(&user.user_id).await)
}

async fn discard_cart(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    state.carts.discard(&user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<AddItemRequest>,
) -> ApiResult<Json<CartView>> {
    let product = state.db.products().get(&user.user_id, &body.product_id).await?;
    let view = state
        .carts
        .update(&user.user_id, |cart| cart.add_item(&product, body.quantity))
        .await?;
    Ok(Json(view))
}

async fn set_quantity(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<String>,
    Json(body): Json<SetQuantityRequest>,
) -> ApiResult<Json<CartView>> {
    let view = state
        .carts
        .update(&user.user_id, |cart| cart.set_quantity(&product_id, body.quantity))
        .await?;
    Ok(Json(view))
}

async fn decrement(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<CartView>> {
    let view = state
        .carts
        .update(&user.user_id, |cart| cart.decrement(&product_id))
        .await?;
    Ok(Json(view))
}

async fn remove_item(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<CartView>> {
    let view = state
        .carts
        .update(&user.user_id, |cart| cart.remove_item(&product_id))
        .await?;
    Ok(Json(view))
}

/// Commits the cart as a sale plus its paid invoice, then emails the invoice
/// when the cashier gave an address.
///
/// The work runs on its own task: the cart always leaves `CheckingOut`, even
/// when the client disconnects before the response is written.
async fn checkout(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let task = tokio::spawn(run_checkout(state.clone(), user.user_id.clone(), request));

    match task.await {
        Ok(result) => result.map(|response| (StatusCode::CREATED, Json(response))),
        Err(e) => {
            // A panicked task must not leave the cart locked
            state
                .carts
                .finish_checkout(&user.user_id, CheckoutResult::Failed)
                .await;
            warn!(user_id = %user.user_id, error = %e, "Checkout task aborted");
            Err(ApiError::Internal(format!("checkout aborted: {e}")))
        }
    }
}

async fn run_checkout(
    state: SharedState,
    user_id: String,
    request: CheckoutRequest,
) -> ApiResult<CheckoutResponse> {
    let lines = state.carts.begin_checkout(&user_id).await?;

    let receipt = match commit(&state, &user_id, &lines, &request).await {
        Ok(receipt) => receipt,
        Err(e) => {
            state
                .carts
                .finish_checkout(&user_id, CheckoutResult::Failed)
                .await;
            warn!(user_id = %user_id, error = %e, "Checkout failed");
            return Err(e);
        }
    };
    state
        .carts
        .finish_checkout(&user_id, CheckoutResult::Committed)
        .await;

    if !receipt.oversold.is_empty() {
        warn!(sale_id = %receipt.sale.id, products = ?receipt.oversold, "Checkout drove stock negative");
    }

    let email = state
        .notifier
        .notify(&receipt.invoice.id, request.customer_email.as_deref(), |to| {
            pos_invoice_params(
                &receipt.invoice,
                to,
                receipt.sale.customer.as_deref(),
                &state.config.public_url,
                &state.config.currency_symbol,
            )
        })
        .await;

    info!(
        sale_id = %receipt.sale.id,
        invoice_id = %receipt.invoice.id,
        total_cents = receipt.sale.total_cents,
        "Checkout committed"
    );

    Ok(CheckoutResponse { receipt, email })
}

async fn commit(
    state: &SharedState,
    user_id: &str,
    lines: &[CartItem],
    request: &CheckoutRequest,
) -> ApiResult<CheckoutReceipt> {
    let plan = plan_checkout(user_id, lines, request, Utc::now())?;
    let receipt = state
        .db
        .checkout()
        .commit(&plan, state.config.allow_negative_stock)
        .await?;
    Ok(receipt)
}
