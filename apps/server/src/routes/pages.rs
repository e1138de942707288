//! Server-rendered pages.

use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::get;
use axum::{Extension, Router};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::{html, SharedState};

pub fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/login", get(login))
        .route("/signup", get(signup))
}

pub fn private_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(home))
        .route("/print/{id}", get(print_invoice))
}

async fn login() -> Html<String> {
    Html(html::login_page())
}

async fn signup() -> Html<String> {
    Html(html::signup_page())
}

async fn home(Extension(user): Extension<AuthUser>) -> Html<String> {
    Html(html::home_page(&user.email))
}

/// Printable invoice; the browser's print dialog opens on load.
async fn print_invoice(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let invoice = state.db.invoices().get(&user.user_id, &id).await?;
    Ok(Html(html::invoice_page(
        &invoice,
        state.today(),
        &state.config.currency_symbol,
    )))
}
