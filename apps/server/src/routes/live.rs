//! Live views over server-sent events.
//!
//! Each stream sends a `snapshot` event right away and another one after
//! every change to the collections it watches. A failed re-query sends an
//! `error` event and the stream keeps going.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Extension, Router};
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tillbook_core::invoice::InvoiceView;
use tillbook_db::{Collection, LiveStream};

use crate::auth::AuthUser;
use crate::routes::analytics::load_summary;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/live/products", get(live_products))
        .route("/api/live/sales", get(live_sales))
        .route("/api/live/invoices", get(live_invoices))
        .route("/api/live/analytics", get(live_analytics))
}

const ALL_COLLECTIONS: &[Collection] = &[Collection::Products, Collection::Sales, Collection::Invoices];

#[derive(Debug, Default, Deserialize)]
pub struct LiveSalesQuery {
    pub limit: Option<u32>,
}

fn into_sse<T>(live: LiveStream<T>) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Send + 'static,
{
    let events = live.map(|snapshot| {
        let event = match snapshot {
            Ok(data) => Event::default().event("snapshot").json_data(&data).unwrap_or_else(|e| {
                warn!(error = %e, "Failed to encode live snapshot");
                Event::default().event("error").data("encoding failed")
            }),
            Err(e) => {
                warn!(error = %e, "Live query failed");
                Event::default().event("error").data("query failed")
            }
        };
        Ok(event)
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn live_products(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let repo = state.db.products();
    let user_id = user.user_id.clone();
    into_sse(state.db.feed().live(&user.user_id, &[Collection::Products], move || {
        let repo = repo.clone();
        let user_id = user_id.clone();
        async move { repo.list(&user_id).await }
    }))
}

async fn live_sales(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LiveSalesQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let repo = state.db.sales();
    let user_id = user.user_id.clone();
    let limit = query.limit;
    into_sse(state.db.feed().live(&user.user_id, &[Collection::Sales], move || {
        let repo = repo.clone();
        let user_id = user_id.clone();
        async move { repo.list(&user_id, limit).await }
    }))
}

async fn live_invoices(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let repo = state.db.invoices();
    let user_id = user.user_id.clone();
    into_sse(state.db.feed().live(&user.user_id, &[Collection::Invoices], move || {
        let repo = repo.clone();
        let user_id = user_id.clone();
        async move {
            // Display status depends on the day of each snapshot
            let today = Utc::now().date_naive();
            let invoices = repo.list(&user_id).await?;
            Ok(invoices
                .into_iter()
                .map(|inv| InvoiceView::new(inv, today))
                .collect::<Vec<_>>())
        }
    }))
}

async fn live_analytics(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let db = state.db.clone();
    let user_id = user.user_id.clone();
    into_sse(state.db.feed().live(&user.user_id, ALL_COLLECTIONS, move || {
        let db = db.clone();
        let user_id = user_id.clone();
        async move { load_summary(&db, &user_id, Utc::now().date_naive()).await }
    }))
}
