//! # Tillbook Server
//!
//! HTTP API for the shop: catalog, POS checkout, invoices, sales history,
//! analytics, and live views over server-sent events.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Route Groups                                 │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Public        │  │  Catalog / POS │  │  Invoices                  ││
//! │  │                │  │                │  │                            ││
//! │  │ • signup       │  │ • products     │  │ • list / get / create      ││
//! │  │ • signin       │  │ • cart         │  │ • update / mark-paid       ││
//! │  │ • /login       │  │ • checkout     │  │ • pdf / print              ││
//! │  │ • /health      │  │                │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │  Reports       │  │  Live (SSE)    │     everything except Public   │
//! │  │                │  │                │     sits behind require_auth   │
//! │  │ • sales        │  │ • products     │                                │
//! │  │ • analytics    │  │ • sales        │                                │
//! │  │                │  │ • invoices     │                                │
//! │  │                │  │ • analytics    │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState: Database (SQLite + change feed) · JwtManager ·         │  │
//! │  │            CartStore · Notifier (EmailJS) · AuthEvents            │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables, see [`config::ServerConfig::load`]:
//! - `TILLBOOK_BIND_ADDR` - listen address (default: 0.0.0.0:8080)
//! - `TILLBOOK_DB_PATH` - SQLite file (default: platform data dir)
//! - `TILLBOOK_PUBLIC_URL` - base of emailed invoice links
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Session lifetime (default: 86400)
//! - `TILLBOOK_CURRENCY_SYMBOL`, `TILLBOOK_ALLOW_NEGATIVE_STOCK`
//! - `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`, `EMAILJS_PUBLIC_KEY`, `EMAILJS_ENDPOINT`

pub mod auth;
pub mod carts;
pub mod config;
pub mod email;
pub mod error;
pub mod html;
pub mod pdf;
pub mod routes;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::middleware;
use axum::Router;
use chrono::{NaiveDate, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tillbook_db::Database;

// Re-exports
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};

use crate::auth::{AuthEvents, JwtManager};
use crate::carts::CartStore;
use crate::email::{EmailJsClient, EmailSender, Notifier};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub jwt: JwtManager,
    pub carts: CartStore,
    pub notifier: Notifier,
    pub auth_events: AuthEvents,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// State with the EmailJS client from `config`.
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let sender = Arc::new(EmailJsClient::new(config.emailjs_endpoint.clone()));
        Self::with_sender(db, config, sender)
    }

    /// State with a caller-supplied email sender.
    pub fn with_sender(db: Database, config: ServerConfig, sender: Arc<dyn EmailSender>) -> Self {
        AppState {
            jwt: JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs),
            notifier: Notifier::new(sender, config.email.clone()),
            carts: CartStore::new(),
            auth_events: AuthEvents::new(),
            db,
            config,
        }
    }

    /// The calendar day invoice rules are evaluated against.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Builds the full router: public routes, the auth gate, and everything
/// behind it.
pub fn build_router(state: SharedState) -> Router {
    let private = Router::new()
        .merge(routes::auth::private_routes())
        .merge(routes::pages::private_routes())
        .merge(routes::products::routes())
        .merge(routes::pos::routes())
        .merge(routes::invoices::routes())
        .merge(routes::sales::routes())
        .merge(routes::analytics::routes())
        .merge(routes::live::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    let public = Router::new()
        .merge(routes::auth::public_routes())
        .merge(routes::pages::public_routes())
        .merge(routes::health::routes());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .merge(public)
        .merge(private)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
