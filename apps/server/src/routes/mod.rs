//! HTTP route groups.
//!
//! Each module exposes a `routes()` (or `public_routes()` / `private_routes()`)
//! returning a `Router<SharedState>`; [`crate::build_router`] decides which
//! ones sit behind the auth gate.

pub mod analytics;
pub mod auth;
pub mod health;
pub mod invoices;
pub mod live;
pub mod pages;
pub mod pos;
pub mod products;
pub mod sales;
