//! Catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use tillbook_core::validation::{validate_product, ProductForm};
use tillbook_core::{Product, ProductCategory};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/low-stock", get(low_stock))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Blank or `All` lists every category.
    pub category: Option<String>,
}

impl ProductQuery {
    fn category(&self) -> ApiResult<Option<ProductCategory>> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(c) if c.eq_ignore_ascii_case("all") => Ok(None),
            Some(c) => Ok(Some(c.parse()?)),
        }
    }
}

async fn list_products(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = match query.category()? {
        Some(category) => {
            state
                .db
                .products()
                .list_by_category(&user.user_id, category)
                .await?
        }
        None => state.db.products().list(&user.user_id).await?,
    };
    Ok(Json(products))
}

async fn low_stock(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().low_stock(&user.user_id).await?))
}

async fn get_product(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().get(&user.user_id, &id).await?))
}

async fn create_product(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Json(form): Json<ProductForm>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let draft = validate_product(&form)?;
    let product = state.db.products().insert(&user.user_id, &draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(form): Json<ProductForm>,
) -> ApiResult<Json<Product>> {
    let draft = validate_product(&form)?;
    let product = state.db.products().update(&user.user_id, &id, &draft).await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.products().delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
