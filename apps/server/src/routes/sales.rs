//! Sales history.
//!
//! The filter runs over the whole history; the summary covers everything
//! that matched and `page` selects which slice of it is returned.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use tillbook_core::analytics::{SalesFilter, SalesSummary, SALES_PAGE_SIZE};
use tillbook_core::validation::{parse_date, validate_search_query};
use tillbook_core::Sale;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/sales", get(list_sales))
        .route("/api/sales/{id}", get(get_sale))
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub q: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub from: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub to: Option<String>,
    /// 1-based; out-of-range pages come back empty.
    pub page: Option<usize>,
}

impl SalesQuery {
    fn filter(&self) -> ApiResult<SalesFilter> {
        let date = |field: &str, raw: &Option<String>| {
            raw.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_date(field, s))
                .transpose()
        };

        let query = match self.q.as_deref() {
            Some(q) => Some(validate_search_query(q)?).filter(|q| !q.is_empty()),
            None => None,
        };

        Ok(SalesFilter {
            query,
            from: date("from", &self.from)?,
            to: date("to", &self.to)?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPage {
    pub sales: Vec<Sale>,
    pub summary: SalesSummary,
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
}

async fn list_sales(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SalesQuery>,
) -> ApiResult<Json<SalesPage>> {
    let filter = query.filter()?;
    let all = state.db.sales().list(&user.user_id, None).await?;
    let matched = filter.apply(&all);

    let total = matched.len();
    let page_count = total.div_ceil(SALES_PAGE_SIZE).max(1);
    let page = query.page.unwrap_or(1).max(1);

    let sales = matched
        .iter()
        .skip((page - 1).saturating_mul(SALES_PAGE_SIZE))
        .take(SALES_PAGE_SIZE)
        .map(|s| (*s).clone())
        .collect();

    Ok(Json(SalesPage {
        summary: SalesSummary::of(matched.iter().copied()),
        sales,
        page,
        page_count,
        total,
    }))
}

async fn get_sale(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Sale>> {
    Ok(Json(state.db.sales().get(&user.user_id, &id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_query_params_mean_no_filter() {
        let query = SalesQuery {
            q: Some("  ".to_string()),
            from: Some(String::new()),
            to: None,
            page: None,
        };
        assert_eq!(query.filter().unwrap(), SalesFilter::default());
    }

    #[test]
    fn test_bad_date_is_a_validation_error() {
        let query = SalesQuery {
            from: Some("18/10/2026".to_string()),
            ..Default::default()
        };
        let err = query.filter().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
