use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::NaiveDate;

use tillbook_core::analytics::{summarize, AnalyticsSummary};
use tillbook_core::ANALYTICS_SALES_LIMIT;
use tillbook_db::{Database, DbResult};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new().route("/api/analytics", get(analytics))
}

/// Dashboard numbers over the latest sales window and every invoice and
/// product.
pub async fn load_summary(db: &Database, user_id: &str, today: NaiveDate) -> DbResult<AnalyticsSummary> {
    let sales = db.sales().list(user_id, Some(ANALYTICS_SALES_LIMIT)).await?;
    let invoices = db.invoices().list(user_id).await?;
    let products = db.products().list(user_id).await?;
    Ok(summarize(&sales, &invoices, &products, today))
}

async fn analytics(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<AnalyticsSummary>> {
    let summary = load_summary(&state.db, &user.user_id, state.today()).await?;
    Ok(Json(summary))
}
