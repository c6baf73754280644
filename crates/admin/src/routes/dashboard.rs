//! Dashboard route handler.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::db::DashboardRepository;
use crate::db::dashboard::{DashboardCounts, LowStockProduct};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::state::AppState;

const RECENT_PRODUCTS: i64 = 5;
const LOW_STOCK_ROWS: i64 = 10;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(show))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub counts: DashboardCounts,
    pub recent_products: Vec<Product>,
    pub low_stock: Vec<LowStockProduct>,
}

/// Shop totals, the latest products and products running out.
///
/// # Errors
///
/// Returns 500 if a query fails.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Dashboard>> {
    let repo = DashboardRepository::new(state.pool());
    let (counts, recent_products, low_stock) = tokio::try_join!(
        repo.counts(),
        repo.recent_products(RECENT_PRODUCTS),
        repo.low_stock(LOW_STOCK_ROWS),
    )?;

    Ok(Json(Dashboard {
        counts,
        recent_products,
        low_stock,
    }))
}
