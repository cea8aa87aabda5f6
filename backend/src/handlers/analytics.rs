//! Dashboard and report handlers

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::analytics::{CategoryBreakdown, DashboardMetrics};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// "json" (default) or "csv"
    pub format: Option<String>,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    Ok(Json(state.services.analytics.dashboard(&user).await?))
}

pub async fn get_category_breakdown(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<CategoryBreakdown>>> {
    Ok(Json(state.services.analytics.category_breakdown(&user).await?))
}

/// Supplier items with their recent purchases, as JSON or a CSV download
pub async fn get_supplier_purchase_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let analytics = &state.services.analytics;

    if query.format.as_deref() == Some("csv") {
        let csv = analytics.supplier_purchase_csv(&user).await?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"supplier_purchases.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        let rows = analytics.supplier_purchase_report(&user).await?;
        Ok(Json(rows).into_response())
    }
}
