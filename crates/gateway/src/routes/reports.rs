//! Sales report handlers. All require the `ViewReports` capability.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use petal_core::Capability;

use super::json_body;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Report, User};
use crate::state::AppState;

/// Report payload; `report` is `null` when the window has no orders.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: Option<Report>,
}

/// Body of `POST /api/reports/`.
#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn require_reports(user: &User) -> Result<()> {
    if user.role.can(Capability::ViewReports) {
        Ok(())
    } else {
        Err(AppError::Forbidden("reports are staff only".to_string()))
    }
}

/// Latest snapshot, regenerated when stale.
///
/// # Route
///
/// `GET /api/reports/latest/`
pub async fn latest(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<ReportResponse>> {
    require_reports(&user)?;
    let today = Utc::now().date_naive();
    let report = state.reports().latest_or_generate(today).await?;
    Ok(Json(ReportResponse { report }))
}

/// Generate a snapshot for an explicit window ending no later than today.
///
/// # Route
///
/// `POST /api/reports/`
pub async fn generate(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: std::result::Result<Json<GenerateReportRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>> {
    require_reports(&user)?;
    let request = json_body(payload)?;
    let today = Utc::now().date_naive();
    let report = state
        .reports()
        .generate(request.start_date, request.end_date, today)
        .await?;
    Ok(Json(ReportResponse { report }))
}

/// Orders of the last 30 days as a CSV download.
///
/// # Route
///
/// `GET /api/reports/sales.csv`
pub async fn sales_csv(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse> {
    require_reports(&user)?;
    let today = Utc::now().date_naive();
    let csv = state.reports().export_csv(today).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"sales_report_{today}.csv\""),
            ),
        ],
        csv,
    ))
}
