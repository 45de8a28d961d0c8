//! Sales dashboard and the CSV and PDF sales reports.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::db;
use crate::db::reports::{Dashboard, RangeQuery, ReportWindow};
use crate::error::{AppError, Result};
use crate::middleware::StaffUser;
use crate::services::sales_report;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/reports/sales.csv", get(sales_report))
        .route("/reports/sales.pdf", get(sales_report_pdf))
}

fn window(q: &RangeQuery) -> Result<ReportWindow> {
    q.window(Utc::now()).ok_or_else(|| AppError::BadRequest("Custom range needs from <= to".into()))
}

async fn dashboard(State(s): State<AppState>, StaffUser(_): StaffUser, Query(q): Query<RangeQuery>) -> Result<Json<Dashboard>> {
    let window = window(&q)?;
    let mut conn = s.db.acquire().await?;
    Ok(Json(db::reports::dashboard(&mut conn, window).await?))
}

async fn sales_report(State(s): State<AppState>, StaffUser(_): StaffUser, Query(q): Query<RangeQuery>) -> Result<impl IntoResponse> {
    let window = window(&q)?;
    let mut conn = s.db.acquire().await?;
    let rows = db::reports::sales_rows(&mut conn, window).await?;
    let filename = sales_report::filename(&window, "csv");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        db::reports::sales_csv(&rows),
    ))
}

async fn sales_report_pdf(State(s): State<AppState>, StaffUser(_): StaffUser, Query(q): Query<RangeQuery>) -> Result<impl IntoResponse> {
    let window = window(&q)?;
    let mut conn = s.db.acquire().await?;
    let summary = db::reports::summary(&mut conn, window).await?;
    let rows = db::reports::sales_rows(&mut conn, window).await?;
    drop(conn);
    let pdf = sales_report::render_pdf(&window, &summary, &rows)?;
    let filename = sales_report::filename(&window, "pdf");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        pdf,
    ))
}
