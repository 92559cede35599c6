use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::actor::Actor;
use crate::api::leave::default_year;
use crate::core::analytics::{LeaveAnalytics, LeaveStats};
use crate::error::LeaveError;
use crate::state::AppState;

#[derive(Deserialize, IntoParams)]
pub struct AnalyticsQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

/* =========================
Full analytics rollup (admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Trends, utilization, absenteeism and liability", body = LeaveAnalytics),
        (status = 403, description = "Forbidden")
    ),
    tag = "Analytics"
)]
pub async fn leave_analytics(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    let year = query.year.unwrap_or_else(default_year);
    let report = state.analytics.year_report(year).await?;
    Ok(HttpResponse::Ok().json(report))
}

/* =========================
Summary stats (manager and up)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/analytics/stats",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Headline counters", body = LeaveStats),
        (status = 403, description = "Forbidden")
    ),
    tag = "Analytics"
)]
pub async fn leave_stats(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_approver()?;
    let year = query.year.unwrap_or_else(default_year);
    let stats = state.analytics.stats(year).await?;
    Ok(HttpResponse::Ok().json(stats))
}
