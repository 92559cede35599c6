use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::actor::Actor;
use crate::api::leave::default_year;
use crate::core::calendar::NewHoliday;
use crate::error::LeaveError;
use crate::model::PublicHoliday;
use crate::state::AppState;

#[derive(Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

/* =========================
List holidays for a year
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holidays for the year", body = [PublicHoliday])
    ),
    tag = "Holiday"
)]
pub async fn list_holidays(
    _actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<HolidayQuery>,
) -> Result<HttpResponse, LeaveError> {
    let year = query.year.unwrap_or_else(default_year);
    let holidays = state.calendar.list(year).await?;
    Ok(HttpResponse::Ok().json(holidays))
}

/* =========================
Create holiday (admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/holidays",
    request_body = NewHoliday,
    responses(
        (status = 200, description = "Holiday created", body = PublicHoliday),
        (status = 403, description = "Forbidden")
    ),
    tag = "Holiday"
)]
pub async fn create_holiday(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<NewHoliday>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    let holiday = state.calendar.create(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(holiday))
}

/* =========================
Update holiday (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/holidays/{holiday_id}",
    params(("holiday_id" = u64, Path, description = "Holiday ID")),
    request_body = NewHoliday,
    responses(
        (status = 200, description = "Holiday updated", body = PublicHoliday),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Holiday"
)]
pub async fn update_holiday(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<NewHoliday>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    let holiday = state
        .calendar
        .update(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(holiday))
}

/* =========================
Delete holiday (admin)
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/holidays/{holiday_id}",
    params(("holiday_id" = u64, Path, description = "Holiday ID")),
    responses(
        (status = 200, description = "Holiday deleted; past day counts are not recomputed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Holiday"
)]
pub async fn delete_holiday(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    state.calendar.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Holiday deleted"
    })))
}
