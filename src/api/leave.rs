use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::actor::Actor;
use crate::core::lifecycle::SubmitLeave;
use crate::error::LeaveError;
use crate::model::{LeaveApplication, LeaveStatus};
use crate::state::AppState;
use crate::store::ApplicationFilter;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 1000)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 2025)]
    /// Filter by the year of from_date
    pub year: Option<i32>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveApplication>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct DecisionNote {
    #[schema(example = "Approved, plan handovers")]
    pub note: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RecallRequest {
    #[schema(example = "2025-03-12", value_type = String, format = "date")]
    pub recall_date: NaiveDate,
    #[schema(example = "Critical client escalation")]
    pub reason: String,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/* =========================
Submit leave application
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leaves/apply",
    request_body = SubmitLeave,
    responses(
        (status = 200, description = "Application created as pending", body = LeaveApplication),
        (status = 400, description = "Validation failure or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Overlapping application exists")
    ),
    tag = "Leave"
)]
pub async fn apply_leave(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<SubmitLeave>,
) -> Result<HttpResponse, LeaveError> {
    let payload = payload.into_inner();
    let employee_id = match payload.employee_id {
        Some(id) => id,
        None => actor.employee_id()?,
    };
    let app = state
        .lifecycle
        .submit(employee_id, &actor.caller(), payload, today())
        .await?;
    Ok(HttpResponse::Ok().json(app))
}

/* =========================
List leave applications
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, LeaveError> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);

    let filter = ApplicationFilter {
        employee_id: query.employee_id,
        employee_ids: None,
        status: query.status,
        year: query.year,
        page,
        per_page,
    };
    let (data, total) = state.lifecycle.list(&actor.caller(), filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/* =========================
Pending approvals for the caller
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leaves/approvals/pending",
    responses(
        (status = 200, description = "Applications awaiting the caller's sign-off", body = [LeaveApplication]),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn pending_approvals(
    actor: Actor,
    state: web::Data<AppState>,
) -> Result<HttpResponse, LeaveError> {
    let pending = state.lifecycle.pending_approvals(&actor.caller()).await?;
    Ok(HttpResponse::Ok().json(pending))
}

/* =========================
Get one application
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave application")),
    responses(
        (status = 200, description = "Leave application found", body = LeaveApplication),
        (status = 404, description = "Leave application not found")
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    let app = state
        .lifecycle
        .get(path.into_inner(), &actor.caller())
        .await?;
    Ok(HttpResponse::Ok().json(app))
}

/* =========================
Edit a pending application
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave application")),
    request_body = SubmitLeave,
    responses(
        (status = 200, description = "Application updated", body = LeaveApplication),
        (status = 409, description = "Not pending, or overlapping range")
    ),
    tag = "Leave"
)]
pub async fn update_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<SubmitLeave>,
) -> Result<HttpResponse, LeaveError> {
    let app = state
        .lifecycle
        .update(
            path.into_inner(),
            &actor.caller(),
            payload.into_inner(),
            today(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(app))
}

/* =========================
Cancel a pending application
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave application")),
    responses(
        (status = 200, description = "Application cancelled, reservation released"),
        (status = 409, description = "Application is not pending")
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    state
        .lifecycle
        .cancel(path.into_inner(), &actor.caller())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave application cancelled"
    })))
}

/* =========================
Approve (one sign-off level)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave application")),
    request_body = DecisionNote,
    responses(
        (status = 200, description = "Sign-off recorded; final level commits the reservation", body = LeaveApplication),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Application is not pending")
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<DecisionNote>,
) -> Result<HttpResponse, LeaveError> {
    let app = state
        .lifecycle
        .approve(
            path.into_inner(),
            &actor.caller(),
            payload.note.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(app))
}

/* =========================
Reject
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave application")),
    request_body = DecisionNote,
    responses(
        (status = 200, description = "Application rejected, reservation released", body = LeaveApplication),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Application is not pending")
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<DecisionNote>,
) -> Result<HttpResponse, LeaveError> {
    let app = state
        .lifecycle
        .reject(
            path.into_inner(),
            &actor.caller(),
            payload.note.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(app))
}

/* =========================
Recall an approved leave
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}/recall",
    params(("leave_id" = u64, Path, description = "ID of the leave application")),
    request_body = RecallRequest,
    responses(
        (status = 200, description = "Leave shortened; unused days restored", body = LeaveApplication),
        (status = 400, description = "Recall date outside the leave period"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Application is not approved")
    ),
    tag = "Leave"
)]
pub async fn recall_leave(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<RecallRequest>,
) -> Result<HttpResponse, LeaveError> {
    let app = state
        .lifecycle
        .recall(
            path.into_inner(),
            &actor.caller(),
            payload.recall_date,
            &payload.reason,
        )
        .await?;
    Ok(HttpResponse::Ok().json(app))
}

// Year used when a query omits one.
pub(crate) fn default_year() -> i32 {
    today().year()
}
