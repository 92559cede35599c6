use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::actor::Actor;
use crate::error::LeaveError;
use crate::model::LeaveCreditRequest;
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CreateCreditRequest {
    /// Defaults to the caller's own employee record.
    #[serde(default)]
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "2025-01-26", value_type = String, format = "date")]
    pub date_worked: NaiveDate,
    #[schema(example = "Worked the release weekend")]
    pub reason: String,
}

/* =========================
Request compensatory credit
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/credits",
    request_body = CreateCreditRequest,
    responses(
        (status = 200, description = "Credit request created as pending", body = LeaveCreditRequest),
        (status = 400, description = "Future date or reason too short"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Credit"
)]
pub async fn request_credit(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<CreateCreditRequest>,
) -> Result<HttpResponse, LeaveError> {
    let employee_id = match payload.employee_id {
        Some(id) => id,
        None => actor.employee_id()?,
    };
    let req = state
        .credits
        .request(
            employee_id,
            &actor.caller(),
            payload.date_worked,
            &payload.reason,
            Utc::now().date_naive(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(req))
}

/* =========================
My credit requests
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/credits/my",
    responses(
        (status = 200, description = "Caller's credit requests", body = [LeaveCreditRequest]),
        (status = 403, description = "User has no employee record")
    ),
    tag = "Credit"
)]
pub async fn my_credit_requests(
    actor: Actor,
    state: web::Data<AppState>,
) -> Result<HttpResponse, LeaveError> {
    let employee_id = actor.employee_id()?;
    let requests = state
        .credits
        .list_for_employee(employee_id, &actor.caller())
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}

/* =========================
Pending credit requests for the caller
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/credits/pending",
    responses(
        (status = 200, description = "Pending requests the caller may decide", body = [LeaveCreditRequest]),
        (status = 403, description = "Forbidden")
    ),
    tag = "Credit"
)]
pub async fn pending_credit_requests(
    actor: Actor,
    state: web::Data<AppState>,
) -> Result<HttpResponse, LeaveError> {
    let requests = state.credits.list_pending(&actor.caller()).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/* =========================
Approve credit request
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/credits/{request_id}/approve",
    params(("request_id" = u64, Path, description = "Credit request ID")),
    responses(
        (status = 200, description = "One compensatory-off day credited", body = LeaveCreditRequest),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Request already decided")
    ),
    tag = "Credit"
)]
pub async fn approve_credit(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    let req = state
        .credits
        .approve(path.into_inner(), &actor.caller())
        .await?;
    Ok(HttpResponse::Ok().json(req))
}

/* =========================
Reject credit request
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/credits/{request_id}/reject",
    params(("request_id" = u64, Path, description = "Credit request ID")),
    responses(
        (status = 200, description = "Request rejected, ledger untouched", body = LeaveCreditRequest),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Request already decided")
    ),
    tag = "Credit"
)]
pub async fn reject_credit(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    let req = state
        .credits
        .reject(path.into_inner(), &actor.caller())
        .await?;
    Ok(HttpResponse::Ok().json(req))
}
