use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::actor::Actor;
use crate::api::leave::default_year;
use crate::error::LeaveError;
use crate::model::{CreditBucket, LeaveBalance};
use crate::state::AppState;

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreditBalance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 1.0)]
    pub days: f64,
    pub bucket: CreditBucket,
}

#[derive(Deserialize, ToSchema)]
pub struct EncashBalance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 5.0)]
    pub days: f64,
}

/// Scheduler-facing payload for accrual and year-rollover runs.
#[derive(Deserialize, ToSchema)]
pub struct LedgerRun {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2025)]
    pub year: i32,
    /// Accrual cut-off; defaults to today.
    #[schema(value_type = Option<String>, format = "date")]
    pub as_of: Option<NaiveDate>,
}

/* =========================
My balances
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/balances/my",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Caller's balances, one row per leave type", body = [LeaveBalance]),
        (status = 403, description = "User has no employee record")
    ),
    tag = "Balance"
)]
pub async fn my_balances(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, LeaveError> {
    let employee_id = actor.employee_id()?;
    let year = query.year.unwrap_or_else(default_year);
    let types = state.registry.list().await?;
    let balances = state
        .ledger
        .employee_balances(employee_id, year, &types)
        .await?;
    Ok(HttpResponse::Ok().json(balances))
}

/* =========================
Balances of one employee (manager/admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/balances/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Balances for the employee", body = [LeaveBalance]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Balance"
)]
pub async fn employee_balances(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, LeaveError> {
    let employee_id = path.into_inner();
    let profile = state
        .store
        .get_employee(employee_id)
        .await?
        .ok_or_else(|| LeaveError::not_found("employee profile"))?;

    let caller = actor.caller();
    let manager_of = profile.manager_id.is_some() && profile.manager_id == caller.employee_id;
    if !caller.acts_for(employee_id) && !manager_of {
        return Err(LeaveError::permission("cannot view this employee's balances"));
    }

    let year = query.year.unwrap_or_else(default_year);
    let types = state.registry.list().await?;
    let balances = state
        .ledger
        .employee_balances(employee_id, year, &types)
        .await?;
    Ok(HttpResponse::Ok().json(balances))
}

/* =========================
All balances (admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/balances/all",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Every balance row for the year", body = [LeaveBalance]),
        (status = 403, description = "Forbidden")
    ),
    tag = "Balance"
)]
pub async fn all_balances(
    actor: Actor,
    state: web::Data<AppState>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    let year = query.year.unwrap_or_else(default_year);
    let balances = state.store.balances_for_year(year).await?;
    Ok(HttpResponse::Ok().json(balances))
}

/* =========================
Administrative credit
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/balances/credit",
    request_body = CreditBalance,
    responses(
        (status = 200, description = "Balance credited", body = LeaveBalance),
        (status = 403, description = "Forbidden")
    ),
    tag = "Balance"
)]
pub async fn credit_balance(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<CreditBalance>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    // The type must exist before days are parked against it.
    state.registry.get(payload.leave_type_id).await?;
    let balance = state
        .ledger
        .admin_credit(
            payload.employee_id,
            payload.leave_type_id,
            payload.year,
            payload.days,
            payload.bucket,
        )
        .await?;
    Ok(HttpResponse::Ok().json(balance))
}

/* =========================
Encashment
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/balances/encash",
    request_body = EncashBalance,
    responses(
        (status = 200, description = "Days converted to payout", body = LeaveBalance),
        (status = 400, description = "Policy forbids it or balance is short"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Balance"
)]
pub async fn encash_balance(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<EncashBalance>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    let leave_type = state.registry.get(payload.leave_type_id).await?;
    let balance = state
        .ledger
        .encash(&leave_type, payload.employee_id, payload.year, payload.days)
        .await?;
    Ok(HttpResponse::Ok().json(balance))
}

/* =========================
Accrual run (scheduler)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/balances/accrue",
    request_body = LedgerRun,
    responses(
        (status = 200, description = "Monthly accrual recomputed", body = [LeaveBalance]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Balance"
)]
pub async fn run_accrual(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<LedgerRun>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    let profile = state
        .store
        .get_employee(payload.employee_id)
        .await?
        .ok_or_else(|| LeaveError::not_found("employee profile"))?;
    let as_of = payload
        .as_of
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let types = state.registry.list().await?;
    let balances = state
        .ledger
        .accrue_monthly(&types, &profile, payload.year, as_of)
        .await?;
    Ok(HttpResponse::Ok().json(balances))
}

/* =========================
Year rollover (scheduler)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/balances/rollover",
    request_body = LedgerRun,
    responses(
        (status = 200, description = "New year opened with capped carry-forward", body = [LeaveBalance]),
        (status = 403, description = "Forbidden")
    ),
    tag = "Balance"
)]
pub async fn run_rollover(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<LedgerRun>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    let types = state.registry.list().await?;
    let balances = state
        .ledger
        .start_new_year(&types, payload.employee_id, payload.year)
        .await?;
    Ok(HttpResponse::Ok().json(balances))
}
