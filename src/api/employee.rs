use actix_web::{HttpResponse, web};

use crate::actor::Actor;
use crate::error::LeaveError;
use crate::model::EmployeeProfile;
use crate::state::AppState;

/* =========================
Sync an employee profile (identity service push)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/employees/sync",
    request_body = EmployeeProfile,
    responses(
        (status = 200, description = "Profile mirror updated"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee"
)]
pub async fn sync_employee(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<EmployeeProfile>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_admin()?;
    state.store.upsert_employee(&payload).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Employee profile synced"
    })))
}

/* =========================
Read one mirrored profile
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Mirrored profile", body = EmployeeProfile),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    let employee_id = path.into_inner();
    if !actor.caller().acts_for(employee_id) && !actor.role.can_approve() {
        return Err(LeaveError::permission("cannot view this employee"));
    }
    let profile = state
        .store
        .get_employee(employee_id)
        .await?
        .ok_or_else(|| LeaveError::not_found("employee profile"))?;
    Ok(HttpResponse::Ok().json(profile))
}
