use actix_web::{HttpResponse, web};

use crate::actor::Actor;
use crate::core::registry::DeleteOutcome;
use crate::error::LeaveError;
use crate::model::{LeaveType, NewLeaveType};
use crate::state::AppState;

/* =========================
List leave types
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave-types",
    responses(
        (status = 200, description = "Leave type catalog", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "LeaveType"
)]
pub async fn list_leave_types(
    _actor: Actor,
    state: web::Data<AppState>,
) -> Result<HttpResponse, LeaveError> {
    let types = state.registry.list().await?;
    Ok(HttpResponse::Ok().json(types))
}

/* =========================
Create leave type (super-admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave-types",
    request_body = NewLeaveType,
    responses(
        (status = 200, description = "Leave type created", body = LeaveType),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden")
    ),
    tag = "LeaveType"
)]
pub async fn create_leave_type(
    actor: Actor,
    state: web::Data<AppState>,
    payload: web::Json<NewLeaveType>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_super_admin()?;
    let created = state.registry.create(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(created))
}

/* =========================
Update leave type (super-admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave-types/{type_id}",
    params(("type_id" = u64, Path, description = "Leave type ID")),
    request_body = NewLeaveType,
    responses(
        (status = 200, description = "Leave type updated", body = LeaveType),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not found")
    ),
    tag = "LeaveType"
)]
pub async fn update_leave_type(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<NewLeaveType>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_super_admin()?;
    let updated = state
        .registry
        .update(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

/* =========================
Delete leave type (super-admin)
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/leave-types/{type_id}",
    params(("type_id" = u64, Path, description = "Leave type ID")),
    responses(
        (status = 200, description = "Deleted; response flags surviving references", body = DeleteOutcome),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not found")
    ),
    tag = "LeaveType"
)]
pub async fn delete_leave_type(
    actor: Actor,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    actor.require_super_admin()?;
    let outcome = state.registry.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
