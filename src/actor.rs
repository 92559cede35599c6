//! Caller identity extractor.
//!
//! Authentication is owned by the upstream gateway, which terminates the
//! session and forwards the resolved identity in trusted headers:
//! `X-Role` (employee | manager | hr_admin | super_admin) and, for users
//! linked to an employee record, `X-Employee-Id`. This service must only
//! ever be reachable through that gateway.

use actix_web::error::ErrorUnauthorized;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::{LeaveError, LeaveResult};
use crate::model::{Caller, Role};

pub struct Actor {
    pub employee_id: Option<u64>,
    pub role: Role,
}

impl Actor {
    pub fn caller(&self) -> Caller {
        Caller {
            employee_id: self.employee_id,
            role: self.role,
        }
    }

    /// The employee record linked to this user, for self-service endpoints.
    pub fn employee_id(&self) -> LeaveResult<u64> {
        self.employee_id.ok_or_else(|| {
            LeaveError::permission("user is not linked to an employee record")
        })
    }

    pub fn require_admin(&self) -> LeaveResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(LeaveError::permission("HR/super-admin only"))
        }
    }

    pub fn require_super_admin(&self) -> LeaveResult<()> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(LeaveError::permission("super-admin only"))
        }
    }

    pub fn require_approver(&self) -> LeaveResult<()> {
        if self.role.can_approve() {
            Ok(())
        } else {
            Err(LeaveError::permission("approver role required"))
        }
    }
}

impl FromRequest for Actor {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let role = match req
            .headers()
            .get("X-Role")
            .and_then(|h| h.to_str().ok())
        {
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => role,
                Err(_) => return ready(Err(ErrorUnauthorized("Invalid role"))),
            },
            None => return ready(Err(ErrorUnauthorized("Missing identity headers"))),
        };

        let employee_id = match req
            .headers()
            .get("X-Employee-Id")
            .and_then(|h| h.to_str().ok())
        {
            Some(raw) => match raw.parse::<u64>() {
                Ok(id) => Some(id),
                Err(_) => return ready(Err(ErrorUnauthorized("Invalid employee id"))),
            },
            None => None,
        };

        ready(Ok(Actor { employee_id, role }))
    }
}
