//! Read-only mirror of the external identity/employee service.
//!
//! The engine never owns identity. Profiles are pushed in through the sync
//! endpoint and consulted for eligibility (gender), approval routing
//! (manager), accrual (joining date) and analytics (department).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Employee,
    Manager,
    HrAdmin,
    SuperAdmin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::HrAdmin | Role::SuperAdmin)
    }

    pub fn can_approve(self) -> bool {
        matches!(self, Role::Manager | Role::HrAdmin | Role::SuperAdmin)
    }
}

/// The authenticated caller, as resolved by the upstream gateway. Users not
/// linked to an employee record (service accounts) carry no employee id.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub employee_id: Option<u64>,
    pub role: Role,
}

impl Caller {
    /// True when the caller may act on this employee's behalf: the employee
    /// themselves, or an HR/super administrator.
    pub fn acts_for(&self, employee_id: u64) -> bool {
        self.employee_id == Some(employee_id) || self.role.is_admin()
    }

    pub fn is_self(&self, employee_id: u64) -> bool {
        self.employee_id == Some(employee_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeProfile {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub full_name: String,
    pub gender: Gender,
    #[schema(example = "Engineering")]
    pub department: String,
    pub manager_id: Option<u64>,
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub date_of_joining: NaiveDate,
    pub active: bool,
}
