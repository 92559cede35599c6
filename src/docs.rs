use crate::api::balance::{CreditBalance, EncashBalance, LedgerRun};
use crate::api::credit::CreateCreditRequest;
use crate::api::leave::{DecisionNote, LeaveFilter, LeaveListResponse, RecallRequest};
use crate::core::analytics::{
    Absentee, DepartmentUtilization, LeaveAnalytics, LeaveStats, Liability, MonthTrend,
    TypeUtilization,
};
use crate::core::calendar::NewHoliday;
use crate::core::lifecycle::SubmitLeave;
use crate::core::registry::DeleteOutcome;
use crate::model::{
    AccrualMethod, CreditBucket, DurationType, EmployeeProfile, Gender, GenderEligibility,
    HolidayType, LeaveApplication, LeaveBalance, LeaveCreditRequest, LeaveKind, LeaveStatus,
    LeaveType, NewLeaveType, PublicHoliday, Role,
};
use crate::model::credit::CreditStatus;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Engine API",
        version = "1.0.0",
        description = r#"
## Leave Entitlement & Approval Engine

This API is the leave core behind an HR dashboard: entitlement tracking,
request validation, multi-level approval, mid-leave recall, compensatory
credits, and reporting rollups.

### Key Features
- **Leave Types**
  - Policy catalog: entitlement, accrual, carry-forward, encashment, eligibility
- **Balances**
  - Per employee/type/year ledger with reserve/commit/release/restore/credit
- **Applications**
  - Submit, edit, cancel, approve/reject with up to three sign-off levels, recall
- **Compensatory Credits**
  - Credit requests for days worked on holidays/weekends
- **Analytics**
  - Monthly trends, utilization, absenteeism risk, leave liability

### Identity
Authentication is terminated by the upstream gateway, which forwards
`X-Role` and `X-Employee-Id` headers. Day counts are always recomputed
server-side; client-supplied values are ignored.

### Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave::apply_leave,
        crate::api::leave::leave_list,
        crate::api::leave::pending_approvals,
        crate::api::leave::get_leave,
        crate::api::leave::update_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::recall_leave,

        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::update_leave_type,
        crate::api::leave_type::delete_leave_type,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,
        crate::api::holiday::update_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::balance::my_balances,
        crate::api::balance::employee_balances,
        crate::api::balance::all_balances,
        crate::api::balance::credit_balance,
        crate::api::balance::encash_balance,
        crate::api::balance::run_accrual,
        crate::api::balance::run_rollover,

        crate::api::credit::request_credit,
        crate::api::credit::my_credit_requests,
        crate::api::credit::pending_credit_requests,
        crate::api::credit::approve_credit,
        crate::api::credit::reject_credit,

        crate::api::analytics::leave_analytics,
        crate::api::analytics::leave_stats,

        crate::api::employee::sync_employee,
        crate::api::employee::get_employee
    ),
    components(
        schemas(
            LeaveKind,
            AccrualMethod,
            GenderEligibility,
            LeaveType,
            NewLeaveType,
            LeaveStatus,
            DurationType,
            LeaveApplication,
            SubmitLeave,
            LeaveFilter,
            LeaveListResponse,
            DecisionNote,
            RecallRequest,
            LeaveBalance,
            CreditBucket,
            CreditBalance,
            EncashBalance,
            LedgerRun,
            HolidayType,
            PublicHoliday,
            NewHoliday,
            CreditStatus,
            LeaveCreditRequest,
            CreateCreditRequest,
            DeleteOutcome,
            Gender,
            Role,
            EmployeeProfile,
            LeaveAnalytics,
            LeaveStats,
            MonthTrend,
            DepartmentUtilization,
            TypeUtilization,
            Absentee,
            Liability
        )
    ),
    tags(
        (name = "Leave", description = "Leave application lifecycle APIs"),
        (name = "LeaveType", description = "Leave policy catalog APIs"),
        (name = "Holiday", description = "Public holiday calendar APIs"),
        (name = "Balance", description = "Balance ledger APIs"),
        (name = "Credit", description = "Compensatory credit APIs"),
        (name = "Analytics", description = "Reporting rollup APIs"),
        (name = "Employee", description = "Employee mirror APIs"),
    )
)]
pub struct ApiDoc;
