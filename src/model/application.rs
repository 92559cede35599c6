//! Leave applications and their lifecycle states.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Rejected and cancelled are terminal; no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, LeaveStatus::Rejected | LeaveStatus::Cancelled)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DurationType {
    FullDay,
    HalfDay,
    MultipleDays,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2025-03-10", value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(example = "2025-03-12", value_type = String, format = "date")]
    pub to_date: NaiveDate,
    pub duration_type: DurationType,
    /// Always recomputed server-side; client-supplied values are ignored.
    #[schema(example = 3.0)]
    pub number_of_days: f64,
    pub reason: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    /// Opaque reference into the document store.
    pub attachment: Option<String>,
    pub status: LeaveStatus,
    /// Next approval level awaiting sign-off (1-based).
    pub current_approval_level: u8,
    pub approver_note: Option<String>,
    pub approved_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub recalled_at: Option<DateTime<Utc>>,
    pub recall_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl LeaveApplication {
    /// Interval intersection test used by the duplicate-range guard.
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.from_date <= to && self.to_date >= from
    }

    /// Only live applications block new submissions for the same range.
    pub fn blocks_overlap(&self) -> bool {
        matches!(self.status, LeaveStatus::Pending | LeaveStatus::Approved)
    }
}
