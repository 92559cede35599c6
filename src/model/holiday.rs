//! Named non-working days.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HolidayType {
    National,
    Festival,
    State,
    Declared,
}

/// Two named observances may land on the same date; they still block exactly
/// one working day because the calendar exposes dates as a set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicHoliday {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Republic Day")]
    pub name: String,
    #[schema(example = "2025-01-26", value_type = String, format = "date")]
    pub holiday_date: NaiveDate,
    pub holiday_type: HolidayType,
    /// Optional/employee-chosen observance.
    pub is_restricted: bool,
    /// Recurring holidays are materialized per year by the external
    /// scheduler; the calendar only looks dates up.
    pub recurring: bool,
    pub description: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
