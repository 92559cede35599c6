//! Chargeable-day computation.
//!
//! Pure and timezone-stable: operates on calendar dates and a pre-fetched
//! holiday set, never on instants. The lifecycle engine recomputes every
//! day count through here; client-supplied values are never trusted.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::model::DurationType;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_working_day(date: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
    !is_weekend(date) && !holidays.contains(&date)
}

/// Chargeable days for a request.
///
/// Half Day is 0.5 regardless of the range. Full Day charges 1.0 only when
/// `from` is a working day; the caller rejects requests that land entirely
/// on non-working days by checking for a zero result. Multiple Days counts
/// the working days in `[from, to]`.
pub fn chargeable_days(
    from: NaiveDate,
    to: Option<NaiveDate>,
    duration: DurationType,
    holidays: &HashSet<NaiveDate>,
) -> f64 {
    match duration {
        DurationType::HalfDay => 0.5,
        DurationType::FullDay => {
            if is_working_day(from, holidays) {
                1.0
            } else {
                0.0
            }
        }
        DurationType::MultipleDays => {
            let to = to.unwrap_or(from);
            let mut days = 0.0;
            let mut current = from;
            while current <= to {
                if is_working_day(current, holidays) {
                    days += 1.0;
                }
                match current.succ_opt() {
                    Some(next) => current = next,
                    None => break,
                }
            }
            days
        }
    }
}
