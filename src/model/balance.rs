//! Per-employee, per-type, per-year balance row and the bucket arithmetic.
//!
//! These methods are the only code allowed to touch the balance buckets.
//! The ledger service loads a row, applies exactly one of them, and writes
//! the row back under the employee's serialization lock; a failed method
//! leaves the row untouched, so a failed operation can never be observed as
//! a partial mutation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{LeaveError, LeaveResult};

const EPS: f64 = 1e-9;

/// Which bucket an administrative credit lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CreditBucket {
    Entitlement,
    Accrued,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 2025)]
    pub year: i32,
    pub entitlement: f64,
    pub accrued: f64,
    pub carried_forward: f64,
    pub taken: f64,
    pub pending_approval: f64,
    pub encashed: f64,
    pub available: f64,
}

impl LeaveBalance {
    pub fn zero(employee_id: u64, leave_type_id: u64, year: i32) -> Self {
        LeaveBalance {
            employee_id,
            leave_type_id,
            year,
            entitlement: 0.0,
            accrued: 0.0,
            carried_forward: 0.0,
            taken: 0.0,
            pending_approval: 0.0,
            encashed: 0.0,
            available: 0.0,
        }
    }

    fn recompute(&mut self) {
        self.available = self.entitlement + self.accrued + self.carried_forward
            - self.encashed
            - self.taken
            - self.pending_approval;
    }

    pub fn invariant_holds(&self) -> bool {
        let expected = self.entitlement + self.accrued + self.carried_forward
            - self.encashed
            - self.taken
            - self.pending_approval;
        (self.available - expected).abs() < EPS
    }

    fn positive_days(days: f64) -> LeaveResult<()> {
        if days <= 0.0 || !days.is_finite() {
            return Err(LeaveError::validation("day count must be positive"));
        }
        Ok(())
    }

    /// Hold `days` against this balance. Fails with `InsufficientBalance`
    /// unless the type allows going negative.
    pub fn reserve(&mut self, days: f64, negative_allowed: bool) -> LeaveResult<()> {
        Self::positive_days(days)?;
        if !negative_allowed && self.available + EPS < days {
            return Err(LeaveError::InsufficientBalance {
                available: self.available,
                requested: days,
            });
        }
        self.pending_approval += days;
        self.recompute();
        Ok(())
    }

    /// Move `days` from pending to taken. `available` already reflected the
    /// reservation and does not change.
    pub fn commit(&mut self, days: f64) -> LeaveResult<()> {
        Self::positive_days(days)?;
        if days > self.pending_approval + EPS {
            return Err(LeaveError::invalid_transition(format!(
                "commit of {days} exceeds pending {}",
                self.pending_approval
            )));
        }
        self.pending_approval -= days;
        self.taken += days;
        self.recompute();
        Ok(())
    }

    /// Give a reservation back (rejection or cancellation).
    pub fn release(&mut self, days: f64) -> LeaveResult<()> {
        Self::positive_days(days)?;
        if days > self.pending_approval + EPS {
            return Err(LeaveError::invalid_transition(format!(
                "release of {days} exceeds pending {}",
                self.pending_approval
            )));
        }
        self.pending_approval -= days;
        self.recompute();
        Ok(())
    }

    /// Return unused taken days after a recall.
    pub fn restore(&mut self, days: f64) -> LeaveResult<()> {
        Self::positive_days(days)?;
        if days > self.taken + EPS {
            return Err(LeaveError::invalid_transition(format!(
                "restore of {days} exceeds taken {}",
                self.taken
            )));
        }
        self.taken -= days;
        self.recompute();
        Ok(())
    }

    /// Administrative or credit-approval increment.
    pub fn credit(&mut self, days: f64, bucket: CreditBucket) -> LeaveResult<()> {
        Self::positive_days(days)?;
        match bucket {
            CreditBucket::Entitlement => self.entitlement += days,
            CreditBucket::Accrued => self.accrued += days,
        }
        self.recompute();
        Ok(())
    }

    /// Overwrite the accrued bucket with a freshly computed year-to-date
    /// figure. The accrual run owns this number outright, so it replaces
    /// rather than adds.
    pub fn set_accrued(&mut self, days: f64) -> LeaveResult<()> {
        if days < 0.0 || !days.is_finite() {
            return Err(LeaveError::validation("accrued days must not be negative"));
        }
        self.accrued = days;
        self.recompute();
        Ok(())
    }

    /// Year-opening adjustment: capped carry-forward from the previous year
    /// and, for frontloaded policies, the full annual entitlement.
    pub fn open_year(
        &mut self,
        carried_forward: f64,
        frontload_entitlement: Option<f64>,
    ) -> LeaveResult<()> {
        if carried_forward < 0.0 || !carried_forward.is_finite() {
            return Err(LeaveError::validation(
                "carried-forward days must not be negative",
            ));
        }
        self.carried_forward = carried_forward;
        if let Some(entitlement) = frontload_entitlement {
            if entitlement < 0.0 || !entitlement.is_finite() {
                return Err(LeaveError::validation("entitlement must not be negative"));
            }
            self.entitlement = entitlement;
        }
        self.recompute();
        Ok(())
    }

    /// Convert available days into a payout.
    pub fn encash(&mut self, days: f64, yearly_cap: Option<f64>) -> LeaveResult<()> {
        Self::positive_days(days)?;
        if self.available + EPS < days {
            return Err(LeaveError::InsufficientBalance {
                available: self.available,
                requested: days,
            });
        }
        if let Some(cap) = yearly_cap {
            if self.encashed + days > cap + EPS {
                return Err(LeaveError::validation(format!(
                    "encashment cap of {cap} days per year exceeded"
                )));
            }
        }
        self.encashed += days;
        self.recompute();
        Ok(())
    }
}
