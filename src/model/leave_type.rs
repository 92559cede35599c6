//! Leave category catalog and its policy parameters.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{LeaveError, LeaveResult};
use crate::model::employee::Gender;

/// Closed set of leave categories. The dashboard used to pass these around
/// as free strings; every transition point here matches exhaustively.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveKind {
    EarnedLeave,
    CasualLeave,
    SickLeave,
    CompensatoryOff,
    LossOfPay,
    MaternityLeave,
    PaternityLeave,
    BereavementLeave,
    MarriageLeave,
    AdoptionLeave,
    RestrictedHoliday,
}

impl LeaveKind {
    /// Kinds that are only ever written by the engine itself: loss-of-pay as
    /// the substitution target, compensatory-off through the credit workflow.
    pub fn is_internal_only(self) -> bool {
        matches!(self, LeaveKind::LossOfPay | LeaveKind::CompensatoryOff)
    }

    /// Standard categories that fall back to loss-of-pay when the balance
    /// cannot cover the request.
    pub fn substitutes_to_lop(self) -> bool {
        matches!(
            self,
            LeaveKind::EarnedLeave | LeaveKind::CasualLeave | LeaveKind::SickLeave
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccrualMethod {
    Monthly,
    AnnualFrontload,
    ManualCredit,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenderEligibility {
    All,
    Male,
    Female,
}

impl GenderEligibility {
    pub fn permits(self, gender: Gender) -> bool {
        match self {
            GenderEligibility::All => true,
            GenderEligibility::Male => gender == Gender::Male,
            GenderEligibility::Female => gender == Gender::Female,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "earned_leave")]
    pub kind: LeaveKind,
    #[schema(example = "EL")]
    pub abbr: String,
    #[schema(example = 15.0)]
    pub annual_entitlement: f64,
    pub accrual_method: AccrualMethod,
    pub carry_forward: bool,
    pub max_carry_forward: Option<f64>,
    pub encashment: bool,
    pub max_encashment_per_year: Option<f64>,
    pub negative_balance_allowed: bool,
    pub requires_approval: bool,
    #[schema(example = 1, minimum = 1, maximum = 3)]
    pub approval_levels: u8,
    pub min_days_in_advance: Option<u32>,
    pub max_consecutive_days: Option<f64>,
    pub gender_eligibility: GenderEligibility,
    pub requires_document: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl LeaveType {
    /// Sign-offs needed before a reservation commits. Types that skip the
    /// approval chain still take one sign-off so the state machine always
    /// starts at `pending`.
    pub fn required_approval_levels(&self) -> u8 {
        if self.requires_approval {
            self.approval_levels.max(1)
        } else {
            1
        }
    }
}

/// Payload for creating or replacing a leave type. Forward-looking policy
/// only; historical applications keep the numbers they were computed with.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewLeaveType {
    pub kind: LeaveKind,
    #[schema(example = "EL")]
    pub abbr: String,
    #[schema(example = 15.0)]
    pub annual_entitlement: f64,
    pub accrual_method: AccrualMethod,
    #[serde(default)]
    pub carry_forward: bool,
    pub max_carry_forward: Option<f64>,
    #[serde(default)]
    pub encashment: bool,
    pub max_encashment_per_year: Option<f64>,
    #[serde(default)]
    pub negative_balance_allowed: bool,
    #[serde(default = "default_requires_approval")]
    pub requires_approval: bool,
    #[serde(default = "default_approval_levels")]
    pub approval_levels: u8,
    pub min_days_in_advance: Option<u32>,
    pub max_consecutive_days: Option<f64>,
    #[serde(default = "default_gender_eligibility")]
    pub gender_eligibility: GenderEligibility,
    #[serde(default)]
    pub requires_document: bool,
}

fn default_requires_approval() -> bool {
    true
}

fn default_approval_levels() -> u8 {
    1
}

fn default_gender_eligibility() -> GenderEligibility {
    GenderEligibility::All
}

impl NewLeaveType {
    pub fn validate(&self) -> LeaveResult<()> {
        if self.abbr.trim().is_empty() {
            return Err(LeaveError::validation("abbreviation is required"));
        }
        if self.annual_entitlement < 0.0 {
            return Err(LeaveError::validation(
                "annual_entitlement must not be negative",
            ));
        }
        if self.requires_approval && !(1..=3).contains(&self.approval_levels) {
            return Err(LeaveError::validation(
                "approval_levels must be between 1 and 3",
            ));
        }
        Ok(())
    }

    pub fn into_leave_type(self, id: u64, created_at: DateTime<Utc>) -> LeaveType {
        LeaveType {
            id,
            kind: self.kind,
            abbr: self.abbr,
            annual_entitlement: self.annual_entitlement,
            accrual_method: self.accrual_method,
            carry_forward: self.carry_forward,
            max_carry_forward: self.max_carry_forward,
            encashment: self.encashment,
            max_encashment_per_year: self.max_encashment_per_year,
            negative_balance_allowed: self.negative_balance_allowed,
            requires_approval: self.requires_approval,
            approval_levels: self.approval_levels,
            min_days_in_advance: self.min_days_in_advance,
            max_consecutive_days: self.max_consecutive_days,
            gender_eligibility: self.gender_eligibility,
            requires_document: self.requires_document,
            created_at,
        }
    }
}

/// Default policy catalog, seeded when the registry is empty.
pub static DEFAULT_CATALOG: Lazy<Vec<NewLeaveType>> = Lazy::new(|| {
    fn base(kind: LeaveKind, abbr: &str, entitlement: f64, accrual: AccrualMethod) -> NewLeaveType {
        NewLeaveType {
            kind,
            abbr: abbr.to_string(),
            annual_entitlement: entitlement,
            accrual_method: accrual,
            carry_forward: false,
            max_carry_forward: None,
            encashment: false,
            max_encashment_per_year: None,
            negative_balance_allowed: false,
            requires_approval: true,
            approval_levels: 1,
            min_days_in_advance: None,
            max_consecutive_days: None,
            gender_eligibility: GenderEligibility::All,
            requires_document: false,
        }
    }

    vec![
        NewLeaveType {
            carry_forward: true,
            max_carry_forward: Some(30.0),
            encashment: true,
            max_encashment_per_year: Some(10.0),
            min_days_in_advance: Some(3),
            ..base(LeaveKind::EarnedLeave, "EL", 15.0, AccrualMethod::Monthly)
        },
        base(LeaveKind::CasualLeave, "CL", 12.0, AccrualMethod::Monthly),
        NewLeaveType {
            carry_forward: true,
            max_carry_forward: Some(24.0),
            ..base(LeaveKind::SickLeave, "SL", 12.0, AccrualMethod::Monthly)
        },
        base(
            LeaveKind::CompensatoryOff,
            "CO",
            0.0,
            AccrualMethod::ManualCredit,
        ),
        NewLeaveType {
            negative_balance_allowed: true,
            ..base(LeaveKind::LossOfPay, "LOP", 0.0, AccrualMethod::ManualCredit)
        },
        NewLeaveType {
            gender_eligibility: GenderEligibility::Female,
            requires_document: true,
            approval_levels: 2,
            ..base(
                LeaveKind::MaternityLeave,
                "ML",
                180.0,
                AccrualMethod::ManualCredit,
            )
        },
        NewLeaveType {
            gender_eligibility: GenderEligibility::Male,
            ..base(
                LeaveKind::PaternityLeave,
                "PL",
                5.0,
                AccrualMethod::ManualCredit,
            )
        },
        base(
            LeaveKind::BereavementLeave,
            "BL",
            5.0,
            AccrualMethod::ManualCredit,
        ),
        NewLeaveType {
            max_consecutive_days: Some(3.0),
            ..base(
                LeaveKind::MarriageLeave,
                "MRL",
                3.0,
                AccrualMethod::ManualCredit,
            )
        },
        NewLeaveType {
            gender_eligibility: GenderEligibility::Female,
            requires_document: true,
            ..base(
                LeaveKind::AdoptionLeave,
                "AL",
                84.0,
                AccrualMethod::ManualCredit,
            )
        },
        base(
            LeaveKind::RestrictedHoliday,
            "RH",
            2.0,
            AccrualMethod::AnnualFrontload,
        ),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(LeaveKind::EarnedLeave.to_string(), "earned_leave");
        assert_eq!(
            "loss_of_pay".parse::<LeaveKind>().unwrap(),
            LeaveKind::LossOfPay
        );
        assert!("annual".parse::<LeaveKind>().is_err());
    }

    #[test]
    fn internal_only_kinds() {
        assert!(LeaveKind::LossOfPay.is_internal_only());
        assert!(LeaveKind::CompensatoryOff.is_internal_only());
        assert!(!LeaveKind::EarnedLeave.is_internal_only());
    }

    #[test]
    fn gender_eligibility_permits() {
        assert!(GenderEligibility::All.permits(Gender::Other));
        assert!(GenderEligibility::Female.permits(Gender::Female));
        assert!(!GenderEligibility::Female.permits(Gender::Male));
    }

    #[test]
    fn validation_rejects_blank_abbr_and_bad_levels() {
        let mut t = DEFAULT_CATALOG[0].clone();
        t.abbr = "  ".into();
        assert!(t.validate().is_err());

        let mut t = DEFAULT_CATALOG[0].clone();
        t.approval_levels = 4;
        assert!(t.validate().is_err());

        // Levels beyond 3 are fine when no approval chain is configured.
        t.requires_approval = false;
        assert!(t.validate().is_ok());
    }

    #[test]
    fn default_catalog_has_unique_abbrs() {
        let mut abbrs: Vec<_> = DEFAULT_CATALOG.iter().map(|t| t.abbr.clone()).collect();
        abbrs.sort();
        abbrs.dedup();
        assert_eq!(abbrs.len(), DEFAULT_CATALOG.len());
    }
}
