//! Balance Ledger: the single writer for balance rows.
//!
//! Every mutation is serialized through a per-employee async lock, applied
//! as one bucket move on the loaded row, and written back as a single
//! upsert. Keys are independent, so there is no global lock. Compound
//! operations elsewhere (overlap check + reservation in the lifecycle
//! engine) take the same employee guard before calling the primitives here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{Datelike, NaiveDate};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{LeaveError, LeaveResult};
use crate::model::{
    AccrualMethod, CreditBucket, EmployeeProfile, LeaveBalance, LeaveType,
};
use crate::store::Store;

/// Per-employee serialization point. `acquire` hands out a guard that the
/// caller holds for the whole check-then-act section.
#[derive(Default)]
pub struct LockMap {
    locks: StdMutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl LockMap {
    pub fn new() -> Self {
        LockMap::default()
    }

    pub async fn acquire(&self, employee_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self
                .locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            map.entry(employee_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct BalanceLedger {
    store: Arc<Store>,
    locks: Arc<LockMap>,
}

impl BalanceLedger {
    pub fn new(store: Arc<Store>, locks: Arc<LockMap>) -> Self {
        BalanceLedger { store, locks }
    }

    async fn persist(&self, balance: &LeaveBalance) -> LeaveResult<()> {
        debug_assert!(balance.invariant_holds());
        self.store.upsert_balance(balance).await
    }

    // ---- primitives: callers hold the employee guard ----

    /// Load the balance row, initializing a zero row on first touch.
    pub async fn balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<LeaveBalance> {
        match self
            .store
            .get_balance(employee_id, leave_type_id, year)
            .await?
        {
            Some(balance) => Ok(balance),
            None => {
                let balance = LeaveBalance::zero(employee_id, leave_type_id, year);
                self.persist(&balance).await?;
                Ok(balance)
            }
        }
    }

    pub async fn reserve(
        &self,
        leave_type: &LeaveType,
        employee_id: u64,
        year: i32,
        days: f64,
    ) -> LeaveResult<LeaveBalance> {
        let mut balance = self.balance(employee_id, leave_type.id, year).await?;
        balance.reserve(days, leave_type.negative_balance_allowed)?;
        self.persist(&balance).await?;
        tracing::debug!(employee_id, leave_type_id = leave_type.id, year, days, "reserved");
        Ok(balance)
    }

    pub async fn commit(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
        days: f64,
    ) -> LeaveResult<LeaveBalance> {
        let mut balance = self.balance(employee_id, leave_type_id, year).await?;
        balance.commit(days)?;
        self.persist(&balance).await?;
        tracing::debug!(employee_id, leave_type_id, year, days, "committed");
        Ok(balance)
    }

    pub async fn release(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
        days: f64,
    ) -> LeaveResult<LeaveBalance> {
        let mut balance = self.balance(employee_id, leave_type_id, year).await?;
        balance.release(days)?;
        self.persist(&balance).await?;
        tracing::debug!(employee_id, leave_type_id, year, days, "released");
        Ok(balance)
    }

    pub async fn restore(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
        days: f64,
    ) -> LeaveResult<LeaveBalance> {
        let mut balance = self.balance(employee_id, leave_type_id, year).await?;
        balance.restore(days)?;
        self.persist(&balance).await?;
        tracing::debug!(employee_id, leave_type_id, year, days, "restored");
        Ok(balance)
    }

    pub async fn credit(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
        days: f64,
        bucket: CreditBucket,
    ) -> LeaveResult<LeaveBalance> {
        let mut balance = self.balance(employee_id, leave_type_id, year).await?;
        balance.credit(days, bucket)?;
        self.persist(&balance).await?;
        tracing::debug!(employee_id, leave_type_id, year, days, ?bucket, "credited");
        Ok(balance)
    }

    // ---- self-locking entry points for handlers and the scheduler ----

    pub async fn balance_snapshot(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<LeaveBalance> {
        let _guard = self.locks.acquire(employee_id).await;
        self.balance(employee_id, leave_type_id, year).await
    }

    /// One row per catalog type, zero-initialized where never touched.
    pub async fn employee_balances(
        &self,
        employee_id: u64,
        year: i32,
        types: &[LeaveType],
    ) -> LeaveResult<Vec<LeaveBalance>> {
        let _guard = self.locks.acquire(employee_id).await;
        let mut balances = Vec::with_capacity(types.len());
        for lt in types {
            balances.push(self.balance(employee_id, lt.id, year).await?);
        }
        Ok(balances)
    }

    pub async fn admin_credit(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
        days: f64,
        bucket: CreditBucket,
    ) -> LeaveResult<LeaveBalance> {
        let _guard = self.locks.acquire(employee_id).await;
        self.credit(employee_id, leave_type_id, year, days, bucket)
            .await
    }

    pub async fn encash(
        &self,
        leave_type: &LeaveType,
        employee_id: u64,
        year: i32,
        days: f64,
    ) -> LeaveResult<LeaveBalance> {
        if !leave_type.encashment {
            return Err(LeaveError::validation(format!(
                "leave type {} does not allow encashment",
                leave_type.kind
            )));
        }
        let _guard = self.locks.acquire(employee_id).await;
        let mut balance = self.balance(employee_id, leave_type.id, year).await?;
        balance.encash(days, leave_type.max_encashment_per_year)?;
        self.persist(&balance).await?;
        Ok(balance)
    }

    /// Pro-rata monthly accrual, driven by the external scheduler.
    ///
    /// Joining-month rule: day 1-10 earns the full month, 11-20 half,
    /// 21+ nothing. Past years accrue all twelve months; the current year
    /// accrues up to the current month. The accrued bucket is recomputed
    /// from scratch on every run, so the operation is idempotent.
    pub async fn accrue_monthly(
        &self,
        types: &[LeaveType],
        profile: &EmployeeProfile,
        year: i32,
        today: NaiveDate,
    ) -> LeaveResult<Vec<LeaveBalance>> {
        let _guard = self.locks.acquire(profile.employee_id).await;
        let target_month = if year < today.year() { 12 } else { today.month() };

        let mut updated = Vec::new();
        for lt in types {
            if lt.accrual_method != AccrualMethod::Monthly {
                continue;
            }
            let monthly = lt.annual_entitlement / 12.0;
            let joined = profile.date_of_joining;
            let mut total = 0.0;
            for month in 1..=target_month {
                if joined.year() > year || (joined.year() == year && joined.month() > month) {
                    continue;
                }
                if joined.year() == year && joined.month() == month {
                    if joined.day() <= 10 {
                        total += monthly;
                    } else if joined.day() <= 20 {
                        total += monthly / 2.0;
                    }
                    continue;
                }
                total += monthly;
            }

            let mut balance = self.balance(profile.employee_id, lt.id, year).await?;
            balance.set_accrued(total)?;
            self.persist(&balance).await?;
            updated.push(balance);
        }
        Ok(updated)
    }

    /// Open a new ledger year: capped carry-forward of last year's surplus
    /// plus frontloaded entitlement where the policy grants it up front.
    pub async fn start_new_year(
        &self,
        types: &[LeaveType],
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<Vec<LeaveBalance>> {
        let _guard = self.locks.acquire(employee_id).await;
        let mut opened = Vec::new();
        for lt in types {
            let carried = if lt.carry_forward {
                match self.store.get_balance(employee_id, lt.id, year - 1).await? {
                    Some(prev) => {
                        let surplus = prev.available.max(0.0);
                        match lt.max_carry_forward {
                            Some(cap) => surplus.min(cap),
                            None => surplus,
                        }
                    }
                    None => 0.0,
                }
            } else {
                0.0
            };

            let frontload = (lt.accrual_method == AccrualMethod::AnnualFrontload)
                .then_some(lt.annual_entitlement);
            let mut balance = self.balance(employee_id, lt.id, year).await?;
            balance.open_year(carried, frontload)?;
            self.persist(&balance).await?;
            opened.push(balance);
        }
        Ok(opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::TypeRegistry;
    use crate::model::{Gender, LeaveKind};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn profile(employee_id: u64, joined: NaiveDate) -> EmployeeProfile {
        EmployeeProfile {
            employee_id,
            full_name: "Test Employee".into(),
            gender: Gender::Female,
            department: "Engineering".into(),
            manager_id: None,
            date_of_joining: joined,
            active: true,
        }
    }

    async fn setup() -> (BalanceLedger, TypeRegistry) {
        let store = Arc::new(Store::mem());
        let registry = TypeRegistry::new(store.clone());
        registry.seed_defaults().await.unwrap();
        let ledger = BalanceLedger::new(store, Arc::new(LockMap::new()));
        (ledger, registry)
    }

    #[tokio::test]
    async fn reserve_commit_cycle_keeps_invariant() {
        let (ledger, registry) = setup().await;
        let el = registry.get_by_kind(LeaveKind::EarnedLeave).await.unwrap();

        ledger
            .admin_credit(1, el.id, 2025, 10.0, CreditBucket::Entitlement)
            .await
            .unwrap();
        let b = ledger.reserve(&el, 1, 2025, 3.0).await.unwrap();
        assert_eq!(b.available, 7.0);
        assert_eq!(b.pending_approval, 3.0);
        assert!(b.invariant_holds());

        let b = ledger.commit(1, el.id, 2025, 3.0).await.unwrap();
        assert_eq!(b.taken, 3.0);
        assert_eq!(b.available, 7.0);
        assert!(b.invariant_holds());
    }

    #[tokio::test]
    async fn reserve_fails_without_balance_and_leaves_row_clean() {
        let (ledger, registry) = setup().await;
        let cl = registry.get_by_kind(LeaveKind::CasualLeave).await.unwrap();
        let err = ledger.reserve(&cl, 2, 2025, 2.0).await.unwrap_err();
        assert!(matches!(err, LeaveError::InsufficientBalance { .. }));
        let b = ledger.balance_snapshot(2, cl.id, 2025).await.unwrap();
        assert_eq!(b.pending_approval, 0.0);
        assert_eq!(b.available, 0.0);
    }

    #[tokio::test]
    async fn lop_reserves_into_negative() {
        let (ledger, registry) = setup().await;
        let lop = registry.get_by_kind(LeaveKind::LossOfPay).await.unwrap();
        let b = ledger.reserve(&lop, 3, 2025, 3.0).await.unwrap();
        assert_eq!(b.available, -3.0);
        assert!(b.invariant_holds());
    }

    #[tokio::test]
    async fn monthly_accrual_full_year() {
        let (ledger, registry) = setup().await;
        let el = registry.get_by_kind(LeaveKind::EarnedLeave).await.unwrap();
        let p = profile(4, d(2020, 1, 1));

        // Accrual for a past year earns all twelve months.
        ledger
            .accrue_monthly(&[el.clone()], &p, 2024, d(2025, 6, 1))
            .await
            .unwrap();
        let b = ledger.balance_snapshot(4, el.id, 2024).await.unwrap();
        assert!((b.accrued - 15.0).abs() < 1e-9);
        assert!((b.available - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn joining_month_rules_apply() {
        let (ledger, registry) = setup().await;
        let el = registry.get_by_kind(LeaveKind::EarnedLeave).await.unwrap();
        let monthly = 15.0 / 12.0;

        // Joined on the 15th of March: half of March plus April..June.
        let p = profile(5, d(2025, 3, 15));
        ledger
            .accrue_monthly(&[el.clone()], &p, 2025, d(2025, 6, 30))
            .await
            .unwrap();
        let b = ledger.balance_snapshot(5, el.id, 2025).await.unwrap();
        assert!((b.accrued - (monthly / 2.0 + 3.0 * monthly)).abs() < 1e-9);

        // Joined on the 25th: the joining month earns nothing.
        let p = profile(6, d(2025, 3, 25));
        ledger
            .accrue_monthly(&[el.clone()], &p, 2025, d(2025, 6, 30))
            .await
            .unwrap();
        let b = ledger.balance_snapshot(6, el.id, 2025).await.unwrap();
        assert!((b.accrued - 3.0 * monthly).abs() < 1e-9);
    }

    #[tokio::test]
    async fn accrual_is_idempotent() {
        let (ledger, registry) = setup().await;
        let el = registry.get_by_kind(LeaveKind::EarnedLeave).await.unwrap();
        let p = profile(7, d(2020, 1, 1));
        for _ in 0..3 {
            ledger
                .accrue_monthly(&[el.clone()], &p, 2024, d(2025, 1, 1))
                .await
                .unwrap();
        }
        let b = ledger.balance_snapshot(7, el.id, 2024).await.unwrap();
        assert!((b.accrued - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn carry_forward_caps_at_policy_maximum() {
        let (ledger, registry) = setup().await;
        let sl = registry.get_by_kind(LeaveKind::SickLeave).await.unwrap();

        // 30 available in 2024, but SL carries at most 24.
        ledger
            .admin_credit(8, sl.id, 2024, 30.0, CreditBucket::Entitlement)
            .await
            .unwrap();
        let opened = ledger
            .start_new_year(&[sl.clone()], 8, 2025)
            .await
            .unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].carried_forward, 24.0);
        assert_eq!(opened[0].available, 24.0);
    }

    #[tokio::test]
    async fn frontload_grants_full_entitlement_on_new_year() {
        let (ledger, registry) = setup().await;
        let rh = registry
            .get_by_kind(LeaveKind::RestrictedHoliday)
            .await
            .unwrap();
        let opened = ledger.start_new_year(&[rh.clone()], 9, 2025).await.unwrap();
        assert_eq!(opened[0].entitlement, 2.0);
        assert_eq!(opened[0].available, 2.0);
    }

    #[tokio::test]
    async fn encash_requires_policy_flag() {
        let (ledger, registry) = setup().await;
        let cl = registry.get_by_kind(LeaveKind::CasualLeave).await.unwrap();
        assert!(matches!(
            ledger.encash(&cl, 10, 2025, 1.0).await,
            Err(LeaveError::Validation { .. })
        ));

        let el = registry.get_by_kind(LeaveKind::EarnedLeave).await.unwrap();
        ledger
            .admin_credit(10, el.id, 2025, 12.0, CreditBucket::Entitlement)
            .await
            .unwrap();
        let b = ledger.encash(&el, 10, 2025, 5.0).await.unwrap();
        assert_eq!(b.encashed, 5.0);
        assert_eq!(b.available, 7.0);
    }

    #[tokio::test]
    async fn concurrent_reserves_never_oversell() {
        let (ledger, registry) = setup().await;
        let el = registry.get_by_kind(LeaveKind::EarnedLeave).await.unwrap();
        ledger
            .admin_credit(11, el.id, 2025, 1.0, CreditBucket::Entitlement)
            .await
            .unwrap();

        let ledger = Arc::new(ledger);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let ledger = ledger.clone();
            let el = el.clone();
            handles.push(tokio::spawn(async move {
                let _guard = ledger.locks.acquire(11).await;
                ledger.reserve(&el, 11, 2025, 1.0).await.is_ok()
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        let b = ledger.balance_snapshot(11, el.id, 2025).await.unwrap();
        assert_eq!(b.pending_approval, 1.0);
        assert!(b.invariant_holds());
    }
}
