//! Compensatory-credit workflow.
//!
//! Employees ask for a one-day credit for working a holiday or weekend.
//! Approval drives a single ledger credit into the Compensatory-Off balance
//! for the year the day was worked; rejection has no ledger effect. No
//! overlap or sufficiency checks apply since this flow only ever adds.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};

use crate::core::ledger::{BalanceLedger, LockMap};
use crate::core::registry::TypeRegistry;
use crate::error::{LeaveError, LeaveResult};
use crate::model::{Caller, CreditBucket, CreditStatus, LeaveCreditRequest, LeaveKind, Role};
use crate::notify::{EventKind, LeaveEvent, Notifier};
use crate::store::Store;

const MIN_REASON_LEN: usize = 5;

pub struct CreditWorkflow {
    store: Arc<Store>,
    ledger: Arc<BalanceLedger>,
    registry: Arc<TypeRegistry>,
    locks: Arc<LockMap>,
    notifier: Arc<dyn Notifier>,
}

impl CreditWorkflow {
    pub fn new(
        store: Arc<Store>,
        ledger: Arc<BalanceLedger>,
        registry: Arc<TypeRegistry>,
        locks: Arc<LockMap>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        CreditWorkflow {
            store,
            ledger,
            registry,
            locks,
            notifier,
        }
    }

    pub async fn request(
        &self,
        employee_id: u64,
        caller: &Caller,
        date_worked: NaiveDate,
        reason: &str,
        today: NaiveDate,
    ) -> LeaveResult<LeaveCreditRequest> {
        if !caller.acts_for(employee_id) {
            return Err(LeaveError::permission(
                "cannot request credit for another employee",
            ));
        }
        if date_worked > today {
            return Err(LeaveError::validation("date_worked must not be in the future"));
        }
        let reason = reason.trim();
        if reason.len() < MIN_REASON_LEN {
            return Err(LeaveError::validation(format!(
                "reason must be at least {MIN_REASON_LEN} characters"
            )));
        }

        let req = LeaveCreditRequest {
            id: 0,
            employee_id,
            date_worked,
            reason: reason.to_string(),
            status: CreditStatus::Pending,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
        };
        let id = self.store.insert_credit_request(&req).await?;
        let req = LeaveCreditRequest { id, ..req };

        self.notifier.notify(LeaveEvent::new(
            EventKind::CreditRequested,
            employee_id,
            req.id,
            format!("worked {}", req.date_worked),
        ));
        Ok(req)
    }

    fn check_decider(caller: &Caller, manager_id: Option<u64>) -> LeaveResult<()> {
        if caller.role.is_admin() {
            return Ok(());
        }
        if caller.role == Role::Manager
            && manager_id.is_some()
            && manager_id == caller.employee_id
        {
            return Ok(());
        }
        Err(LeaveError::permission(
            "only the employee's manager or an HR administrator may decide credit requests",
        ))
    }

    pub async fn approve(&self, id: u64, caller: &Caller) -> LeaveResult<LeaveCreditRequest> {
        let preview = self
            .store
            .get_credit_request(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("credit request"))?;
        let _guard = self.locks.acquire(preview.employee_id).await;

        let mut req = self
            .store
            .get_credit_request(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("credit request"))?;
        if req.status != CreditStatus::Pending {
            return Err(LeaveError::invalid_transition(format!(
                "cannot approve a credit request in state {}",
                req.status
            )));
        }

        let profile = self
            .store
            .get_employee(req.employee_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("employee profile"))?;
        Self::check_decider(caller, profile.manager_id)?;

        let co = self.registry.get_by_kind(LeaveKind::CompensatoryOff).await?;
        self.ledger
            .credit(
                req.employee_id,
                co.id,
                req.date_worked.year(),
                1.0,
                CreditBucket::Accrued,
            )
            .await?;

        req.status = CreditStatus::Approved;
        req.approved_by = caller.employee_id;
        req.approved_at = Some(Utc::now());
        self.store.update_credit_request(&req).await?;

        self.notifier.notify(LeaveEvent::new(
            EventKind::CreditApproved,
            req.employee_id,
            req.id,
            "1 compensatory-off day credited".to_string(),
        ));
        Ok(req)
    }

    pub async fn reject(&self, id: u64, caller: &Caller) -> LeaveResult<LeaveCreditRequest> {
        let mut req = self
            .store
            .get_credit_request(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("credit request"))?;
        if req.status != CreditStatus::Pending {
            return Err(LeaveError::invalid_transition(format!(
                "cannot reject a credit request in state {}",
                req.status
            )));
        }

        let profile = self
            .store
            .get_employee(req.employee_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("employee profile"))?;
        Self::check_decider(caller, profile.manager_id)?;

        req.status = CreditStatus::Rejected;
        req.approved_by = caller.employee_id;
        req.approved_at = Some(Utc::now());
        self.store.update_credit_request(&req).await?;

        self.notifier.notify(LeaveEvent::new(
            EventKind::CreditRejected,
            req.employee_id,
            req.id,
            "credit request rejected".to_string(),
        ));
        Ok(req)
    }

    pub async fn list_for_employee(
        &self,
        employee_id: u64,
        caller: &Caller,
    ) -> LeaveResult<Vec<LeaveCreditRequest>> {
        if !caller.acts_for(employee_id) && caller.role != Role::Manager {
            return Err(LeaveError::permission("cannot view these credit requests"));
        }
        self.store.list_credit_requests(Some(employee_id), None).await
    }

    pub async fn list_pending(&self, caller: &Caller) -> LeaveResult<Vec<LeaveCreditRequest>> {
        if !caller.role.can_approve() {
            return Err(LeaveError::permission("approver role required"));
        }
        let pending = self
            .store
            .list_credit_requests(None, Some(CreditStatus::Pending))
            .await?;
        if caller.role.is_admin() {
            return Ok(pending);
        }

        let own = caller
            .employee_id
            .ok_or_else(|| LeaveError::permission("approver must be an employee"))?;
        let team: Vec<u64> = self
            .store
            .list_employees()
            .await?
            .into_iter()
            .filter(|e| e.manager_id == Some(own))
            .map(|e| e.employee_id)
            .collect();
        Ok(pending
            .into_iter()
            .filter(|r| team.contains(&r.employee_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmployeeProfile, Gender};
    use crate::notify::LogNotifier;

    const EMPLOYEE: u64 = 1;
    const MANAGER: u64 = 2;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn employee_caller() -> Caller {
        Caller {
            employee_id: Some(EMPLOYEE),
            role: Role::Employee,
        }
    }

    fn manager_caller() -> Caller {
        Caller {
            employee_id: Some(MANAGER),
            role: Role::Manager,
        }
    }

    async fn workflow() -> (CreditWorkflow, Arc<BalanceLedger>, Arc<TypeRegistry>) {
        let store = Arc::new(Store::mem());
        let locks = Arc::new(LockMap::new());
        let registry = Arc::new(TypeRegistry::new(store.clone()));
        registry.seed_defaults().await.unwrap();
        let ledger = Arc::new(BalanceLedger::new(store.clone(), locks.clone()));
        store
            .upsert_employee(&EmployeeProfile {
                employee_id: EMPLOYEE,
                full_name: "Credit Tester".into(),
                gender: Gender::Male,
                department: "Support".into(),
                manager_id: Some(MANAGER),
                date_of_joining: d(2022, 5, 1),
                active: true,
            })
            .await
            .unwrap();
        let wf = CreditWorkflow::new(
            store,
            ledger.clone(),
            registry.clone(),
            locks,
            Arc::new(LogNotifier),
        );
        (wf, ledger, registry)
    }

    #[tokio::test]
    async fn approval_credits_one_compensatory_day() {
        let (wf, ledger, registry) = workflow().await;
        // Worked a Sunday holiday.
        let req = wf
            .request(
                EMPLOYEE,
                &employee_caller(),
                d(2025, 1, 26),
                "worked the launch weekend",
                d(2025, 1, 27),
            )
            .await
            .unwrap();
        assert_eq!(req.status, CreditStatus::Pending);

        let approved = wf.approve(req.id, &manager_caller()).await.unwrap();
        assert_eq!(approved.status, CreditStatus::Approved);

        let co = registry
            .get_by_kind(LeaveKind::CompensatoryOff)
            .await
            .unwrap();
        let b = ledger
            .balance_snapshot(EMPLOYEE, co.id, 2025)
            .await
            .unwrap();
        assert_eq!(b.accrued, 1.0);
        assert_eq!(b.available, 1.0);
        assert!(b.invariant_holds());
    }

    #[tokio::test]
    async fn rejection_leaves_the_ledger_untouched() {
        let (wf, ledger, registry) = workflow().await;
        let req = wf
            .request(
                EMPLOYEE,
                &employee_caller(),
                d(2025, 2, 2),
                "production incident on Sunday",
                d(2025, 2, 3),
            )
            .await
            .unwrap();
        wf.reject(req.id, &manager_caller()).await.unwrap();

        let co = registry
            .get_by_kind(LeaveKind::CompensatoryOff)
            .await
            .unwrap();
        let b = ledger
            .balance_snapshot(EMPLOYEE, co.id, 2025)
            .await
            .unwrap();
        assert_eq!(b.accrued, 0.0);
        assert_eq!(b.available, 0.0);
    }

    #[tokio::test]
    async fn future_dates_and_short_reasons_are_rejected() {
        let (wf, _, _) = workflow().await;
        assert!(matches!(
            wf.request(EMPLOYEE, &employee_caller(), d(2025, 6, 1), "long enough", d(2025, 5, 1))
                .await,
            Err(LeaveError::Validation { .. })
        ));
        assert!(matches!(
            wf.request(EMPLOYEE, &employee_caller(), d(2025, 4, 6), "abc", d(2025, 5, 1))
                .await,
            Err(LeaveError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn decisions_are_single_shot_and_gated() {
        let (wf, _, _) = workflow().await;
        let req = wf
            .request(
                EMPLOYEE,
                &employee_caller(),
                d(2025, 2, 2),
                "weekend deployment",
                d(2025, 2, 3),
            )
            .await
            .unwrap();

        // The employee cannot decide their own request.
        assert!(matches!(
            wf.approve(req.id, &employee_caller()).await,
            Err(LeaveError::PermissionDenied { .. })
        ));

        wf.approve(req.id, &manager_caller()).await.unwrap();
        assert!(matches!(
            wf.approve(req.id, &manager_caller()).await,
            Err(LeaveError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            wf.reject(req.id, &manager_caller()).await,
            Err(LeaveError::InvalidStateTransition { .. })
        ));
    }
}
