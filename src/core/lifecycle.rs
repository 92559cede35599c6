//! Application Lifecycle Engine.
//!
//! Owns the state machine `pending -> approved | rejected | cancelled` and
//! the in-place shrink of an approved leave on recall. Every path that
//! checks-then-acts on a balance (overlap test, reservation, commit,
//! release, restore) runs with the employee's serialization guard held, so
//! two concurrent submissions for overlapping dates cannot both succeed.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::core::calendar::HolidayCalendar;
use crate::core::ledger::{BalanceLedger, LockMap};
use crate::core::registry::TypeRegistry;
use crate::core::workdays;
use crate::error::{LeaveError, LeaveResult};
use crate::model::{
    Caller, DurationType, EmployeeProfile, LeaveApplication, LeaveKind, LeaveStatus, LeaveType,
    Role,
};
use crate::notify::{EventKind, LeaveEvent, Notifier};
use crate::store::{ApplicationFilter, Store};

const EPS: f64 = 1e-9;

/// Submission payload. `number_of_days` is accepted for wire compatibility
/// with the dashboard but never read; the engine recomputes it.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitLeave {
    /// Defaults to the caller's own employee record; HR/super-admins may
    /// submit on another employee's behalf.
    #[serde(default)]
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    pub duration_type: DurationType,
    #[schema(example = "2025-03-10", value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(example = "2025-03-12", value_type = Option<String>, format = "date")]
    pub to_date: Option<NaiveDate>,
    #[schema(example = "Family function")]
    pub reason: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub attachment: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub number_of_days: Option<f64>,
}

struct ValidatedRequest {
    leave_type: LeaveType,
    from: NaiveDate,
    to: NaiveDate,
    days: f64,
}

pub struct LifecycleEngine {
    store: Arc<Store>,
    ledger: Arc<BalanceLedger>,
    registry: Arc<TypeRegistry>,
    calendar: Arc<HolidayCalendar>,
    locks: Arc<LockMap>,
    notifier: Arc<dyn Notifier>,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<Store>,
        ledger: Arc<BalanceLedger>,
        registry: Arc<TypeRegistry>,
        calendar: Arc<HolidayCalendar>,
        locks: Arc<LockMap>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        LifecycleEngine {
            store,
            ledger,
            registry,
            calendar,
            locks,
            notifier,
        }
    }

    async fn profile(&self, employee_id: u64) -> LeaveResult<EmployeeProfile> {
        self.store
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("employee profile"))
    }

    /// Eligibility and day-count validation shared by submit and update.
    async fn validate_request(
        &self,
        profile: &EmployeeProfile,
        req: &SubmitLeave,
        today: NaiveDate,
    ) -> LeaveResult<ValidatedRequest> {
        if req.reason.trim().is_empty() {
            return Err(LeaveError::validation("reason is required"));
        }
        let from = req.from_date;
        let to = req.to_date.unwrap_or(from);
        if to < from {
            return Err(LeaveError::validation("to_date must not precede from_date"));
        }

        let leave_type = self.registry.get(req.leave_type_id).await?;
        if leave_type.kind.is_internal_only() {
            return Err(LeaveError::validation(format!(
                "{} cannot be applied for directly",
                leave_type.kind
            )));
        }
        if !leave_type.gender_eligibility.permits(profile.gender) {
            return Err(LeaveError::validation(format!(
                "{} is not available for this employee",
                leave_type.kind
            )));
        }
        if leave_type.requires_document && req.attachment.is_none() {
            return Err(LeaveError::validation(format!(
                "{} requires a supporting document",
                leave_type.kind
            )));
        }

        let years: Vec<i32> = (from.year()..=to.year()).collect();
        let holidays = self.calendar.dates_for_years(&years).await?;
        let days = workdays::chargeable_days(from, Some(to), req.duration_type, &holidays);
        if days <= 0.0 {
            return Err(LeaveError::validation(
                "the selected range contains no working days",
            ));
        }

        if let Some(min_notice) = leave_type.min_days_in_advance {
            if (from - today).num_days() < i64::from(min_notice) {
                return Err(LeaveError::validation(format!(
                    "{} requires {min_notice} days advance notice",
                    leave_type.kind
                )));
            }
        }
        if let Some(cap) = leave_type.max_consecutive_days {
            if days > cap + EPS {
                return Err(LeaveError::validation(format!(
                    "{} allows at most {cap} consecutive days",
                    leave_type.kind
                )));
            }
        }

        Ok(ValidatedRequest {
            leave_type,
            from,
            to,
            days,
        })
    }

    /// Reserve, silently falling back to loss-of-pay for the standard paid
    /// categories when the balance cannot cover the request. The fallback is
    /// recorded in the reason for auditability.
    async fn reserve_with_substitution(
        &self,
        employee_id: u64,
        leave_type: &LeaveType,
        year: i32,
        days: f64,
        reason: &str,
    ) -> LeaveResult<(LeaveType, String, bool)> {
        let mut effective = leave_type.clone();
        let mut reason = reason.to_string();
        let mut substituted = false;

        if !leave_type.negative_balance_allowed {
            let balance = self.ledger.balance(employee_id, leave_type.id, year).await?;
            if balance.available + EPS < days {
                if leave_type.kind.substitutes_to_lop() {
                    effective = self.registry.get_by_kind(LeaveKind::LossOfPay).await?;
                    reason = format!(
                        "{reason} [auto-converted from {} to loss_of_pay: insufficient balance]",
                        leave_type.kind
                    );
                    substituted = true;
                } else {
                    return Err(LeaveError::InsufficientBalance {
                        available: balance.available,
                        requested: days,
                    });
                }
            }
        }

        self.ledger.reserve(&effective, employee_id, year, days).await?;
        Ok((effective, reason, substituted))
    }

    fn check_approver(
        caller: &Caller,
        profile: &EmployeeProfile,
        level: u8,
    ) -> LeaveResult<()> {
        if caller.role.is_admin() {
            return Ok(());
        }
        if caller.role == Role::Manager {
            if profile.manager_id.is_some() && profile.manager_id == caller.employee_id {
                if level <= 1 {
                    return Ok(());
                }
                return Err(LeaveError::permission(format!(
                    "approval level {level} requires an HR administrator"
                )));
            }
            return Err(LeaveError::permission(
                "only the employee's manager may act on this application",
            ));
        }
        Err(LeaveError::permission("approver role required"))
    }

    fn append_note(existing: &mut Option<String>, note: Option<&str>) {
        let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
            return;
        };
        match existing {
            Some(current) => {
                current.push_str("; ");
                current.push_str(note);
            }
            None => *existing = Some(note.to_string()),
        }
    }

    pub async fn submit(
        &self,
        employee_id: u64,
        caller: &Caller,
        req: SubmitLeave,
        today: NaiveDate,
    ) -> LeaveResult<LeaveApplication> {
        if !caller.acts_for(employee_id) {
            return Err(LeaveError::permission(
                "cannot submit leave for another employee",
            ));
        }
        let profile = self.profile(employee_id).await?;
        if !profile.active {
            return Err(LeaveError::validation("employee is not active"));
        }

        let _guard = self.locks.acquire(employee_id).await;

        let validated = self.validate_request(&profile, &req, today).await?;

        let conflicts = self
            .store
            .live_applications_in_range(employee_id, validated.from, validated.to)
            .await?;
        if let Some(existing) = conflicts.first() {
            return Err(LeaveError::Overlap {
                from: existing.from_date,
                to: existing.to_date,
            });
        }

        let year = validated.from.year();
        let (effective_type, reason, substituted) = self
            .reserve_with_substitution(
                employee_id,
                &validated.leave_type,
                year,
                validated.days,
                &req.reason,
            )
            .await?;

        let app = LeaveApplication {
            id: 0,
            employee_id,
            leave_type_id: effective_type.id,
            from_date: validated.from,
            to_date: validated.to,
            duration_type: req.duration_type,
            number_of_days: validated.days,
            reason,
            contact_phone: req.contact_phone,
            contact_email: req.contact_email,
            attachment: req.attachment,
            status: LeaveStatus::Pending,
            current_approval_level: 1,
            approver_note: None,
            approved_by: None,
            approved_at: None,
            recalled_at: None,
            recall_reason: None,
            created_at: Utc::now(),
        };

        let app = match self.store.insert_application(&app).await {
            Ok(id) => LeaveApplication { id, ..app },
            Err(err) => {
                // The reservation must not outlive a failed insert.
                if let Err(release_err) = self
                    .ledger
                    .release(employee_id, effective_type.id, year, validated.days)
                    .await
                {
                    tracing::error!(
                        employee_id,
                        error = %release_err,
                        "failed to release reservation after insert failure"
                    );
                }
                return Err(err);
            }
        };

        if substituted {
            self.notifier.notify(LeaveEvent::new(
                EventKind::LeaveSubstituted,
                employee_id,
                app.id,
                format!(
                    "{} request converted to loss_of_pay",
                    validated.leave_type.kind
                ),
            ));
        }
        self.notifier.notify(LeaveEvent::new(
            EventKind::LeaveSubmitted,
            employee_id,
            app.id,
            format!("{} days from {}", app.number_of_days, app.from_date),
        ));
        Ok(app)
    }

    pub async fn approve(
        &self,
        id: u64,
        caller: &Caller,
        note: Option<&str>,
    ) -> LeaveResult<LeaveApplication> {
        let preview = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        let _guard = self.locks.acquire(preview.employee_id).await;

        let mut app = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        if app.status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_transition(format!(
                "cannot approve an application in state {}",
                app.status
            )));
        }

        let profile = self.profile(app.employee_id).await?;
        Self::check_approver(caller, &profile, app.current_approval_level)?;

        let leave_type = self.registry.get(app.leave_type_id).await?;
        let required = leave_type.required_approval_levels();

        if app.current_approval_level < required {
            app.current_approval_level += 1;
            Self::append_note(&mut app.approver_note, note);
            self.store.update_application(&app).await?;
            self.notifier.notify(LeaveEvent::new(
                EventKind::LeaveSignedOff,
                app.employee_id,
                app.id,
                format!(
                    "level {} of {} signed off",
                    app.current_approval_level - 1,
                    required
                ),
            ));
            return Ok(app);
        }

        app.status = LeaveStatus::Approved;
        Self::append_note(&mut app.approver_note, note);
        app.approved_by = caller.employee_id;
        app.approved_at = Some(Utc::now());
        self.store.update_application(&app).await?;

        if let Err(err) = self
            .ledger
            .commit(
                app.employee_id,
                app.leave_type_id,
                app.from_date.year(),
                app.number_of_days,
            )
            .await
        {
            // Roll the status back so the ledger and the application agree.
            app.status = LeaveStatus::Pending;
            app.approved_by = None;
            app.approved_at = None;
            if let Err(revert_err) = self.store.update_application(&app).await {
                tracing::error!(
                    application_id = app.id,
                    error = %revert_err,
                    "failed to revert approval after ledger failure"
                );
            }
            return Err(err);
        }

        self.notifier.notify(LeaveEvent::new(
            EventKind::LeaveApproved,
            app.employee_id,
            app.id,
            format!("{} days approved", app.number_of_days),
        ));
        Ok(app)
    }

    pub async fn reject(
        &self,
        id: u64,
        caller: &Caller,
        note: Option<&str>,
    ) -> LeaveResult<LeaveApplication> {
        let preview = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        let _guard = self.locks.acquire(preview.employee_id).await;

        let mut app = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        if app.status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_transition(format!(
                "cannot reject an application in state {}",
                app.status
            )));
        }

        let profile = self.profile(app.employee_id).await?;
        Self::check_approver(caller, &profile, app.current_approval_level)?;

        self.ledger
            .release(
                app.employee_id,
                app.leave_type_id,
                app.from_date.year(),
                app.number_of_days,
            )
            .await?;

        app.status = LeaveStatus::Rejected;
        Self::append_note(&mut app.approver_note, note);
        self.store.update_application(&app).await?;

        self.notifier.notify(LeaveEvent::new(
            EventKind::LeaveRejected,
            app.employee_id,
            app.id,
            format!("{} days released", app.number_of_days),
        ));
        Ok(app)
    }

    pub async fn cancel(&self, id: u64, caller: &Caller) -> LeaveResult<LeaveApplication> {
        let preview = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        let _guard = self.locks.acquire(preview.employee_id).await;

        let mut app = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        if !caller.acts_for(app.employee_id) {
            return Err(LeaveError::permission(
                "only the owning employee may cancel this application",
            ));
        }
        if app.status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_transition(format!(
                "cannot cancel an application in state {}",
                app.status
            )));
        }

        self.ledger
            .release(
                app.employee_id,
                app.leave_type_id,
                app.from_date.year(),
                app.number_of_days,
            )
            .await?;

        app.status = LeaveStatus::Cancelled;
        self.store.update_application(&app).await?;

        self.notifier.notify(LeaveEvent::new(
            EventKind::LeaveCancelled,
            app.employee_id,
            app.id,
            format!("{} days released", app.number_of_days),
        ));
        Ok(app)
    }

    /// Edit a pending application. The old reservation is released and the
    /// request re-validated from scratch, because dates, duration, and even
    /// the effective type may all change.
    pub async fn update(
        &self,
        id: u64,
        caller: &Caller,
        req: SubmitLeave,
        today: NaiveDate,
    ) -> LeaveResult<LeaveApplication> {
        let preview = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        let _guard = self.locks.acquire(preview.employee_id).await;

        let mut app = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        if !caller.acts_for(app.employee_id) {
            return Err(LeaveError::permission(
                "only the owning employee may edit this application",
            ));
        }
        if app.status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_transition(
                "only pending applications can be edited",
            ));
        }

        let profile = self.profile(app.employee_id).await?;
        let validated = self.validate_request(&profile, &req, today).await?;

        let conflicts = self
            .store
            .live_applications_in_range(app.employee_id, validated.from, validated.to)
            .await?;
        if let Some(existing) = conflicts.iter().find(|a| a.id != id) {
            return Err(LeaveError::Overlap {
                from: existing.from_date,
                to: existing.to_date,
            });
        }

        let old_type_id = app.leave_type_id;
        let old_year = app.from_date.year();
        let old_days = app.number_of_days;

        self.ledger
            .release(app.employee_id, old_type_id, old_year, old_days)
            .await?;

        let year = validated.from.year();
        let reserved = self
            .reserve_with_substitution(
                app.employee_id,
                &validated.leave_type,
                year,
                validated.days,
                &req.reason,
            )
            .await;
        let (effective_type, reason, _substituted) = match reserved {
            Ok(outcome) => outcome,
            Err(err) => {
                // Put the original reservation back before surfacing the error.
                let old_type = self.registry.get(old_type_id).await?;
                if let Err(revert_err) = self
                    .ledger
                    .reserve(&old_type, app.employee_id, old_year, old_days)
                    .await
                {
                    tracing::error!(
                        application_id = app.id,
                        error = %revert_err,
                        "failed to restore reservation after rejected edit"
                    );
                }
                return Err(err);
            }
        };

        app.leave_type_id = effective_type.id;
        app.from_date = validated.from;
        app.to_date = validated.to;
        app.duration_type = req.duration_type;
        app.number_of_days = validated.days;
        app.reason = reason;
        app.contact_phone = req.contact_phone;
        app.contact_email = req.contact_email;
        app.attachment = req.attachment;
        // Edits restart the sign-off chain.
        app.current_approval_level = 1;
        self.store.update_application(&app).await?;
        Ok(app)
    }

    /// Shorten an approved leave that is already in progress. The employee
    /// resumes work on `recall_date`; the unused remainder flows back into
    /// the balance.
    pub async fn recall(
        &self,
        id: u64,
        caller: &Caller,
        recall_date: NaiveDate,
        reason: &str,
    ) -> LeaveResult<LeaveApplication> {
        let preview = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        let _guard = self.locks.acquire(preview.employee_id).await;

        let mut app = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        if app.status != LeaveStatus::Approved {
            return Err(LeaveError::invalid_transition(
                "only approved applications can be recalled",
            ));
        }

        let profile = self.profile(app.employee_id).await?;
        Self::check_approver(caller, &profile, 1)?;

        if reason.trim().is_empty() {
            return Err(LeaveError::validation("recall reason is required"));
        }
        if recall_date <= app.from_date || recall_date >= app.to_date {
            return Err(LeaveError::validation(
                "recall date must fall strictly within the leave period",
            ));
        }

        let years: Vec<i32> = (app.from_date.year()..=recall_date.year()).collect();
        let holidays = self.calendar.dates_for_years(&years).await?;
        let shortened = workdays::chargeable_days(
            app.from_date,
            Some(recall_date),
            app.duration_type,
            &holidays,
        );
        let unused = app.number_of_days - shortened;

        let original = app.clone();
        app.to_date = recall_date;
        app.number_of_days = shortened;
        app.recalled_at = Some(Utc::now());
        app.recall_reason = Some(reason.trim().to_string());
        self.store.update_application(&app).await?;

        if unused > EPS {
            if let Err(err) = self
                .ledger
                .restore(
                    app.employee_id,
                    app.leave_type_id,
                    app.from_date.year(),
                    unused,
                )
                .await
            {
                if let Err(revert_err) = self.store.update_application(&original).await {
                    tracing::error!(
                        application_id = app.id,
                        error = %revert_err,
                        "failed to revert recall after ledger failure"
                    );
                }
                return Err(err);
            }
        }

        self.notifier.notify(LeaveEvent::new(
            EventKind::LeaveRecalled,
            app.employee_id,
            app.id,
            format!("{unused} unused days restored"),
        ));
        Ok(app)
    }

    pub async fn get(&self, id: u64, caller: &Caller) -> LeaveResult<LeaveApplication> {
        let app = self
            .store
            .get_application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application"))?;
        if caller.acts_for(app.employee_id) || caller.role.can_approve() {
            return Ok(app);
        }
        Err(LeaveError::permission("cannot view this application"))
    }

    /// Listing, scoped by role: employees see their own applications,
    /// managers their direct reports plus themselves, admins everything.
    pub async fn list(
        &self,
        caller: &Caller,
        mut filter: ApplicationFilter,
    ) -> LeaveResult<(Vec<LeaveApplication>, i64)> {
        match caller.role {
            Role::Employee => {
                let own = caller.employee_id.ok_or_else(|| {
                    LeaveError::permission("user is not linked to an employee record")
                })?;
                filter.employee_id = Some(own);
            }
            Role::Manager => {
                let own = caller.employee_id.ok_or_else(|| {
                    LeaveError::permission("user is not linked to an employee record")
                })?;
                let mut team: Vec<u64> = self
                    .store
                    .list_employees()
                    .await?
                    .into_iter()
                    .filter(|e| e.manager_id == Some(own))
                    .map(|e| e.employee_id)
                    .collect();
                team.push(own);
                match filter.employee_id {
                    Some(id) if !team.contains(&id) => {
                        return Err(LeaveError::permission(
                            "managers may only list their own team",
                        ));
                    }
                    Some(_) => {}
                    None => filter.employee_ids = Some(team),
                }
            }
            Role::HrAdmin | Role::SuperAdmin => {}
        }
        self.store.list_applications(&filter).await
    }

    /// Pending applications awaiting the caller's sign-off.
    pub async fn pending_approvals(
        &self,
        caller: &Caller,
    ) -> LeaveResult<Vec<LeaveApplication>> {
        if !caller.role.can_approve() {
            return Err(LeaveError::permission("approver role required"));
        }
        let filter = ApplicationFilter {
            status: Some(LeaveStatus::Pending),
            per_page: u64::MAX,
            ..Default::default()
        };
        let (pending, _) = self.store.list_applications(&filter).await?;
        if caller.role.is_admin() {
            return Ok(pending);
        }

        // Managers only see level-1 items from their direct reports.
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
            .filter(|a| team.contains(&a.employee_id) && a.current_approval_level == 1)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreditBucket, Gender};
    use crate::notify::test_support::RecordingNotifier;

    const EMPLOYEE: u64 = 1000;
    const MANAGER: u64 = 2000;
    const HR: u64 = 3000;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Monday before the test week.
    fn today() -> NaiveDate {
        d(2025, 3, 3)
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

    fn hr_caller() -> Caller {
        Caller {
            employee_id: Some(HR),
            role: Role::HrAdmin,
        }
    }

    struct Fixture {
        engine: LifecycleEngine,
        ledger: Arc<BalanceLedger>,
        registry: Arc<TypeRegistry>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Fixture {
        async fn leave_type(&self, kind: LeaveKind) -> LeaveType {
            self.registry.get_by_kind(kind).await.unwrap()
        }

        async fn grant(&self, kind: LeaveKind, days: f64) {
            let lt = self.leave_type(kind).await;
            self.ledger
                .admin_credit(EMPLOYEE, lt.id, 2025, days, CreditBucket::Entitlement)
                .await
                .unwrap();
        }

        async fn balance_of(&self, kind: LeaveKind) -> crate::model::LeaveBalance {
            let lt = self.leave_type(kind).await;
            self.ledger
                .balance_snapshot(EMPLOYEE, lt.id, 2025)
                .await
                .unwrap()
        }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(Store::mem());
        let locks = Arc::new(LockMap::new());
        let registry = Arc::new(TypeRegistry::new(store.clone()));
        registry.seed_defaults().await.unwrap();
        let calendar = Arc::new(HolidayCalendar::new(store.clone()));
        let ledger = Arc::new(BalanceLedger::new(store.clone(), locks.clone()));
        let notifier = Arc::new(RecordingNotifier::default());

        for (id, manager_id, role_name, gender) in [
            (EMPLOYEE, Some(MANAGER), "employee", Gender::Female),
            (MANAGER, None, "manager", Gender::Male),
            (HR, None, "hr", Gender::Other),
        ] {
            store
                .upsert_employee(&EmployeeProfile {
                    employee_id: id,
                    full_name: format!("Test {role_name}"),
                    gender,
                    department: "Engineering".into(),
                    manager_id,
                    date_of_joining: d(2020, 1, 1),
                    active: true,
                })
                .await
                .unwrap();
        }

        let engine = LifecycleEngine::new(
            store,
            ledger.clone(),
            registry.clone(),
            calendar,
            locks,
            notifier.clone(),
        );
        Fixture {
            engine,
            ledger,
            registry,
            notifier,
        }
    }

    fn request(kind_type_id: u64, from: NaiveDate, to: Option<NaiveDate>) -> SubmitLeave {
        SubmitLeave {
            employee_id: None,
            leave_type_id: kind_type_id,
            duration_type: if to.is_some() {
                DurationType::MultipleDays
            } else {
                DurationType::FullDay
            },
            from_date: from,
            to_date: to,
            reason: "family function".into(),
            contact_phone: None,
            contact_email: None,
            attachment: None,
            number_of_days: None,
        }
    }

    #[tokio::test]
    async fn submit_and_approve_end_to_end() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        // Full day on a working Monday.
        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), None),
                today(),
            )
            .await
            .unwrap();
        assert_eq!(app.status, LeaveStatus::Pending);
        assert_eq!(app.number_of_days, 1.0);

        let b = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(b.pending_approval, 1.0);
        assert_eq!(b.available, 9.0);

        let approved = fx
            .engine
            .approve(app.id, &manager_caller(), Some("enjoy"))
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.approved_by, Some(MANAGER));

        let b = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(b.taken, 1.0);
        assert_eq!(b.pending_approval, 0.0);
        assert_eq!(b.available, 9.0);
    }

    #[tokio::test]
    async fn client_supplied_day_count_is_ignored() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        let mut req = request(el.id, d(2025, 3, 10), Some(d(2025, 3, 12)));
        req.number_of_days = Some(99.0);
        let app = fx
            .engine
            .submit(EMPLOYEE, &employee_caller(), req, today())
            .await
            .unwrap();
        assert_eq!(app.number_of_days, 3.0);
    }

    #[tokio::test]
    async fn overlapping_submission_is_rejected() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        fx.grant(LeaveKind::CasualLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;
        let cl = fx.leave_type(LeaveKind::CasualLeave).await;

        fx.engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), Some(d(2025, 3, 12))),
                today(),
            )
            .await
            .unwrap();

        let err = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(cl.id, d(2025, 3, 12), Some(d(2025, 3, 14))),
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Overlap { .. }));

        // The balance must be untouched by the failed attempt.
        let b = fx.balance_of(LeaveKind::CasualLeave).await;
        assert_eq!(b.pending_approval, 0.0);
        assert_eq!(b.available, 10.0);
    }

    #[tokio::test]
    async fn insufficient_standard_leave_converts_to_lop() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 1.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        // Three working days against an available balance of one.
        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), Some(d(2025, 3, 12))),
                today(),
            )
            .await
            .unwrap();

        let lop = fx.leave_type(LeaveKind::LossOfPay).await;
        assert_eq!(app.leave_type_id, lop.id);
        assert!(app.reason.contains("loss_of_pay"));

        let el_balance = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(el_balance.available, 1.0);
        assert_eq!(el_balance.pending_approval, 0.0);

        let lop_balance = fx.balance_of(LeaveKind::LossOfPay).await;
        assert_eq!(lop_balance.pending_approval, 3.0);
        assert_eq!(lop_balance.available, -3.0);

        let events = fx.notifier.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| e.kind == EventKind::LeaveSubstituted));
    }

    #[tokio::test]
    async fn non_standard_insufficient_balance_fails_outright() {
        let fx = fixture().await;
        let mrl = fx.leave_type(LeaveKind::MarriageLeave).await;
        let err = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(mrl.id, d(2025, 3, 10), Some(d(2025, 3, 12))),
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn internal_only_types_cannot_be_applied_for() {
        let fx = fixture().await;
        let lop = fx.leave_type(LeaveKind::LossOfPay).await;
        let err = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(lop.id, d(2025, 3, 10), None),
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    #[tokio::test]
    async fn gender_eligibility_is_enforced() {
        let fx = fixture().await;
        // PL is male-only; the test employee is female.
        let pl = fx.leave_type(LeaveKind::PaternityLeave).await;
        let err = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(pl.id, d(2025, 3, 10), None),
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    #[tokio::test]
    async fn weekend_only_range_is_rejected() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;
        let err = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 8), Some(d(2025, 3, 9))),
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    #[tokio::test]
    async fn advance_notice_is_enforced() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;
        // EL wants three days of notice; March 4th is tomorrow.
        let err = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 4), None),
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    #[tokio::test]
    async fn cancel_releases_and_cannot_repeat() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), Some(d(2025, 3, 12))),
                today(),
            )
            .await
            .unwrap();
        let b = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(b.available, 7.0);

        fx.engine.cancel(app.id, &employee_caller()).await.unwrap();
        let b = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(b.available, 10.0);
        assert_eq!(b.pending_approval, 0.0);

        let err = fx
            .engine
            .cancel(app.id, &employee_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn reject_releases_reservation() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), None),
                today(),
            )
            .await
            .unwrap();
        let rejected = fx
            .engine
            .reject(app.id, &manager_caller(), Some("short staffed"))
            .await
            .unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);

        let b = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(b.available, 10.0);

        // Terminal: a second decision must fail.
        assert!(matches!(
            fx.engine.approve(app.id, &hr_caller(), None).await,
            Err(LeaveError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn employee_cannot_approve_and_strangers_cannot_cancel() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;
        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), None),
                today(),
            )
            .await
            .unwrap();

        assert!(matches!(
            fx.engine.approve(app.id, &employee_caller(), None).await,
            Err(LeaveError::PermissionDenied { .. })
        ));

        let stranger = Caller {
            employee_id: Some(4242),
            role: Role::Employee,
        };
        assert!(matches!(
            fx.engine.cancel(app.id, &stranger).await,
            Err(LeaveError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn recall_restores_exactly_the_unused_days() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        // Monday through Friday: five working days.
        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), Some(d(2025, 3, 14))),
                today(),
            )
            .await
            .unwrap();
        assert_eq!(app.number_of_days, 5.0);
        fx.engine.approve(app.id, &hr_caller(), None).await.unwrap();

        // Recalled Wednesday: Mon-Wed charged, Thu-Fri restored.
        let recalled = fx
            .engine
            .recall(app.id, &manager_caller(), d(2025, 3, 12), "client escalation")
            .await
            .unwrap();
        assert_eq!(recalled.status, LeaveStatus::Approved);
        assert_eq!(recalled.number_of_days, 3.0);
        assert_eq!(recalled.to_date, d(2025, 3, 12));
        assert!(recalled.recalled_at.is_some());

        let b = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(b.taken, 3.0);
        assert_eq!(b.available, 7.0);
        assert!(b.invariant_holds());
    }

    #[tokio::test]
    async fn recall_bounds_are_strict() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;
        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), Some(d(2025, 3, 14))),
                today(),
            )
            .await
            .unwrap();

        // Not approved yet.
        assert!(matches!(
            fx.engine
                .recall(app.id, &hr_caller(), d(2025, 3, 12), "x")
                .await,
            Err(LeaveError::InvalidStateTransition { .. })
        ));

        fx.engine.approve(app.id, &hr_caller(), None).await.unwrap();
        for bad in [d(2025, 3, 10), d(2025, 3, 14), d(2025, 3, 20)] {
            assert!(matches!(
                fx.engine.recall(app.id, &hr_caller(), bad, "x").await,
                Err(LeaveError::Validation { .. })
            ));
        }
    }

    #[tokio::test]
    async fn multi_level_approval_commits_only_at_final_level() {
        let fx = fixture().await;
        fx.grant(LeaveKind::MaternityLeave, 180.0).await;
        let ml = fx.leave_type(LeaveKind::MaternityLeave).await;

        let mut req = request(ml.id, d(2025, 3, 10), Some(d(2025, 3, 21)));
        req.attachment = Some("doc-ref-991".into());
        let app = fx
            .engine
            .submit(EMPLOYEE, &employee_caller(), req, today())
            .await
            .unwrap();
        assert_eq!(app.number_of_days, 10.0);

        // Level 1: manager signs off, application stays pending.
        let signed = fx
            .engine
            .approve(app.id, &manager_caller(), Some("ok by me"))
            .await
            .unwrap();
        assert_eq!(signed.status, LeaveStatus::Pending);
        assert_eq!(signed.current_approval_level, 2);
        let b = fx.balance_of(LeaveKind::MaternityLeave).await;
        assert_eq!(b.taken, 0.0);
        assert_eq!(b.pending_approval, 10.0);

        // The manager cannot sign level 2.
        assert!(matches!(
            fx.engine.approve(app.id, &manager_caller(), None).await,
            Err(LeaveError::PermissionDenied { .. })
        ));

        // Level 2: HR finalizes and the ledger commits.
        let approved = fx
            .engine
            .approve(app.id, &hr_caller(), Some("records verified"))
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        let b = fx.balance_of(LeaveKind::MaternityLeave).await;
        assert_eq!(b.taken, 10.0);
        assert_eq!(b.pending_approval, 0.0);
    }

    #[tokio::test]
    async fn missing_required_document_is_rejected() {
        let fx = fixture().await;
        fx.grant(LeaveKind::MaternityLeave, 180.0).await;
        let ml = fx.leave_type(LeaveKind::MaternityLeave).await;
        let err = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(ml.id, d(2025, 3, 10), Some(d(2025, 3, 21))),
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    #[tokio::test]
    async fn update_rechecks_balance_and_commits_the_diff() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), Some(d(2025, 3, 11))),
                today(),
            )
            .await
            .unwrap();
        assert_eq!(app.number_of_days, 2.0);

        // Stretch to the whole week.
        let updated = fx
            .engine
            .update(
                app.id,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), Some(d(2025, 3, 14))),
                today(),
            )
            .await
            .unwrap();
        assert_eq!(updated.number_of_days, 5.0);

        let b = fx.balance_of(LeaveKind::EarnedLeave).await;
        assert_eq!(b.pending_approval, 5.0);
        assert_eq!(b.available, 5.0);
    }

    #[tokio::test]
    async fn update_of_approved_application_is_refused() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;
        let app = fx
            .engine
            .submit(
                EMPLOYEE,
                &employee_caller(),
                request(el.id, d(2025, 3, 10), None),
                today(),
            )
            .await
            .unwrap();
        fx.engine.approve(app.id, &hr_caller(), None).await.unwrap();
        assert!(matches!(
            fx.engine
                .update(
                    app.id,
                    &employee_caller(),
                    request(el.id, d(2025, 3, 11), None),
                    today()
                )
                .await,
            Err(LeaveError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_overlapping_submissions_allow_exactly_one() {
        let fx = fixture().await;
        fx.grant(LeaveKind::EarnedLeave, 10.0).await;
        let el = fx.leave_type(LeaveKind::EarnedLeave).await;

        let engine = Arc::new(fx.engine);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = engine.clone();
            let req = request(el.id, d(2025, 3, 10), Some(d(2025, 3, 12)));
            handles.push(tokio::spawn(async move {
                engine
                    .submit(EMPLOYEE, &employee_caller(), req, today())
                    .await
                    .is_ok()
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let b = fx
            .ledger
            .balance_snapshot(EMPLOYEE, el.id, 2025)
            .await
            .unwrap();
        assert_eq!(b.pending_approval, 3.0);
        assert!(b.invariant_holds());
    }
}
