//! In-process backend. Used by the test suite and by dev runs without a
//! configured `DATABASE_URL`. Critical sections never span an await, so
//! plain `RwLock`s are enough.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, NaiveDate};

use crate::error::{LeaveError, LeaveResult};
use crate::model::{
    CreditStatus, EmployeeProfile, LeaveApplication, LeaveBalance, LeaveCreditRequest, LeaveStatus,
    LeaveType, PublicHoliday,
};
use crate::store::ApplicationFilter;

#[derive(Default)]
pub struct MemStore {
    next_id: AtomicU64,
    leave_types: RwLock<HashMap<u64, LeaveType>>,
    holidays: RwLock<HashMap<u64, PublicHoliday>>,
    balances: RwLock<HashMap<(u64, u64, i32), LeaveBalance>>,
    applications: RwLock<HashMap<u64, LeaveApplication>>,
    credits: RwLock<HashMap<u64, LeaveCreditRequest>>,
    employees: RwLock<HashMap<u64, EmployeeProfile>>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn poisoned() -> LeaveError {
        LeaveError::Storage("memory store lock poisoned".into())
    }

    // ---- leave types ----

    pub async fn insert_leave_type(&self, lt: &LeaveType) -> LeaveResult<u64> {
        let id = self.next_id();
        let mut row = lt.clone();
        row.id = id;
        self.leave_types
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(id, row);
        Ok(id)
    }

    pub async fn update_leave_type(&self, lt: &LeaveType) -> LeaveResult<bool> {
        let mut table = self.leave_types.write().map_err(|_| Self::poisoned())?;
        match table.get_mut(&lt.id) {
            Some(row) => {
                *row = lt.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn delete_leave_type(&self, id: u64) -> LeaveResult<bool> {
        Ok(self
            .leave_types
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(&id)
            .is_some())
    }

    pub async fn get_leave_type(&self, id: u64) -> LeaveResult<Option<LeaveType>> {
        Ok(self
            .leave_types
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&id)
            .cloned())
    }

    pub async fn list_leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        let mut types: Vec<_> = self
            .leave_types
            .read()
            .map_err(|_| Self::poisoned())?
            .values()
            .cloned()
            .collect();
        types.sort_by_key(|t| t.id);
        Ok(types)
    }

    pub async fn count_type_references(&self, id: u64) -> LeaveResult<u64> {
        let balances = self.balances.read().map_err(|_| Self::poisoned())?;
        let apps = self.applications.read().map_err(|_| Self::poisoned())?;
        let count = balances.values().filter(|b| b.leave_type_id == id).count()
            + apps.values().filter(|a| a.leave_type_id == id).count();
        Ok(count as u64)
    }

    // ---- holidays ----

    pub async fn insert_holiday(&self, h: &PublicHoliday) -> LeaveResult<u64> {
        let id = self.next_id();
        let mut row = h.clone();
        row.id = id;
        self.holidays
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(id, row);
        Ok(id)
    }

    pub async fn update_holiday(&self, h: &PublicHoliday) -> LeaveResult<bool> {
        let mut table = self.holidays.write().map_err(|_| Self::poisoned())?;
        match table.get_mut(&h.id) {
            Some(row) => {
                *row = h.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn delete_holiday(&self, id: u64) -> LeaveResult<bool> {
        Ok(self
            .holidays
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(&id)
            .is_some())
    }

    pub async fn get_holiday(&self, id: u64) -> LeaveResult<Option<PublicHoliday>> {
        Ok(self
            .holidays
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&id)
            .cloned())
    }

    pub async fn list_holidays(&self, year: i32) -> LeaveResult<Vec<PublicHoliday>> {
        let mut rows: Vec<_> = self
            .holidays
            .read()
            .map_err(|_| Self::poisoned())?
            .values()
            .filter(|h| h.holiday_date.year() == year)
            .cloned()
            .collect();
        rows.sort_by_key(|h| h.holiday_date);
        Ok(rows)
    }

    // ---- balances ----

    pub async fn get_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<Option<LeaveBalance>> {
        Ok(self
            .balances
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&(employee_id, leave_type_id, year))
            .cloned())
    }

    pub async fn upsert_balance(&self, balance: &LeaveBalance) -> LeaveResult<()> {
        self.balances.write().map_err(|_| Self::poisoned())?.insert(
            (balance.employee_id, balance.leave_type_id, balance.year),
            balance.clone(),
        );
        Ok(())
    }

    pub async fn balances_for_employee(
        &self,
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<Vec<LeaveBalance>> {
        let mut rows: Vec<_> = self
            .balances
            .read()
            .map_err(|_| Self::poisoned())?
            .values()
            .filter(|b| b.employee_id == employee_id && b.year == year)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.leave_type_id);
        Ok(rows)
    }

    pub async fn balances_for_year(&self, year: i32) -> LeaveResult<Vec<LeaveBalance>> {
        let mut rows: Vec<_> = self
            .balances
            .read()
            .map_err(|_| Self::poisoned())?
            .values()
            .filter(|b| b.year == year)
            .cloned()
            .collect();
        rows.sort_by_key(|b| (b.employee_id, b.leave_type_id));
        Ok(rows)
    }

    // ---- applications ----

    pub async fn insert_application(&self, app: &LeaveApplication) -> LeaveResult<u64> {
        let id = self.next_id();
        let mut row = app.clone();
        row.id = id;
        self.applications
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(id, row);
        Ok(id)
    }

    pub async fn update_application(&self, app: &LeaveApplication) -> LeaveResult<bool> {
        let mut table = self.applications.write().map_err(|_| Self::poisoned())?;
        match table.get_mut(&app.id) {
            Some(row) => {
                *row = app.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn get_application(&self, id: u64) -> LeaveResult<Option<LeaveApplication>> {
        Ok(self
            .applications
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&id)
            .cloned())
    }

    pub async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> LeaveResult<(Vec<LeaveApplication>, i64)> {
        let table = self.applications.read().map_err(|_| Self::poisoned())?;
        let mut rows: Vec<_> = table
            .values()
            .filter(|a| filter.employee_id.is_none_or(|id| a.employee_id == id))
            .filter(|a| {
                filter
                    .employee_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&a.employee_id))
            })
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.year.is_none_or(|y| a.from_date.year() == y))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = rows.len() as i64;
        let offset = filter.page.saturating_sub(1).saturating_mul(filter.per_page) as usize;
        let page: Vec<_> = rows
            .into_iter()
            .skip(offset)
            .take(filter.per_page as usize)
            .collect();
        Ok((page, total))
    }

    pub async fn live_applications_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LeaveResult<Vec<LeaveApplication>> {
        let table = self.applications.read().map_err(|_| Self::poisoned())?;
        let mut rows: Vec<_> = table
            .values()
            .filter(|a| a.employee_id == employee_id && a.blocks_overlap() && a.overlaps(from, to))
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.from_date);
        Ok(rows)
    }

    pub async fn applications_for_year(&self, year: i32) -> LeaveResult<Vec<LeaveApplication>> {
        let table = self.applications.read().map_err(|_| Self::poisoned())?;
        Ok(table
            .values()
            .filter(|a| a.from_date.year() == year)
            .cloned()
            .collect())
    }

    pub async fn count_pending_applications(&self) -> LeaveResult<i64> {
        let table = self.applications.read().map_err(|_| Self::poisoned())?;
        Ok(table
            .values()
            .filter(|a| a.status == LeaveStatus::Pending)
            .count() as i64)
    }

    // ---- credit requests ----

    pub async fn insert_credit_request(&self, req: &LeaveCreditRequest) -> LeaveResult<u64> {
        let id = self.next_id();
        let mut row = req.clone();
        row.id = id;
        self.credits
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(id, row);
        Ok(id)
    }

    pub async fn update_credit_request(&self, req: &LeaveCreditRequest) -> LeaveResult<bool> {
        let mut table = self.credits.write().map_err(|_| Self::poisoned())?;
        match table.get_mut(&req.id) {
            Some(row) => {
                *row = req.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn get_credit_request(&self, id: u64) -> LeaveResult<Option<LeaveCreditRequest>> {
        Ok(self
            .credits
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&id)
            .cloned())
    }

    pub async fn list_credit_requests(
        &self,
        employee_id: Option<u64>,
        status: Option<CreditStatus>,
    ) -> LeaveResult<Vec<LeaveCreditRequest>> {
        let table = self.credits.read().map_err(|_| Self::poisoned())?;
        let mut rows: Vec<_> = table
            .values()
            .filter(|r| employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    // ---- employee mirror ----

    pub async fn upsert_employee(&self, profile: &EmployeeProfile) -> LeaveResult<()> {
        self.employees
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(profile.employee_id, profile.clone());
        Ok(())
    }

    pub async fn get_employee(&self, employee_id: u64) -> LeaveResult<Option<EmployeeProfile>> {
        Ok(self
            .employees
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&employee_id)
            .cloned())
    }

    pub async fn list_employees(&self) -> LeaveResult<Vec<EmployeeProfile>> {
        let mut rows: Vec<_> = self
            .employees
            .read()
            .map_err(|_| Self::poisoned())?
            .values()
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.employee_id);
        Ok(rows)
    }
}
