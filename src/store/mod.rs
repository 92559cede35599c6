//! Storage backends.
//!
//! The core services speak to a [`Store`] facade with two backends: the
//! in-process [`MemStore`] (tests, and runs without a configured database)
//! and the sqlx-backed [`MySqlStore`]. The facade is deliberately plain
//! CRUD; atomicity lives in the ledger's per-employee serialization
//! discipline, and the MySQL backend additionally wraps every mutation in
//! its own transaction.

pub mod memory;
pub mod mysql;

use chrono::NaiveDate;

pub use memory::MemStore;
pub use mysql::MySqlStore;

use crate::error::LeaveResult;
use crate::model::{
    CreditStatus, EmployeeProfile, LeaveApplication, LeaveBalance, LeaveCreditRequest, LeaveStatus,
    LeaveType, PublicHoliday,
};

/// Listing filter for applications, mirrored by the HTTP query surface.
#[derive(Debug, Clone)]
pub struct ApplicationFilter {
    pub employee_id: Option<u64>,
    pub employee_ids: Option<Vec<u64>>,
    pub status: Option<LeaveStatus>,
    pub year: Option<i32>,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
}

impl Default for ApplicationFilter {
    fn default() -> Self {
        ApplicationFilter {
            employee_id: None,
            employee_ids: None,
            status: None,
            year: None,
            page: 1,
            per_page: 20,
        }
    }
}

pub enum Store {
    Mem(MemStore),
    MySql(MySqlStore),
}

macro_rules! dispatch {
    ($self:ident . $method:ident ( $($arg:expr),* )) => {
        match $self {
            Store::Mem(s) => s.$method($($arg),*).await,
            Store::MySql(s) => s.$method($($arg),*).await,
        }
    };
}

impl Store {
    pub fn mem() -> Self {
        Store::Mem(MemStore::new())
    }

    // ---- leave types ----

    pub async fn insert_leave_type(&self, lt: &LeaveType) -> LeaveResult<u64> {
        dispatch!(self.insert_leave_type(lt))
    }

    pub async fn update_leave_type(&self, lt: &LeaveType) -> LeaveResult<bool> {
        dispatch!(self.update_leave_type(lt))
    }

    pub async fn delete_leave_type(&self, id: u64) -> LeaveResult<bool> {
        dispatch!(self.delete_leave_type(id))
    }

    pub async fn get_leave_type(&self, id: u64) -> LeaveResult<Option<LeaveType>> {
        dispatch!(self.get_leave_type(id))
    }

    pub async fn list_leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        dispatch!(self.list_leave_types())
    }

    /// Balances plus applications still pointing at the type.
    pub async fn count_type_references(&self, id: u64) -> LeaveResult<u64> {
        dispatch!(self.count_type_references(id))
    }

    // ---- holidays ----

    pub async fn insert_holiday(&self, h: &PublicHoliday) -> LeaveResult<u64> {
        dispatch!(self.insert_holiday(h))
    }

    pub async fn update_holiday(&self, h: &PublicHoliday) -> LeaveResult<bool> {
        dispatch!(self.update_holiday(h))
    }

    pub async fn delete_holiday(&self, id: u64) -> LeaveResult<bool> {
        dispatch!(self.delete_holiday(id))
    }

    pub async fn get_holiday(&self, id: u64) -> LeaveResult<Option<PublicHoliday>> {
        dispatch!(self.get_holiday(id))
    }

    pub async fn list_holidays(&self, year: i32) -> LeaveResult<Vec<PublicHoliday>> {
        dispatch!(self.list_holidays(year))
    }

    // ---- balances ----

    pub async fn get_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<Option<LeaveBalance>> {
        dispatch!(self.get_balance(employee_id, leave_type_id, year))
    }

    pub async fn upsert_balance(&self, balance: &LeaveBalance) -> LeaveResult<()> {
        dispatch!(self.upsert_balance(balance))
    }

    pub async fn balances_for_employee(
        &self,
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<Vec<LeaveBalance>> {
        dispatch!(self.balances_for_employee(employee_id, year))
    }

    pub async fn balances_for_year(&self, year: i32) -> LeaveResult<Vec<LeaveBalance>> {
        dispatch!(self.balances_for_year(year))
    }

    // ---- applications ----

    pub async fn insert_application(&self, app: &LeaveApplication) -> LeaveResult<u64> {
        dispatch!(self.insert_application(app))
    }

    pub async fn update_application(&self, app: &LeaveApplication) -> LeaveResult<bool> {
        dispatch!(self.update_application(app))
    }

    pub async fn get_application(&self, id: u64) -> LeaveResult<Option<LeaveApplication>> {
        dispatch!(self.get_application(id))
    }

    pub async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> LeaveResult<(Vec<LeaveApplication>, i64)> {
        dispatch!(self.list_applications(filter))
    }

    /// Pending/approved applications of one employee intersecting a range.
    pub async fn live_applications_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LeaveResult<Vec<LeaveApplication>> {
        dispatch!(self.live_applications_in_range(employee_id, from, to))
    }

    pub async fn applications_for_year(&self, year: i32) -> LeaveResult<Vec<LeaveApplication>> {
        dispatch!(self.applications_for_year(year))
    }

    pub async fn count_pending_applications(&self) -> LeaveResult<i64> {
        dispatch!(self.count_pending_applications())
    }

    // ---- credit requests ----

    pub async fn insert_credit_request(&self, req: &LeaveCreditRequest) -> LeaveResult<u64> {
        dispatch!(self.insert_credit_request(req))
    }

    pub async fn update_credit_request(&self, req: &LeaveCreditRequest) -> LeaveResult<bool> {
        dispatch!(self.update_credit_request(req))
    }

    pub async fn get_credit_request(&self, id: u64) -> LeaveResult<Option<LeaveCreditRequest>> {
        dispatch!(self.get_credit_request(id))
    }

    pub async fn list_credit_requests(
        &self,
        employee_id: Option<u64>,
        status: Option<CreditStatus>,
    ) -> LeaveResult<Vec<LeaveCreditRequest>> {
        dispatch!(self.list_credit_requests(employee_id, status))
    }

    // ---- employee mirror ----

    pub async fn upsert_employee(&self, profile: &EmployeeProfile) -> LeaveResult<()> {
        dispatch!(self.upsert_employee(profile))
    }

    pub async fn get_employee(&self, employee_id: u64) -> LeaveResult<Option<EmployeeProfile>> {
        dispatch!(self.get_employee(employee_id))
    }

    pub async fn list_employees(&self) -> LeaveResult<Vec<EmployeeProfile>> {
        dispatch!(self.list_employees())
    }
}
