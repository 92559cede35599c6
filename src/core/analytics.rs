//! Read-only rollups for the reporting dashboard.
//!
//! Derived views over ledger and application data. No state of its own;
//! reads are unsynchronized and may lag in-flight transactions, which the
//! dashboard tolerates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Datelike;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LeaveResult;
use crate::model::{LeaveKind, LeaveStatus};
use crate::store::Store;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthTrend {
    #[schema(example = 3)]
    pub month: u32,
    #[schema(example = 14.5)]
    pub days: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentUtilization {
    #[schema(example = "Engineering")]
    pub department: String,
    pub days: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TypeUtilization {
    #[schema(example = "earned_leave")]
    pub r#type: String,
    pub days: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Absentee {
    #[schema(example = "John Doe")]
    pub name: String,
    pub days: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Liability {
    /// Outstanding earned-leave days across the organization.
    pub total_el_days: f64,
    /// Loss-of-pay days taken year to date.
    pub total_lop_days: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveAnalytics {
    pub trends: Vec<MonthTrend>,
    pub department_utilization: Vec<DepartmentUtilization>,
    pub type_utilization: Vec<TypeUtilization>,
    pub top_absentees: Vec<Absentee>,
    pub liability: Liability,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveStats {
    pub total_employees: i64,
    pub pending_applications: i64,
    pub taken_by_type: HashMap<String, f64>,
}

const TOP_ABSENTEES: usize = 5;

pub struct Analytics {
    store: Arc<Store>,
}

impl Analytics {
    pub fn new(store: Arc<Store>) -> Self {
        Analytics { store }
    }

    pub async fn year_report(&self, year: i32) -> LeaveResult<LeaveAnalytics> {
        let applications = self.store.applications_for_year(year).await?;
        let types = self.store.list_leave_types().await?;
        let employees = self.store.list_employees().await?;
        let balances = self.store.balances_for_year(year).await?;

        let kind_of: HashMap<u64, LeaveKind> = types.iter().map(|t| (t.id, t.kind)).collect();
        let approved: Vec<_> = applications
            .iter()
            .filter(|a| a.status == LeaveStatus::Approved)
            .collect();

        let mut trends: Vec<MonthTrend> = (1..=12)
            .map(|month| MonthTrend { month, days: 0.0 })
            .collect();
        for app in &approved {
            trends[app.from_date.month0() as usize].days += app.number_of_days;
        }

        let mut by_department: HashMap<&str, f64> = HashMap::new();
        let mut by_employee: HashMap<u64, f64> = HashMap::new();
        let mut by_kind: HashMap<LeaveKind, f64> = HashMap::new();
        for app in &approved {
            let kind = kind_of.get(&app.leave_type_id).copied();
            if let Some(kind) = kind {
                *by_kind.entry(kind).or_default() += app.number_of_days;
                if matches!(kind, LeaveKind::SickLeave | LeaveKind::LossOfPay) {
                    *by_employee.entry(app.employee_id).or_default() += app.number_of_days;
                }
            }
            if let Some(profile) = employees
                .iter()
                .find(|e| e.employee_id == app.employee_id)
            {
                *by_department.entry(profile.department.as_str()).or_default() +=
                    app.number_of_days;
            }
        }

        let mut department_utilization: Vec<DepartmentUtilization> = by_department
            .into_iter()
            .map(|(department, days)| DepartmentUtilization {
                department: department.to_string(),
                days,
            })
            .collect();
        department_utilization.sort_by(|a, b| b.days.total_cmp(&a.days));

        let mut type_utilization: Vec<TypeUtilization> = by_kind
            .into_iter()
            .map(|(kind, days)| TypeUtilization {
                r#type: kind.to_string(),
                days,
            })
            .collect();
        type_utilization.sort_by(|a, b| b.days.total_cmp(&a.days));

        let mut top_absentees: Vec<Absentee> = by_employee
            .into_iter()
            .filter(|(_, days)| *days > 0.0)
            .map(|(employee_id, days)| Absentee {
                name: employees
                    .iter()
                    .find(|e| e.employee_id == employee_id)
                    .map(|e| e.full_name.clone())
                    .unwrap_or_else(|| format!("Employee #{employee_id}")),
                days,
            })
            .collect();
        top_absentees.sort_by(|a, b| b.days.total_cmp(&a.days));
        top_absentees.truncate(TOP_ABSENTEES);

        let mut total_el_days = 0.0;
        let mut total_lop_days = 0.0;
        for balance in &balances {
            match kind_of.get(&balance.leave_type_id) {
                Some(LeaveKind::EarnedLeave) => total_el_days += balance.available,
                Some(LeaveKind::LossOfPay) => total_lop_days += balance.taken,
                _ => {}
            }
        }

        Ok(LeaveAnalytics {
            trends,
            department_utilization,
            type_utilization,
            top_absentees,
            liability: Liability {
                total_el_days,
                total_lop_days,
            },
        })
    }

    pub async fn stats(&self, year: i32) -> LeaveResult<LeaveStats> {
        let applications = self.store.applications_for_year(year).await?;
        let types = self.store.list_leave_types().await?;
        let kind_of: HashMap<u64, LeaveKind> = types.iter().map(|t| (t.id, t.kind)).collect();

        let mut taken_by_type: HashMap<String, f64> = HashMap::new();
        for app in applications
            .iter()
            .filter(|a| a.status == LeaveStatus::Approved)
        {
            if let Some(kind) = kind_of.get(&app.leave_type_id) {
                *taken_by_type.entry(kind.to_string()).or_default() += app.number_of_days;
            }
        }

        Ok(LeaveStats {
            total_employees: self.store.list_employees().await?.len() as i64,
            pending_applications: self.store.count_pending_applications().await?,
            taken_by_type,
        })
    }
}
