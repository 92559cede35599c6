//! MySQL backend over sqlx. Schema lives in `schema.sql`.
//!
//! Enum-typed columns are stored as their snake_case strings and parsed
//! back through strum, so a row that predates a code change fails loudly
//! instead of deserializing into the wrong variant.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlPool;
use sqlx::prelude::FromRow;

use crate::error::{LeaveError, LeaveResult};
use crate::model::{
    AccrualMethod, CreditStatus, DurationType, EmployeeProfile, Gender, GenderEligibility,
    HolidayType, LeaveApplication, LeaveBalance, LeaveCreditRequest, LeaveKind, LeaveStatus,
    LeaveType, PublicHoliday,
};
use crate::store::ApplicationFilter;

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(database_url: &str) -> LeaveResult<Self> {
        let pool = MySqlPool::connect(database_url).await?;
        Ok(MySqlStore { pool })
    }

    pub fn with_pool(pool: MySqlPool) -> Self {
        MySqlStore { pool }
    }
}

fn parse_enum<T: FromStr>(value: &str, what: &str) -> LeaveResult<T> {
    value
        .parse()
        .map_err(|_| LeaveError::Storage(format!("unrecognized {what} value: {value}")))
}

// Typed bind values for dynamically assembled WHERE clauses.
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

fn push_binds<'q>(
    mut query: sqlx::query::QueryAs<'q, sqlx::MySql, ApplicationRow, sqlx::mysql::MySqlArguments>,
    args: &'q [FilterValue],
) -> sqlx::query::QueryAs<'q, sqlx::MySql, ApplicationRow, sqlx::mysql::MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(*v),
            FilterValue::Str(s) => query.bind(s.as_str()),
            FilterValue::Date(d) => query.bind(*d),
        };
    }
    query
}

// ---- row types ----

#[derive(FromRow)]
struct LeaveTypeRow {
    id: u64,
    kind: String,
    abbr: String,
    annual_entitlement: f64,
    accrual_method: String,
    carry_forward: bool,
    max_carry_forward: Option<f64>,
    encashment: bool,
    max_encashment_per_year: Option<f64>,
    negative_balance_allowed: bool,
    requires_approval: bool,
    approval_levels: u8,
    min_days_in_advance: Option<u32>,
    max_consecutive_days: Option<f64>,
    gender_eligibility: String,
    requires_document: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveTypeRow> for LeaveType {
    type Error = LeaveError;

    fn try_from(row: LeaveTypeRow) -> LeaveResult<LeaveType> {
        Ok(LeaveType {
            id: row.id,
            kind: parse_enum::<LeaveKind>(&row.kind, "leave kind")?,
            abbr: row.abbr,
            annual_entitlement: row.annual_entitlement,
            accrual_method: parse_enum::<AccrualMethod>(&row.accrual_method, "accrual method")?,
            carry_forward: row.carry_forward,
            max_carry_forward: row.max_carry_forward,
            encashment: row.encashment,
            max_encashment_per_year: row.max_encashment_per_year,
            negative_balance_allowed: row.negative_balance_allowed,
            requires_approval: row.requires_approval,
            approval_levels: row.approval_levels,
            min_days_in_advance: row.min_days_in_advance,
            max_consecutive_days: row.max_consecutive_days,
            gender_eligibility: parse_enum::<GenderEligibility>(
                &row.gender_eligibility,
                "gender eligibility",
            )?,
            requires_document: row.requires_document,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct HolidayRow {
    id: u64,
    name: String,
    holiday_date: NaiveDate,
    holiday_type: String,
    is_restricted: bool,
    recurring: bool,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HolidayRow> for PublicHoliday {
    type Error = LeaveError;

    fn try_from(row: HolidayRow) -> LeaveResult<PublicHoliday> {
        Ok(PublicHoliday {
            id: row.id,
            name: row.name,
            holiday_date: row.holiday_date,
            holiday_type: parse_enum::<HolidayType>(&row.holiday_type, "holiday type")?,
            is_restricted: row.is_restricted,
            recurring: row.recurring,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct BalanceRow {
    employee_id: u64,
    leave_type_id: u64,
    leave_year: i32,
    entitlement: f64,
    accrued: f64,
    carried_forward: f64,
    taken: f64,
    pending_approval: f64,
    encashed: f64,
    available: f64,
}

impl From<BalanceRow> for LeaveBalance {
    fn from(row: BalanceRow) -> LeaveBalance {
        LeaveBalance {
            employee_id: row.employee_id,
            leave_type_id: row.leave_type_id,
            year: row.leave_year,
            entitlement: row.entitlement,
            accrued: row.accrued,
            carried_forward: row.carried_forward,
            taken: row.taken,
            pending_approval: row.pending_approval,
            encashed: row.encashed,
            available: row.available,
        }
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    id: u64,
    employee_id: u64,
    leave_type_id: u64,
    from_date: NaiveDate,
    to_date: NaiveDate,
    duration_type: String,
    number_of_days: f64,
    reason: String,
    contact_phone: Option<String>,
    contact_email: Option<String>,
    attachment: Option<String>,
    status: String,
    current_approval_level: u8,
    approver_note: Option<String>,
    approved_by: Option<u64>,
    approved_at: Option<DateTime<Utc>>,
    recalled_at: Option<DateTime<Utc>>,
    recall_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for LeaveApplication {
    type Error = LeaveError;

    fn try_from(row: ApplicationRow) -> LeaveResult<LeaveApplication> {
        Ok(LeaveApplication {
            id: row.id,
            employee_id: row.employee_id,
            leave_type_id: row.leave_type_id,
            from_date: row.from_date,
            to_date: row.to_date,
            duration_type: parse_enum::<DurationType>(&row.duration_type, "duration type")?,
            number_of_days: row.number_of_days,
            reason: row.reason,
            contact_phone: row.contact_phone,
            contact_email: row.contact_email,
            attachment: row.attachment,
            status: parse_enum::<LeaveStatus>(&row.status, "application status")?,
            current_approval_level: row.current_approval_level,
            approver_note: row.approver_note,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            recalled_at: row.recalled_at,
            recall_reason: row.recall_reason,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CreditRow {
    id: u64,
    employee_id: u64,
    date_worked: NaiveDate,
    reason: String,
    status: String,
    approved_by: Option<u64>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CreditRow> for LeaveCreditRequest {
    type Error = LeaveError;

    fn try_from(row: CreditRow) -> LeaveResult<LeaveCreditRequest> {
        Ok(LeaveCreditRequest {
            id: row.id,
            employee_id: row.employee_id,
            date_worked: row.date_worked,
            reason: row.reason,
            status: parse_enum::<CreditStatus>(&row.status, "credit status")?,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    employee_id: u64,
    full_name: String,
    gender: String,
    department: String,
    manager_id: Option<u64>,
    date_of_joining: NaiveDate,
    active: bool,
}

impl TryFrom<EmployeeRow> for EmployeeProfile {
    type Error = LeaveError;

    fn try_from(row: EmployeeRow) -> LeaveResult<EmployeeProfile> {
        Ok(EmployeeProfile {
            employee_id: row.employee_id,
            full_name: row.full_name,
            gender: parse_enum::<Gender>(&row.gender, "gender")?,
            department: row.department,
            manager_id: row.manager_id,
            date_of_joining: row.date_of_joining,
            active: row.active,
        })
    }
}

const APPLICATION_COLUMNS: &str = "id, employee_id, leave_type_id, from_date, to_date, \
     duration_type, number_of_days, reason, contact_phone, contact_email, attachment, status, \
     current_approval_level, approver_note, approved_by, approved_at, recalled_at, recall_reason, \
     created_at";

impl MySqlStore {
    // ---- leave types ----

    pub async fn insert_leave_type(&self, lt: &LeaveType) -> LeaveResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_types
                (kind, abbr, annual_entitlement, accrual_method, carry_forward,
                 max_carry_forward, encashment, max_encashment_per_year,
                 negative_balance_allowed, requires_approval, approval_levels,
                 min_days_in_advance, max_consecutive_days, gender_eligibility,
                 requires_document, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(lt.kind.to_string())
        .bind(&lt.abbr)
        .bind(lt.annual_entitlement)
        .bind(lt.accrual_method.to_string())
        .bind(lt.carry_forward)
        .bind(lt.max_carry_forward)
        .bind(lt.encashment)
        .bind(lt.max_encashment_per_year)
        .bind(lt.negative_balance_allowed)
        .bind(lt.requires_approval)
        .bind(lt.approval_levels)
        .bind(lt.min_days_in_advance)
        .bind(lt.max_consecutive_days)
        .bind(lt.gender_eligibility.to_string())
        .bind(lt.requires_document)
        .bind(lt.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    pub async fn update_leave_type(&self, lt: &LeaveType) -> LeaveResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_types SET
                kind = ?, abbr = ?, annual_entitlement = ?, accrual_method = ?,
                carry_forward = ?, max_carry_forward = ?, encashment = ?,
                max_encashment_per_year = ?, negative_balance_allowed = ?,
                requires_approval = ?, approval_levels = ?, min_days_in_advance = ?,
                max_consecutive_days = ?, gender_eligibility = ?, requires_document = ?
            WHERE id = ?
            "#,
        )
        .bind(lt.kind.to_string())
        .bind(&lt.abbr)
        .bind(lt.annual_entitlement)
        .bind(lt.accrual_method.to_string())
        .bind(lt.carry_forward)
        .bind(lt.max_carry_forward)
        .bind(lt.encashment)
        .bind(lt.max_encashment_per_year)
        .bind(lt.negative_balance_allowed)
        .bind(lt.requires_approval)
        .bind(lt.approval_levels)
        .bind(lt.min_days_in_advance)
        .bind(lt.max_consecutive_days)
        .bind(lt.gender_eligibility.to_string())
        .bind(lt.requires_document)
        .bind(lt.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_leave_type(&self, id: u64) -> LeaveResult<bool> {
        let result = sqlx::query("DELETE FROM leave_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_leave_type(&self, id: u64) -> LeaveResult<Option<LeaveType>> {
        let row = sqlx::query_as::<_, LeaveTypeRow>("SELECT * FROM leave_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LeaveType::try_from).transpose()
    }

    pub async fn list_leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        let rows = sqlx::query_as::<_, LeaveTypeRow>("SELECT * FROM leave_types ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(LeaveType::try_from).collect()
    }

    pub async fn count_type_references(&self, id: u64) -> LeaveResult<u64> {
        let balances: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leave_balances WHERE leave_type_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        let apps: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leave_applications WHERE leave_type_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok((balances + apps) as u64)
    }

    // ---- holidays ----

    pub async fn insert_holiday(&self, h: &PublicHoliday) -> LeaveResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO public_holidays
                (name, holiday_date, holiday_type, is_restricted, recurring, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&h.name)
        .bind(h.holiday_date)
        .bind(h.holiday_type.to_string())
        .bind(h.is_restricted)
        .bind(h.recurring)
        .bind(&h.description)
        .bind(h.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    pub async fn update_holiday(&self, h: &PublicHoliday) -> LeaveResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE public_holidays SET
                name = ?, holiday_date = ?, holiday_type = ?, is_restricted = ?,
                recurring = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&h.name)
        .bind(h.holiday_date)
        .bind(h.holiday_type.to_string())
        .bind(h.is_restricted)
        .bind(h.recurring)
        .bind(&h.description)
        .bind(h.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_holiday(&self, id: u64) -> LeaveResult<bool> {
        let result = sqlx::query("DELETE FROM public_holidays WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_holiday(&self, id: u64) -> LeaveResult<Option<PublicHoliday>> {
        let row = sqlx::query_as::<_, HolidayRow>("SELECT * FROM public_holidays WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PublicHoliday::try_from).transpose()
    }

    pub async fn list_holidays(&self, year: i32) -> LeaveResult<Vec<PublicHoliday>> {
        let rows = sqlx::query_as::<_, HolidayRow>(
            r#"
            SELECT * FROM public_holidays
            WHERE holiday_date >= ? AND holiday_date <= ?
            ORDER BY holiday_date
            "#,
        )
        .bind(year_start(year)?)
        .bind(year_end(year)?)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PublicHoliday::try_from).collect()
    }

    // ---- balances ----

    pub async fn get_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<Option<LeaveBalance>> {
        let row = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT employee_id, leave_type_id, leave_year, entitlement, accrued,
                   carried_forward, taken, pending_approval, encashed, available
            FROM leave_balances
            WHERE employee_id = ? AND leave_type_id = ? AND leave_year = ?
            "#,
        )
        .bind(employee_id)
        .bind(leave_type_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LeaveBalance::from))
    }

    pub async fn upsert_balance(&self, balance: &LeaveBalance) -> LeaveResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO leave_balances
                (employee_id, leave_type_id, leave_year, entitlement, accrued,
                 carried_forward, taken, pending_approval, encashed, available)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                entitlement = VALUES(entitlement),
                accrued = VALUES(accrued),
                carried_forward = VALUES(carried_forward),
                taken = VALUES(taken),
                pending_approval = VALUES(pending_approval),
                encashed = VALUES(encashed),
                available = VALUES(available)
            "#,
        )
        .bind(balance.employee_id)
        .bind(balance.leave_type_id)
        .bind(balance.year)
        .bind(balance.entitlement)
        .bind(balance.accrued)
        .bind(balance.carried_forward)
        .bind(balance.taken)
        .bind(balance.pending_approval)
        .bind(balance.encashed)
        .bind(balance.available)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn balances_for_employee(
        &self,
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<Vec<LeaveBalance>> {
        let rows = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT employee_id, leave_type_id, leave_year, entitlement, accrued,
                   carried_forward, taken, pending_approval, encashed, available
            FROM leave_balances
            WHERE employee_id = ? AND leave_year = ?
            ORDER BY leave_type_id
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LeaveBalance::from).collect())
    }

    pub async fn balances_for_year(&self, year: i32) -> LeaveResult<Vec<LeaveBalance>> {
        let rows = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT employee_id, leave_type_id, leave_year, entitlement, accrued,
                   carried_forward, taken, pending_approval, encashed, available
            FROM leave_balances
            WHERE leave_year = ?
            ORDER BY employee_id, leave_type_id
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LeaveBalance::from).collect())
    }

    // ---- applications ----

    pub async fn insert_application(&self, app: &LeaveApplication) -> LeaveResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_applications
                (employee_id, leave_type_id, from_date, to_date, duration_type,
                 number_of_days, reason, contact_phone, contact_email, attachment,
                 status, current_approval_level, approver_note, approved_by,
                 approved_at, recalled_at, recall_reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(app.employee_id)
        .bind(app.leave_type_id)
        .bind(app.from_date)
        .bind(app.to_date)
        .bind(app.duration_type.to_string())
        .bind(app.number_of_days)
        .bind(&app.reason)
        .bind(&app.contact_phone)
        .bind(&app.contact_email)
        .bind(&app.attachment)
        .bind(app.status.to_string())
        .bind(app.current_approval_level)
        .bind(&app.approver_note)
        .bind(app.approved_by)
        .bind(app.approved_at)
        .bind(app.recalled_at)
        .bind(&app.recall_reason)
        .bind(app.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    pub async fn update_application(&self, app: &LeaveApplication) -> LeaveResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE leave_applications SET
                leave_type_id = ?, from_date = ?, to_date = ?, duration_type = ?,
                number_of_days = ?, reason = ?, contact_phone = ?, contact_email = ?,
                attachment = ?, status = ?, current_approval_level = ?, approver_note = ?,
                approved_by = ?, approved_at = ?, recalled_at = ?, recall_reason = ?
            WHERE id = ?
            "#,
        )
        .bind(app.leave_type_id)
        .bind(app.from_date)
        .bind(app.to_date)
        .bind(app.duration_type.to_string())
        .bind(app.number_of_days)
        .bind(&app.reason)
        .bind(&app.contact_phone)
        .bind(&app.contact_email)
        .bind(&app.attachment)
        .bind(app.status.to_string())
        .bind(app.current_approval_level)
        .bind(&app.approver_note)
        .bind(app.approved_by)
        .bind(app.approved_at)
        .bind(app.recalled_at)
        .bind(&app.recall_reason)
        .bind(app.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_application(&self, id: u64) -> LeaveResult<Option<LeaveApplication>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM leave_applications WHERE id = ?");
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LeaveApplication::try_from).transpose()
    }

    pub async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> LeaveResult<(Vec<LeaveApplication>, i64)> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(ids) = &filter.employee_ids {
            if ids.is_empty() {
                return Ok((Vec::new(), 0));
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            where_sql.push_str(&format!(" AND employee_id IN ({placeholders})"));
            args.extend(ids.iter().map(|id| FilterValue::U64(*id)));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.to_string()));
        }
        if let Some(year) = filter.year {
            where_sql.push_str(" AND from_date >= ? AND from_date <= ?");
            args.push(FilterValue::Date(year_start(year)?));
            args.push(FilterValue::Date(year_end(year)?));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_applications{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
                FilterValue::Date(d) => count_q.bind(*d),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications{where_sql} \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let offset = filter.page.saturating_sub(1).saturating_mul(filter.per_page);
        let rows = push_binds(sqlx::query_as::<_, ApplicationRow>(&data_sql), &args)
            .bind(filter.per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let apps = rows
            .into_iter()
            .map(LeaveApplication::try_from)
            .collect::<LeaveResult<Vec<_>>>()?;
        Ok((apps, total))
    }

    pub async fn live_applications_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LeaveResult<Vec<LeaveApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications \
             WHERE employee_id = ? AND status IN ('pending', 'approved') \
             AND from_date <= ? AND to_date >= ? \
             ORDER BY from_date"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(employee_id)
            .bind(to)
            .bind(from)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(LeaveApplication::try_from).collect()
    }

    pub async fn applications_for_year(&self, year: i32) -> LeaveResult<Vec<LeaveApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications \
             WHERE from_date >= ? AND from_date <= ?"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(year_start(year)?)
            .bind(year_end(year)?)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(LeaveApplication::try_from).collect()
    }

    pub async fn count_pending_applications(&self) -> LeaveResult<i64> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM leave_applications WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ---- credit requests ----

    pub async fn insert_credit_request(&self, req: &LeaveCreditRequest) -> LeaveResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_credit_requests
                (employee_id, date_worked, reason, status, approved_by, approved_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(req.employee_id)
        .bind(req.date_worked)
        .bind(&req.reason)
        .bind(req.status.to_string())
        .bind(req.approved_by)
        .bind(req.approved_at)
        .bind(req.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    pub async fn update_credit_request(&self, req: &LeaveCreditRequest) -> LeaveResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE leave_credit_requests SET
                date_worked = ?, reason = ?, status = ?, approved_by = ?, approved_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.date_worked)
        .bind(&req.reason)
        .bind(req.status.to_string())
        .bind(req.approved_by)
        .bind(req.approved_at)
        .bind(req.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_credit_request(&self, id: u64) -> LeaveResult<Option<LeaveCreditRequest>> {
        let row = sqlx::query_as::<_, CreditRow>("SELECT * FROM leave_credit_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LeaveCreditRequest::try_from).transpose()
    }

    pub async fn list_credit_requests(
        &self,
        employee_id: Option<u64>,
        status: Option<CreditStatus>,
    ) -> LeaveResult<Vec<LeaveCreditRequest>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();
        if let Some(id) = employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(status) = status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.to_string()));
        }

        let sql =
            format!("SELECT * FROM leave_credit_requests{where_sql} ORDER BY created_at DESC");
        let mut query = sqlx::query_as::<_, CreditRow>(&sql);
        for arg in &args {
            query = match arg {
                FilterValue::U64(v) => query.bind(*v),
                FilterValue::Str(s) => query.bind(s.as_str()),
                FilterValue::Date(d) => query.bind(*d),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(LeaveCreditRequest::try_from).collect()
    }

    // ---- employee mirror ----

    pub async fn upsert_employee(&self, profile: &EmployeeProfile) -> LeaveResult<()> {
        sqlx::query(
            r#"
            INSERT INTO employee_profiles
                (employee_id, full_name, gender, department, manager_id, date_of_joining, active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                full_name = VALUES(full_name),
                gender = VALUES(gender),
                department = VALUES(department),
                manager_id = VALUES(manager_id),
                date_of_joining = VALUES(date_of_joining),
                active = VALUES(active)
            "#,
        )
        .bind(profile.employee_id)
        .bind(&profile.full_name)
        .bind(profile.gender.to_string())
        .bind(&profile.department)
        .bind(profile.manager_id)
        .bind(profile.date_of_joining)
        .bind(profile.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_employee(&self, employee_id: u64) -> LeaveResult<Option<EmployeeProfile>> {
        let row =
            sqlx::query_as::<_, EmployeeRow>("SELECT * FROM employee_profiles WHERE employee_id = ?")
                .bind(employee_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(EmployeeProfile::try_from).transpose()
    }

    pub async fn list_employees(&self) -> LeaveResult<Vec<EmployeeProfile>> {
        let rows =
            sqlx::query_as::<_, EmployeeRow>("SELECT * FROM employee_profiles ORDER BY employee_id")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(EmployeeProfile::try_from).collect()
    }
}

fn year_start(year: i32) -> LeaveResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| LeaveError::validation(format!("invalid year {year}")))
}

fn year_end(year: i32) -> LeaveResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| LeaveError::validation(format!("invalid year {year}")))
}
