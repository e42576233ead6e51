//! sqlx MySQL adapter of [`LeaveStore`].
//!
//! Writes that carry an [`EntitlementVersion`] bump the entitlement row in
//! the same transaction as the request write; a version that moved on
//! rolls the whole transaction back with [`LeaveError::Conflict`].

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, error};

use crate::leave::error::{LeaveError, LeaveResult};
use crate::leave::store::LeaveStore;
use crate::model::{
    balance::{BalanceRow, UsedDays},
    leave_entitlement::{EntitlementVersion, LeaveEntitlement},
    leave_request::{
        LeaveRequest, LeaveRequestItem, LeaveRequestRow, NewLeaveRequest, RequestChange, RequestFilter,
        RequestList, StatusChange, StatusKind,
    },
    leave_type::{LeaveType, LeaveTypeInput},
    locked_date::LockedDate,
};

const LEAVE_TYPE_COLUMNS: &str = r#"
    id, name, annual_entitlement_days, is_paid, requires_attachment, requires_approval,
    counts_toward_entitlement, is_active, created_at, updated_at
"#;

const REQUEST_COLUMNS: &str = r#"
    lr.id, lr.employee_id, lr.leave_type_id, lr.start_date, lr.end_date, lr.working_days,
    lr.status, lr.requested_by, lr.approved_by, lr.approved_at, lr.rejected_by, lr.rejected_at,
    lr.cancelled_by, lr.cancelled_at, COALESCE(lr.comment, '') AS comment, lr.created_at, lr.updated_at
"#;

const REQUEST_JOINS: &str = r#"
    FROM leave_requests lr
    JOIN employees e ON e.id = lr.employee_id
    LEFT JOIN departments d ON d.id = e.department_id
    JOIN leave_types lt ON lt.id = lr.leave_type_id
"#;

/// Existing rows are left alone; a missing employee still fails the
/// foreign key instead of being swallowed as a warning.
const CREATE_ENTITLEMENT_SQL: &str = r#"
    INSERT INTO leave_entitlements
        (employee_id, leave_type_id, year, total_days, reserved_days, version)
    SELECT ?, lt.id, ?, lt.annual_entitlement_days, 0, 0
    FROM leave_types lt
    WHERE lt.id = ?
    ON DUPLICATE KEY UPDATE id = id
"#;

/// Dates bound per locked date lookup, well under the placeholder limit.
const LOCK_CHECK_BATCH: usize = 1000;

fn locked_date_sql(count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!("SELECT COUNT(*) FROM leave_locked_dates WHERE lock_date IN ({placeholders})")
}

/// Logs the failed operation and wraps the driver error.
fn db_error(op: &'static str) -> impl FnOnce(sqlx::Error) -> LeaveError {
    move |e| {
        error!(error = %e, op, "Leave store query failed");
        LeaveError::Store(anyhow::Error::new(e).context(op))
    }
}

fn days(value: i64, what: &str) -> LeaveResult<i32> {
    i32::try_from(value).map_err(|_| LeaveError::Store(anyhow!("{what} out of range: {value}")))
}

#[derive(sqlx::FromRow)]
struct RequestItemSql {
    #[sqlx(flatten)]
    request: LeaveRequestRow,
    employee_name: String,
    department_id: Option<u64>,
    department_name: String,
    type_name: String,
}

#[derive(sqlx::FromRow)]
struct BalanceSql {
    employee_id: u64,
    year: i32,
    leave_type_id: u64,
    type_name: String,
    total: i32,
    reserved: i32,
    pending: i64,
    approved: i64,
}

/// Typed bind values of the listing WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
    Str(&'static str),
}

fn build_request_where(filter: &RequestFilter) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(from) = filter.from_date {
        where_sql.push_str(" AND lr.start_date >= ?");
        args.push(FilterValue::Date(from));
    }
    if let Some(to) = filter.to_date {
        where_sql.push_str(" AND lr.end_date <= ?");
        args.push(FilterValue::Date(to));
    }
    if let Some(department_id) = filter.department_id {
        where_sql.push_str(" AND e.department_id = ?");
        args.push(FilterValue::U64(department_id));
    }
    if let Some(employee_id) = filter.employee_id {
        where_sql.push_str(" AND lr.employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }
    if let Some(leave_type_id) = filter.leave_type_id {
        where_sql.push_str(" AND lr.leave_type_id = ?");
        args.push(FilterValue::U64(leave_type_id));
    }
    if let Some(status) = filter.status {
        where_sql.push_str(" AND lr.status = ?");
        args.push(FilterValue::Str(status.into()));
    }
    (where_sql, args)
}

pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> LeaveResult<Transaction<'static, MySql>> {
        self.pool.begin().await.map_err(db_error("begin transaction"))
    }

    async fn fetch_leave_type(&self, leave_type_id: u64) -> LeaveResult<Option<LeaveType>> {
        let sql = format!("SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types WHERE id = ?");
        sqlx::query_as::<_, LeaveType>(&sql)
            .bind(leave_type_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch leave type"))
    }

    async fn request_exists(&self, request_id: u64) -> LeaveResult<bool> {
        let found = sqlx::query_scalar::<_, u64>("SELECT id FROM leave_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("check leave request"))?;
        Ok(found.is_some())
    }
}

/// Bumps the entitlement version observed by the balance check.
async fn claim_version(tx: &mut Transaction<'_, MySql>, version: Option<EntitlementVersion>) -> LeaveResult<()> {
    let Some(token) = version else {
        return Ok(());
    };
    let result = sqlx::query("UPDATE leave_entitlements SET version = version + 1 WHERE id = ? AND version = ?")
        .bind(token.entitlement_id)
        .bind(token.version)
        .execute(&mut **tx)
        .await
        .map_err(db_error("claim entitlement version"))?;
    if result.rows_affected() == 0 {
        debug!(entitlement_id = token.entitlement_id, "Entitlement version moved on");
        return Err(LeaveError::Conflict);
    }
    Ok(())
}

async fn fetch_request(tx: &mut Transaction<'_, MySql>, request_id: u64) -> LeaveResult<LeaveRequest> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests lr WHERE lr.id = ?");
    let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
        .bind(request_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("fetch leave request"))?
        .ok_or(LeaveError::NotFound)?;
    Ok(LeaveRequest::try_from(row)?)
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn list_leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        let sql = format!("SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types ORDER BY name ASC");
        sqlx::query_as::<_, LeaveType>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list leave types"))
    }

    async fn create_leave_type(&self, input: &LeaveTypeInput) -> LeaveResult<LeaveType> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_types
                (name, annual_entitlement_days, is_paid, requires_attachment, requires_approval,
                 counts_toward_entitlement, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(input.name.trim())
        .bind(input.annual_entitlement_days)
        .bind(input.is_paid)
        .bind(input.requires_attachment)
        .bind(input.requires_approval)
        .bind(input.counts_toward_entitlement)
        .bind(input.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_error("create leave type"))?;

        self.fetch_leave_type(result.last_insert_id())
            .await?
            .ok_or_else(|| LeaveError::Store(anyhow!("created leave type vanished")))
    }

    async fn update_leave_type(&self, leave_type_id: u64, input: &LeaveTypeInput) -> LeaveResult<LeaveType> {
        sqlx::query(
            r#"
            UPDATE leave_types
            SET name = ?, annual_entitlement_days = ?, is_paid = ?, requires_attachment = ?,
                requires_approval = ?, counts_toward_entitlement = ?, is_active = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(input.name.trim())
        .bind(input.annual_entitlement_days)
        .bind(input.is_paid)
        .bind(input.requires_attachment)
        .bind(input.requires_approval)
        .bind(input.counts_toward_entitlement)
        .bind(input.is_active)
        .bind(leave_type_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("update leave type"))?;

        // MySQL reports 0 affected rows for an unchanged row, so existence
        // is decided by the read back.
        self.fetch_leave_type(leave_type_id).await?.ok_or(LeaveError::TypeNotFound)
    }

    async fn deactivate_leave_type(&self, leave_type_id: u64) -> LeaveResult<()> {
        sqlx::query("UPDATE leave_types SET is_active = FALSE, updated_at = NOW() WHERE id = ?")
            .bind(leave_type_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("deactivate leave type"))?;
        match self.fetch_leave_type(leave_type_id).await? {
            Some(_) => Ok(()),
            None => Err(LeaveError::TypeNotFound),
        }
    }

    async fn lock_date(&self, date: NaiveDate, reason: &str, created_by: u64) -> LeaveResult<LockedDate> {
        sqlx::query(
            r#"
            INSERT INTO leave_locked_dates (lock_date, reason, created_by)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE reason = VALUES(reason), created_by = VALUES(created_by)
            "#,
        )
        .bind(date)
        .bind(reason)
        .bind(created_by)
        .execute(&self.pool)
        .await
        .map_err(db_error("lock date"))?;

        sqlx::query_as::<_, LockedDate>(
            "SELECT id, lock_date, reason, created_by, created_at FROM leave_locked_dates WHERE lock_date = ?",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("read locked date"))
    }

    async fn unlock_date(&self, date: NaiveDate) -> LeaveResult<()> {
        sqlx::query("DELETE FROM leave_locked_dates WHERE lock_date = ?")
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(db_error("unlock date"))?;
        Ok(())
    }

    async fn list_locked_dates(&self, year: i32) -> LeaveResult<Vec<LockedDate>> {
        sqlx::query_as::<_, LockedDate>(
            r#"
            SELECT id, lock_date, reason, created_by, created_at
            FROM leave_locked_dates
            WHERE YEAR(lock_date) = ?
            ORDER BY lock_date ASC
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list locked dates"))
    }

    async fn resolve_employee_by_user_id(&self, user_id: u64) -> LeaveResult<Option<u64>> {
        sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("resolve employee"))
    }

    async fn get_leave_type(&self, leave_type_id: u64) -> LeaveResult<LeaveType> {
        self.fetch_leave_type(leave_type_id).await?.ok_or(LeaveError::TypeNotFound)
    }

    async fn get_or_create_entitlement(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<LeaveEntitlement> {
        let employee_known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("check employee"))?;
        if employee_known == 0 {
            debug!(employee_id, "Entitlement requested for unknown employee");
            return Err(LeaveError::NotFound);
        }

        sqlx::query(CREATE_ENTITLEMENT_SQL)
            .bind(employee_id)
            .bind(year)
            .bind(leave_type_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("create entitlement"))?;

        sqlx::query_as::<_, LeaveEntitlement>(
            r#"
            SELECT id, employee_id, leave_type_id, year, total_days, reserved_days, version
            FROM leave_entitlements
            WHERE employee_id = ? AND leave_type_id = ? AND year = ?
            "#,
        )
        .bind(employee_id)
        .bind(leave_type_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch entitlement"))?
        .ok_or(LeaveError::TypeNotFound)
    }

    async fn used_days(&self, employee_id: u64, leave_type_id: u64, year: i32) -> LeaveResult<UsedDays> {
        let (pending, approved) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                CAST(COALESCE(SUM(CASE WHEN status = 'Pending' THEN working_days ELSE 0 END), 0) AS SIGNED),
                CAST(COALESCE(SUM(CASE WHEN status = 'Approved' THEN working_days ELSE 0 END), 0) AS SIGNED)
            FROM leave_requests
            WHERE employee_id = ? AND leave_type_id = ? AND YEAR(start_date) = ?
            "#,
        )
        .bind(employee_id)
        .bind(leave_type_id)
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("sum used days"))?;

        Ok(UsedDays {
            pending: days(pending, "pending days")?,
            approved: days(approved, "approved days")?,
        })
    }

    async fn count_approved_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<u64> {
        let mut sql = String::from(
            r#"
            SELECT COUNT(*)
            FROM leave_requests
            WHERE employee_id = ? AND status = 'Approved' AND start_date <= ? AND end_date >= ?
            "#,
        );
        if exclude_id.is_some() {
            sql.push_str(" AND id <> ?");
        }
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(employee_id).bind(end).bind(start);
        if let Some(id) = exclude_id {
            query = query.bind(id);
        }
        let count = query
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count approved overlap"))?;
        Ok(count.max(0) as u64)
    }

    async fn any_locked_date(&self, dates: &[NaiveDate]) -> LeaveResult<bool> {
        for chunk in dates.chunks(LOCK_CHECK_BATCH) {
            let sql = locked_date_sql(chunk.len());
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            for date in chunk {
                query = query.bind(*date);
            }
            let count = query
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("check locked dates"))?;
            if count > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn create_request(
        &self,
        request: &NewLeaveRequest,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest> {
        let mut tx = self.begin().await?;
        claim_version(&mut tx, version).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type_id, start_date, end_date, working_days, status, requested_by, comment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.leave_type_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.working_days)
        .bind(StatusKind::Pending.as_ref())
        .bind(request.requested_by)
        .bind(request.comment.trim())
        .execute(&mut *tx)
        .await
        .map_err(db_error("create leave request"))?;

        let created = fetch_request(&mut tx, result.last_insert_id()).await?;
        tx.commit().await.map_err(db_error("commit leave request"))?;
        Ok(created)
    }

    async fn get_request(&self, request_id: u64) -> LeaveResult<LeaveRequest> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests lr WHERE lr.id = ?");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch leave request"))?
            .ok_or(LeaveError::NotFound)?;
        Ok(LeaveRequest::try_from(row)?)
    }

    async fn update_request_status(
        &self,
        request_id: u64,
        change: &StatusChange,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest> {
        let cols = change.next.columns();
        let mut tx = self.begin().await?;
        claim_version(&mut tx, version).await?;

        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approved_by = ?, approved_at = ?, rejected_by = ?, rejected_at = ?,
                cancelled_by = ?, cancelled_at = ?, comment = ?, updated_at = NOW()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(cols.status.as_ref())
        .bind(cols.approved_by)
        .bind(cols.approved_at)
        .bind(cols.rejected_by)
        .bind(cols.rejected_at)
        .bind(cols.cancelled_by)
        .bind(cols.cancelled_at)
        .bind(change.comment.trim())
        .bind(request_id)
        .bind(change.expected.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(db_error("update leave status"))?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error("rollback leave status"))?;
            return if self.request_exists(request_id).await? {
                Err(LeaveError::InvalidStatusTransition)
            } else {
                Err(LeaveError::NotFound)
            };
        }

        let updated = fetch_request(&mut tx, request_id).await?;
        tx.commit().await.map_err(db_error("commit leave status"))?;
        Ok(updated)
    }

    async fn update_request_by_master(
        &self,
        request_id: u64,
        change: &RequestChange,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest> {
        let mut tx = self.begin().await?;
        claim_version(&mut tx, version).await?;

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET employee_id = ?, leave_type_id = ?, start_date = ?, end_date = ?, working_days = ?,
                comment = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(change.employee_id)
        .bind(change.leave_type_id)
        .bind(change.start_date)
        .bind(change.end_date)
        .bind(change.working_days)
        .bind(change.comment.trim())
        .bind(request_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("master update leave request"))?;

        // NotFound from the read back drops the transaction, which rolls back.
        let updated = fetch_request(&mut tx, request_id).await?;
        tx.commit().await.map_err(db_error("commit master update"))?;
        Ok(updated)
    }

    async fn delete_request(&self, request_id: u64) -> LeaveResult<()> {
        let result = sqlx::query("DELETE FROM leave_requests WHERE id = ?")
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete leave request"))?;
        if result.rows_affected() == 0 {
            return Err(LeaveError::NotFound);
        }
        Ok(())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> LeaveResult<RequestList> {
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(20).max(1);
        let offset = u64::from(page - 1) * u64::from(page_size);
        let (where_sql, args) = build_request_where(filter);

        let count_sql = format!("SELECT COUNT(*) {REQUEST_JOINS}{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match *arg {
                FilterValue::U64(v) => count_q.bind(v),
                FilterValue::Date(d) => count_q.bind(d),
                FilterValue::Str(s) => count_q.bind(s),
            };
        }
        let total = count_q
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count leave requests"))?;

        let data_sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS},
                TRIM(CONCAT(e.last_name, ', ', e.first_name)) AS employee_name,
                e.department_id,
                COALESCE(d.name, '') AS department_name,
                lt.name AS type_name
            {REQUEST_JOINS}{where_sql}
            ORDER BY lr.created_at DESC, lr.id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let mut data_q = sqlx::query_as::<_, RequestItemSql>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Date(d) => data_q.bind(d),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(page_size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list leave requests"))?;

        let items = rows
            .into_iter()
            .map(|row| -> LeaveResult<LeaveRequestItem> {
                Ok(LeaveRequestItem {
                    request: LeaveRequest::try_from(row.request)?,
                    employee_name: row.employee_name,
                    department_id: row.department_id,
                    department_name: row.department_name,
                    type_name: row.type_name,
                })
            })
            .collect::<LeaveResult<Vec<_>>>()?;

        Ok(RequestList {
            items,
            total,
            page,
            page_size,
        })
    }

    async fn list_balances(&self, employee_id: u64, year: i32) -> LeaveResult<Vec<BalanceRow>> {
        let rows = sqlx::query_as::<_, BalanceSql>(
            r#"
            SELECT
                le.employee_id,
                le.year,
                le.leave_type_id,
                lt.name AS type_name,
                le.total_days AS total,
                le.reserved_days AS reserved,
                CAST(COALESCE(SUM(CASE WHEN lr.status = 'Pending' THEN lr.working_days ELSE 0 END), 0) AS SIGNED) AS pending,
                CAST(COALESCE(SUM(CASE WHEN lr.status = 'Approved' THEN lr.working_days ELSE 0 END), 0) AS SIGNED) AS approved
            FROM leave_entitlements le
            JOIN leave_types lt ON lt.id = le.leave_type_id
            LEFT JOIN leave_requests lr
                ON lr.employee_id = le.employee_id
               AND lr.leave_type_id = le.leave_type_id
               AND YEAR(lr.start_date) = le.year
               AND lr.status IN ('Pending', 'Approved')
            WHERE le.employee_id = ? AND le.year = ?
            GROUP BY le.employee_id, le.year, le.leave_type_id, lt.name, le.total_days, le.reserved_days
            ORDER BY lt.name ASC
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list balances"))?;

        rows.into_iter()
            .map(|row| -> LeaveResult<BalanceRow> {
                Ok(BalanceRow {
                    employee_id: row.employee_id,
                    year: row.year,
                    leave_type_id: row.leave_type_id,
                    type_name: row.type_name,
                    total: row.total,
                    reserved: row.reserved,
                    pending: days(row.pending, "pending days")?,
                    approved: days(row.approved, "approved days")?,
                })
            })
            .collect()
    }
}
