use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, Transaction};

use crate::leave::error::LeaveError;
use crate::model::leave_balance::{LeaveBalance, prorated_annual_quota};
use crate::model::leave_request::LeaveType;

const BALANCE_COLUMNS: &str = "id, employee_id, year, annual_quota, annual_used, annual_remaining, \
     sick_used, menstrual_used, unpaid_used, toil_balance, toil_used, toil_expired";

// Quota refresh on the duplicate path recomputes annual_remaining from the
// new quota but never touches annual_used.
const UPSERT_SQL: &str = "INSERT INTO leave_balances \
     (employee_id, year, annual_quota, annual_used, annual_remaining, \
      sick_used, menstrual_used, unpaid_used, toil_balance, toil_used, toil_expired) \
     VALUES (?, ?, ?, 0, ?, 0, 0, 0, 0, 0, 0) \
     ON DUPLICATE KEY UPDATE \
         annual_quota = VALUES(annual_quota), \
         annual_remaining = VALUES(annual_quota) - annual_used";

/// Idempotent per-(employee, year) upsert. Creates the row lazily with a
/// tenure-prorated quota; on subsequent calls only refreshes the quota.
pub async fn get_or_create(
    pool: &MySqlPool,
    employee_id: u64,
    join_date: NaiveDate,
    year: i32,
    today: NaiveDate,
) -> Result<LeaveBalance, LeaveError> {
    let quota = prorated_annual_quota(join_date, today);

    sqlx::query(UPSERT_SQL)
        .bind(employee_id)
        .bind(year)
        .bind(quota)
        .bind(quota)
        .execute(pool)
        .await?;

    let sql = format!("SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ? AND year = ?");
    let balance = sqlx::query_as::<_, LeaveBalance>(&sql)
        .bind(employee_id)
        .bind(year)
        .fetch_one(pool)
        .await?;
    Ok(balance)
}

// Row-locked read-modify-write; concurrent apply/reverse for the same
// (employee, year) serialize on the FOR UPDATE lock.
async fn mutate_locked(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
    join_date: NaiveDate,
    year: i32,
    today: NaiveDate,
    mutate: impl FnOnce(&mut LeaveBalance),
) -> Result<(), LeaveError> {
    let quota = prorated_annual_quota(join_date, today);
    sqlx::query(UPSERT_SQL)
        .bind(employee_id)
        .bind(year)
        .bind(quota)
        .bind(quota)
        .execute(&mut **tx)
        .await?;

    let sql = format!(
        "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ? AND year = ? FOR UPDATE"
    );
    let mut balance = sqlx::query_as::<_, LeaveBalance>(&sql)
        .bind(employee_id)
        .bind(year)
        .fetch_one(&mut **tx)
        .await?;

    mutate(&mut balance);

    sqlx::query(
        "UPDATE leave_balances SET annual_used = ?, annual_remaining = ?, \
         sick_used = ?, menstrual_used = ?, unpaid_used = ? WHERE id = ?",
    )
    .bind(balance.annual_used)
    .bind(balance.annual_remaining)
    .bind(balance.sick_used)
    .bind(balance.menstrual_used)
    .bind(balance.unpaid_used)
    .bind(balance.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Consumes the approved request's days. Runs inside the same transaction as
/// the status transition so a half-applied balance can never be observed.
pub async fn apply(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
    join_date: NaiveDate,
    year: i32,
    today: NaiveDate,
    leave_type: LeaveType,
    days: f64,
) -> Result<(), LeaveError> {
    mutate_locked(tx, employee_id, join_date, year, today, |b| {
        b.apply(leave_type, days)
    })
    .await
}

/// Restores the days consumed by a cancelled leave.
pub async fn reverse(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
    join_date: NaiveDate,
    year: i32,
    today: NaiveDate,
    leave_type: LeaveType,
    days: f64,
) -> Result<(), LeaveError> {
    mutate_locked(tx, employee_id, join_date, year, today, |b| {
        b.reverse(leave_type, days)
    })
    .await
}
