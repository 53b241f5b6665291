use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::error::LeaveError;
use crate::leave::{ledger, lifecycle};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Defaults to the current calendar year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

async fn balance_for(
    pool: &MySqlPool,
    employee_id: u64,
    year: Option<i32>,
) -> Result<HttpResponse, LeaveError> {
    let employee = lifecycle::fetch_employee(pool, employee_id)
        .await?
        .ok_or(LeaveError::NotFound { entity: "employee" })?;

    let today = Utc::now().date_naive();
    let year = year.unwrap_or_else(|| today.year());
    let balance = ledger::get_or_create(pool, employee_id, employee.join_date, year, today).await?;
    Ok(HttpResponse::Ok().json(balance))
}

/// Own leave balance for the given year (lazily created on first access).
#[utoipa::path(
    get,
    path = "/api/v1/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Leave balance", body = crate::model::leave_balance::LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn my_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BalanceQuery>,
) -> Result<impl Responder, LeaveError> {
    let employee_id = auth
        .employee_id
        .ok_or_else(|| LeaveError::forbidden("No employee profile"))?;
    balance_for(pool.get_ref(), employee_id, query.year).await
}

/// Any employee's balance, HR tier only.
#[utoipa::path(
    get,
    path = "/api/v1/balance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee id"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Leave balance", body = crate::model::leave_balance::LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn employee_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> Result<impl Responder, LeaveError> {
    auth.require_hr_or_admin()
        .map_err(|_| LeaveError::forbidden("HR/Admin only"))?;
    balance_for(pool.get_ref(), path.into_inner(), query.year).await
}
