use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::error::LeaveError;
use crate::leave::lifecycle;
use crate::model::employee::{Employee, Gender};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-3000")]
    pub employee_code: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john@email.com", format = "email")]
    pub email: String,
    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "male")]
    pub gender: Gender,
    #[schema(example = 1)]
    pub division_id: u64,
    #[schema(example = 5, nullable = true)]
    pub supervisor_id: Option<u64>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub join_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub division_id: Option<u64>,
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/v1/employee",
    request_body = CreateEmployee,
    responses(
        (status = 200, description = "Employee created", body = Object, example = json!({
            "message": "Employee created",
            "id": 1001
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query(
        "INSERT INTO employees \
         (employee_code, first_name, last_name, email, phone, gender, division_id, \
          supervisor_id, join_date, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active')",
    )
    .bind(&payload.employee_code)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.gender.to_string())
    .bind(payload.division_id)
    .bind(payload.supervisor_id)
    .bind(payload.join_date)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create employee");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee created",
        "id": result.last_insert_id()
    })))
}

/// Fetch one employee
#[utoipa::path(
    get,
    path = "/api/v1/employee/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let id = path.into_inner();
    if auth.employee_id != Some(id) && !auth.role.is_hr_tier() {
        return Err(LeaveError::forbidden("HR/Admin only"));
    }

    let employee = lifecycle::fetch_employee(pool.get_ref(), id)
        .await?
        .ok_or(LeaveError::NotFound { entity: "employee" })?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Paginated employee list
#[utoipa::path(
    get,
    path = "/api/v1/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<impl Responder, LeaveError> {
    auth.require_hr_or_admin()
        .map_err(|_| LeaveError::forbidden("HR/Admin only"))?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    if query.division_id.is_some() {
        where_sql.push_str(" AND division_id = ?");
    }
    if query.status.is_some() {
        where_sql.push_str(" AND status = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM employees{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(division_id) = query.division_id {
        count_q = count_q.bind(division_id);
    }
    if let Some(status) = query.status.as_deref() {
        count_q = count_q.bind(status);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT id, employee_code, first_name, last_name, email, phone, gender, division_id, \
         supervisor_id, join_date, status FROM employees{} ORDER BY id LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, Employee>(&data_sql);
    if let Some(division_id) = query.division_id {
        data_q = data_q.bind(division_id);
    }
    if let Some(status) = query.status.as_deref() {
        data_q = data_q.bind(status);
    }
    let employees = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}
