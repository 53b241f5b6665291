use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::leave::error::LeaveError;
use crate::model::division::Division;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateDivision {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = 7, nullable = true)]
    pub head_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateDivisionHead {
    #[schema(example = 7, nullable = true)]
    pub head_id: Option<u64>,
}

/// Create division
#[utoipa::path(
    post,
    path = "/api/v1/division",
    request_body = CreateDivision,
    responses(
        (status = 200, description = "Division created", body = Object, example = json!({
            "message": "Division created",
            "id": 10
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Division"
)]
pub async fn create_division(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDivision>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query("INSERT INTO divisions (name, head_id) VALUES (?, ?)")
        .bind(&payload.name)
        .bind(payload.head_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create division");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Division created",
        "id": result.last_insert_id()
    })))
}

/// Fetch one division
#[utoipa::path(
    get,
    path = "/api/v1/division/{id}",
    params(("id" = u64, Path, description = "Division id")),
    responses(
        (status = 200, description = "Division found", body = Division),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Division not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Division"
)]
pub async fn get_division(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let division = sqlx::query_as::<_, Division>(
        "SELECT id, name, head_id FROM divisions WHERE id = ?",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(LeaveError::NotFound { entity: "division" })?;

    Ok(HttpResponse::Ok().json(division))
}

/// Assign or clear the division head
#[utoipa::path(
    put,
    path = "/api/v1/division/{id}/head",
    params(("id" = u64, Path, description = "Division id")),
    request_body = UpdateDivisionHead,
    responses(
        (status = 200, description = "Division head updated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Division not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Division"
)]
pub async fn set_division_head(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateDivisionHead>,
) -> Result<impl Responder, LeaveError> {
    auth.require_hr_or_admin()
        .map_err(|_| LeaveError::forbidden("HR/Admin only"))?;

    let result = sqlx::query("UPDATE divisions SET head_id = ? WHERE id = ?")
        .bind(payload.head_id)
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(LeaveError::NotFound { entity: "division" });
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Division head updated"
    })))
}
