use crate::auth::auth::AuthUser;
use crate::external::attachments::{AttachmentStore, StoredAttachment};
use crate::external::notify::{self, NoticeKind, Notifier};
use crate::leave::error::LeaveError;
use crate::leave::lifecycle::{self, SubmitLeave};
use crate::leave::recap::RecapLock;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlPool, prelude::FromRow};
use utoipa::{IntoParams, ToSchema};

use crate::model::leave_request::{Attachment, LeaveRequest, LeaveType};

/// Leave starting within this window triggers an approver reminder.
const REMINDER_WINDOW_DAYS: i64 = 7;
const DOWNLOAD_URL_TTL_SECS: u64 = 600;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "annual")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-08", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3.0)]
    pub total_days: f64,
    #[schema(example = "Family event", nullable = true)]
    pub reason: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveLeave {
    #[schema(example = "Looks fine", nullable = true)]
    pub comment: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectLeave {
    #[schema(example = "Overlaps the release window")]
    pub comment: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CancelLeave {
    #[schema(example = "Plans changed", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RecapLockToggle {
    pub locked: bool,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID (HR tier only; employees always see their own)
    #[schema(example = 123)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct UploadQuery {
    #[schema(example = "certificate.pdf")]
    pub filename: String,
    #[schema(example = "application/pdf")]
    pub mime_type: String,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "annual", value_type = String)]
    pub leave_type: String,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-08", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3.0)]
    pub total_days: f64,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    #[schema(example = 5, nullable = true)]
    pub current_approver_id: Option<u64>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveSummary>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

fn spawn_post_approval(pool: MySqlPool, notifier: Notifier, req: LeaveRequest, finalized: bool) {
    actix_web::rt::spawn(async move {
        if finalized {
            notify::notify_employee(&pool, notifier.clone(), &req, NoticeKind::Approved).await;
            let today = Utc::now().date_naive();
            if req.start_date - today <= Duration::days(REMINDER_WINDOW_DAYS) {
                notify::send_start_reminder(&pool, notifier, &req).await;
            }
        } else {
            notify::notify_pending_approver(&pool, notifier, &req).await;
        }
    });
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    payload: web::Json<CreateLeave>,
) -> Result<impl Responder, LeaveError> {
    let employee_id = auth
        .employee_id
        .ok_or_else(|| LeaveError::forbidden("No employee profile"))?;

    let payload = payload.into_inner();
    let request = lifecycle::submit(
        pool.get_ref(),
        employee_id,
        SubmitLeave {
            leave_type: payload.leave_type,
            start_date: payload.start_date,
            end_date: payload.end_date,
            total_days: payload.total_days,
            reason: payload.reason,
            attachments: payload.attachments,
        },
    )
    .await?;

    tracing::info!(request_id = request.id, employee_id, "leave request submitted");

    let pool2 = pool.get_ref().clone();
    let notifier2 = notifier.get_ref().clone();
    let snapshot = request.clone();
    actix_web::rt::spawn(async move {
        notify::notify_pending_approver(&pool2, notifier2, &snapshot).await;
    });

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Approve leave (current approver / admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    request_body(content = ApproveLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Approval step applied", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the current approver"),
        (status = 409, description = "Request is not pending"),
        (status = 423, description = "Locked for payroll recap")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    recap: web::Data<RecapLock>,
    notifier: web::Data<Notifier>,
    path: web::Path<u64>,
    payload: Option<web::Json<ApproveLeave>>,
) -> Result<impl Responder, LeaveError> {
    let leave_id = path.into_inner();
    let comment = payload.and_then(|p| p.into_inner().comment);
    let actor = auth.actor();

    let (request, outcome) =
        lifecycle::approve(pool.get_ref(), recap.get_ref(), &actor, leave_id, comment).await?;

    tracing::info!(
        request_id = leave_id,
        approver = actor.employee_id,
        finalized = outcome.is_final(),
        "leave approval step applied"
    );

    spawn_post_approval(
        pool.get_ref().clone(),
        notifier.get_ref().clone(),
        request.clone(),
        outcome.is_final(),
    );

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Reject leave (current approver / admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    request_body(content = RejectLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Missing rejection comment"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the current approver"),
        (status = 409, description = "Request is not pending"),
        (status = 423, description = "Locked for payroll recap")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    recap: web::Data<RecapLock>,
    notifier: web::Data<Notifier>,
    path: web::Path<u64>,
    payload: web::Json<RejectLeave>,
) -> Result<impl Responder, LeaveError> {
    let leave_id = path.into_inner();
    let actor = auth.actor();

    let request = lifecycle::reject(
        pool.get_ref(),
        recap.get_ref(),
        &actor,
        leave_id,
        payload.into_inner().comment,
    )
    .await?;

    tracing::info!(request_id = leave_id, approver = actor.employee_id, "leave rejected");

    let pool2 = pool.get_ref().clone();
    let notifier2 = notifier.get_ref().clone();
    let snapshot = request.clone();
    actix_web::rt::spawn(async move {
        notify::notify_employee(&pool2, notifier2, &snapshot, NoticeKind::Rejected).await;
    });

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Cancel approved leave (owner)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/cancel",
    params(("leave_id" = u64, Path, description = "ID of the leave request to cancel")),
    request_body(content = CancelLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave cancelled, balance restored", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owning employee"),
        (status = 409, description = "Leave is not approved or already started")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    path: web::Path<u64>,
    payload: Option<web::Json<CancelLeave>>,
) -> Result<impl Responder, LeaveError> {
    let leave_id = path.into_inner();
    let actor = auth.actor();
    let reason = payload.and_then(|p| p.into_inner().reason);

    let request = lifecycle::cancel(pool.get_ref(), &actor, leave_id, reason).await?;

    tracing::info!(request_id = leave_id, employee_id = actor.employee_id, "leave cancelled");

    let pool2 = pool.get_ref().clone();
    let notifier2 = notifier.get_ref().clone();
    let snapshot = request.clone();
    actix_web::rt::spawn(async move {
        notify::notify_cancellation(&pool2, notifier2, &snapshot).await;
    });

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Delete pending leave (owner)
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to delete")),
    responses(
        (status = 200, description = "Leave request deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owning employee"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is no longer pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let leave_id = path.into_inner();
    let actor = auth.actor();

    lifecycle::delete(pool.get_ref(), &actor, leave_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request deleted"
    })))
}

/* =========================
Recap lock (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/recap-lock",
    request_body(content = RecapLockToggle, content_type = "application/json"),
    responses(
        (status = 200, description = "Recap lock updated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn set_recap_lock(
    auth: AuthUser,
    recap: web::Data<RecapLock>,
    payload: web::Json<RecapLockToggle>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    recap.set(payload.locked);
    tracing::info!(locked = payload.locked, "recap lock updated");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "locked": payload.locked
    })))
}

/* =========================
Attachment upload / download URL
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave/attachments",
    params(UploadQuery),
    request_body(content = String, description = "Raw file bytes", content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Stored attachment metadata", body = StoredAttachment),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn upload_attachment(
    auth: AuthUser,
    store: web::Data<AttachmentStore>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<impl Responder, LeaveError> {
    let employee_id = auth
        .employee_id
        .ok_or_else(|| LeaveError::forbidden("No employee profile"))?;

    let stored = store.store(&body, employee_id, "leave", &query.mime_type, &query.filename)?;
    Ok(HttpResponse::Ok().json(stored))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}/attachments/{index}/url",
    params(
        ("leave_id" = u64, Path, description = "Leave request id"),
        ("index" = u32, Path, description = "Zero-based attachment index")
    ),
    responses(
        (status = 200, description = "Temporary download URL"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner or HR tier"),
        (status = 404, description = "Request or attachment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn attachment_url(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<AttachmentStore>,
    path: web::Path<(u64, u32)>,
) -> Result<impl Responder, LeaveError> {
    let (leave_id, index) = path.into_inner();
    let index = index as usize;

    let request = lifecycle::fetch_request(pool.get_ref(), leave_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })?;

    let is_owner = auth.employee_id == Some(request.employee_id);
    if !is_owner && !auth.role.is_hr_tier() {
        return Err(LeaveError::forbidden(
            "Attachments are visible to the owner and HR tier only",
        ));
    }

    let attachments = request.attachment_list();
    let entry = attachments.get(index).ok_or(LeaveError::NotFound {
        entity: "attachment",
    })?;

    let url = match entry {
        Attachment::File { path, .. } => store.download_url(path, DOWNLOAD_URL_TTL_SECS),
        Attachment::Url { url } => url.clone(),
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({ "url": url })))
}

/* =========================
Fetch one leave request
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let leave_id = path.into_inner();

    let request = lifecycle::fetch_request(pool.get_ref(), leave_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })?;

    let is_owner = auth.employee_id == Some(request.employee_id);
    let is_approver = auth.employee_id.is_some()
        && (auth.employee_id == request.current_approver_id
            || auth.employee_id == request.supervisor_id);
    if !is_owner && !is_approver && !auth.role.is_hr_tier() {
        return Err(LeaveError::forbidden(
            "You may only view your own leave requests",
        ));
    }

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Paginated leave list
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<impl Responder, LeaveError> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    // Employees only ever see their own history
    let scoped_employee = if auth.role.is_hr_tier() {
        query.employee_id
    } else {
        Some(auth.employee_id.unwrap_or(0))
    };
    if let Some(emp_id) = scoped_employee {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        "SELECT id, employee_id, leave_type, start_date, end_date, total_days, status, \
         current_approver_id, created_at \
         FROM leave_requests{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveSummary>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }
    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
