use chrono::{Datelike, NaiveDate, Utc};
use sqlx::MySqlPool;

use crate::leave::error::LeaveError;
use crate::leave::recap::RecapLock;
use crate::leave::rules::{RuleContext, SiblingLeave, validate};
use crate::leave::{approver, ledger};
use crate::model::employee::Employee;
use crate::model::leave_request::{Attachment, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;

pub const DEFAULT_CANCEL_REASON: &str = "Cancelled by employee";
pub const ADMIN_APPROVAL_COMMENT: &str = "Approved by Admin";

const REQUEST_COLUMNS: &str = "id, employee_id, leave_type, is_paid, start_date, end_date, \
     total_days, reason, attachments, status, current_approver_id, supervisor_id, \
     supervisor_status, supervisor_comment, supervisor_action_at, \
     division_head_status, division_head_comment, division_head_action_at, \
     approved_at, rejected_at, cancelled_at, cancellation_reason, created_at";

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, gender, \
     division_id, supervisor_id, join_date, status";

/// Already-authenticated caller of a lifecycle operation.
#[derive(Debug, Copy, Clone)]
pub struct Actor {
    pub employee_id: u64,
    pub role: Role,
}

/// Which party the pending request is currently waiting on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    Supervisor,
    DivisionHead,
    /// No pending stage: direct approval or admin override
    Direct,
}

/// Result of an approve action on the current stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ApprovalOutcome {
    /// Request stays PENDING, routed to the next approver
    NextStage { next_approver: u64 },
    /// Request becomes APPROVED; `backfill_supervisor` marks the admin/direct
    /// path where the supervisor audit slot is stamped synthetically
    Finalize { backfill_supervisor: bool },
}

impl ApprovalOutcome {
    pub fn is_final(&self) -> bool {
        matches!(self, ApprovalOutcome::Finalize { .. })
    }
}

/// Audit slot a rejection is recorded against.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RejectSlot {
    Supervisor,
    DivisionHead,
}

/// Stage detection, meaningful only while the request is PENDING.
pub fn detect_stage(req: &LeaveRequest, division_head: Option<u64>) -> Stage {
    if req.supervisor_id.is_some() && !req.supervisor_approved() {
        Stage::Supervisor
    } else if division_head.is_some() && !req.division_head_approved() {
        Stage::DivisionHead
    } else {
        Stage::Direct
    }
}

pub fn approval_outcome(
    stage: Stage,
    division_head: Option<u64>,
    approver_id: u64,
) -> ApprovalOutcome {
    match stage {
        Stage::Supervisor => match division_head {
            // A distinct division head still has to sign off
            Some(head) if head != approver_id => ApprovalOutcome::NextStage {
                next_approver: head,
            },
            _ => ApprovalOutcome::Finalize {
                backfill_supervisor: false,
            },
        },
        Stage::DivisionHead => ApprovalOutcome::Finalize {
            backfill_supervisor: false,
        },
        Stage::Direct => ApprovalOutcome::Finalize {
            backfill_supervisor: true,
        },
    }
}

/// Exactly one stage's audit fields record a rejection: supervisor first,
/// then division head, with the supervisor slot doubling as the generic
/// audit slot on the admin path.
pub fn reject_slot(req: &LeaveRequest, division_head: Option<u64>) -> RejectSlot {
    if req.supervisor_id.is_some() && req.supervisor_action_at.is_none() {
        RejectSlot::Supervisor
    } else if division_head.is_some() && req.division_head_action_at.is_none() {
        RejectSlot::DivisionHead
    } else {
        RejectSlot::Supervisor
    }
}

pub fn can_cancel(
    status: LeaveStatus,
    start_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), LeaveError> {
    if status != LeaveStatus::Approved {
        return Err(LeaveError::conflict("Only approved leave can be cancelled"));
    }
    if start_date <= today {
        return Err(LeaveError::conflict(
            "Leave that has already started cannot be cancelled",
        ));
    }
    Ok(())
}

fn authorize_approver(actor: &Actor, req: &LeaveRequest) -> Result<(), LeaveError> {
    if actor.role.is_admin() || req.current_approver_id == Some(actor.employee_id) {
        Ok(())
    } else {
        Err(LeaveError::forbidden(
            "You are not the current approver for this request",
        ))
    }
}

fn parsed_status(req: &LeaveRequest) -> Result<LeaveStatus, LeaveError> {
    req.status().ok_or_else(|| LeaveError::Dependency {
        detail: format!("unrecognized status '{}' on request {}", req.status, req.id),
    })
}

fn parsed_type(req: &LeaveRequest) -> Result<LeaveType, LeaveError> {
    req.leave_type().ok_or_else(|| LeaveError::Dependency {
        detail: format!(
            "unrecognized leave type '{}' on request {}",
            req.leave_type, req.id
        ),
    })
}

fn ensure_pending(req: &LeaveRequest) -> Result<(), LeaveError> {
    if parsed_status(req)?.is_terminal() {
        return Err(LeaveError::conflict(
            "Leave request is not pending and cannot be acted on",
        ));
    }
    Ok(())
}

pub async fn fetch_request<'e, E>(exec: E, id: u64) -> Result<Option<LeaveRequest>, LeaveError>
where
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
{
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
    Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?)
}

async fn fetch_request_for_update<'e, E>(exec: E, id: u64) -> Result<Option<LeaveRequest>, LeaveError>
where
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
{
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
    Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?)
}

pub async fn fetch_employee<'e, E>(exec: E, id: u64) -> Result<Option<Employee>, LeaveError>
where
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
{
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    Ok(sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?)
}

#[derive(Debug)]
pub struct SubmitLeave {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: f64,
    pub reason: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Validates a submission against every business rule, resolves the initial
/// approver, and persists the request as PENDING.
pub async fn submit(
    pool: &MySqlPool,
    employee_id: u64,
    input: SubmitLeave,
) -> Result<LeaveRequest, LeaveError> {
    let employee = fetch_employee(pool, employee_id)
        .await?
        .ok_or(LeaveError::NotFound { entity: "employee" })?;

    let today = Utc::now().date_naive();
    let balance = ledger::get_or_create(
        pool,
        employee_id,
        employee.join_date,
        input.start_date.year(),
        today,
    )
    .await?;

    let siblings = fetch_siblings(pool, employee_id).await?;
    let ctx = RuleContext {
        today,
        gender: employee.gender(),
        leave_type: input.leave_type,
        start_date: input.start_date,
        end_date: input.end_date,
        total_days: input.total_days,
        balance: &balance,
        siblings: &siblings,
    };
    let violations = validate(&ctx);
    if !violations.is_empty() {
        return Err(LeaveError::validation(violations));
    }

    let approver_id = approver::determine_initial_approver(pool, &employee).await?;

    let attachments = if input.attachments.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&input.attachments).map_err(|e| LeaveError::Dependency {
            detail: e.to_string(),
        })?)
    };

    let result = sqlx::query(
        "INSERT INTO leave_requests \
         (employee_id, leave_type, is_paid, start_date, end_date, total_days, reason, \
          attachments, status, current_approver_id, supervisor_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
    )
    .bind(employee_id)
    .bind(input.leave_type.as_str())
    .bind(input.leave_type.is_paid())
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.total_days)
    .bind(&input.reason)
    .bind(&attachments)
    .bind(approver_id)
    .bind(employee.supervisor_id)
    .execute(pool)
    .await?;

    fetch_request(pool, result.last_insert_id())
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })
}

async fn fetch_siblings(pool: &MySqlPool, employee_id: u64) -> Result<Vec<SiblingLeave>, LeaveError> {
    let rows = sqlx::query_as::<_, (String, String, NaiveDate, NaiveDate)>(
        "SELECT leave_type, status, start_date, end_date FROM leave_requests \
         WHERE employee_id = ? AND status IN ('pending', 'approved')",
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    // Rows with unparseable enums are skipped rather than failing the whole
    // validation pass
    Ok(rows
        .into_iter()
        .filter_map(|(leave_type, status, start_date, end_date)| {
            Some(SiblingLeave {
                leave_type: leave_type.parse().ok()?,
                status: status.parse().ok()?,
                start_date,
                end_date,
            })
        })
        .collect())
}

/// Runs one approval step. The status check and write happen under a row
/// lock with a conditional update, so of two concurrent approvals exactly
/// one takes effect and the other observes a conflict.
pub async fn approve(
    pool: &MySqlPool,
    recap: &RecapLock,
    actor: &Actor,
    request_id: u64,
    comment: Option<String>,
) -> Result<(LeaveRequest, ApprovalOutcome), LeaveError> {
    recap.ensure_unlocked()?;

    let today = Utc::now().date_naive();
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let req = fetch_request_for_update(&mut *tx, request_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })?;
    ensure_pending(&req)?;
    authorize_approver(actor, &req)?;

    let employee = fetch_employee(&mut *tx, req.employee_id)
        .await?
        .ok_or(LeaveError::NotFound { entity: "employee" })?;
    let head = approver::division_head(&mut *tx, employee.division_id).await?;

    let stage = detect_stage(&req, head);
    let outcome = approval_outcome(stage, head, actor.employee_id);

    let result = match (stage, outcome) {
        (Stage::Supervisor, ApprovalOutcome::NextStage { next_approver }) => {
            sqlx::query(
                "UPDATE leave_requests SET supervisor_status = 'approved', \
                 supervisor_comment = ?, supervisor_action_at = ?, current_approver_id = ? \
                 WHERE id = ? AND status = 'pending'",
            )
            .bind(&comment)
            .bind(now)
            .bind(next_approver)
            .bind(request_id)
            .execute(&mut *tx)
            .await?
        }
        (Stage::Supervisor, ApprovalOutcome::Finalize { .. }) => {
            sqlx::query(
                "UPDATE leave_requests SET supervisor_status = 'approved', \
                 supervisor_comment = ?, supervisor_action_at = ?, status = 'approved', \
                 approved_at = ?, current_approver_id = ? \
                 WHERE id = ? AND status = 'pending'",
            )
            .bind(&comment)
            .bind(now)
            .bind(now)
            .bind(actor.employee_id)
            .bind(request_id)
            .execute(&mut *tx)
            .await?
        }
        (Stage::DivisionHead, _) => {
            sqlx::query(
                "UPDATE leave_requests SET division_head_status = 'approved', \
                 division_head_comment = ?, division_head_action_at = ?, status = 'approved', \
                 approved_at = ?, current_approver_id = ? \
                 WHERE id = ? AND status = 'pending'",
            )
            .bind(&comment)
            .bind(now)
            .bind(now)
            .bind(actor.employee_id)
            .bind(request_id)
            .execute(&mut *tx)
            .await?
        }
        (Stage::Direct, _) => {
            // Audit fields must never be left null on a terminal-approved
            // record, so the supervisor slot is backfilled here.
            let audit_comment = comment
                .clone()
                .unwrap_or_else(|| ADMIN_APPROVAL_COMMENT.to_string());
            sqlx::query(
                "UPDATE leave_requests SET status = 'approved', approved_at = ?, \
                 supervisor_status = 'approved', \
                 supervisor_comment = COALESCE(supervisor_comment, ?), \
                 supervisor_action_at = COALESCE(supervisor_action_at, ?), \
                 current_approver_id = ? \
                 WHERE id = ? AND status = 'pending'",
            )
            .bind(now)
            .bind(audit_comment)
            .bind(now)
            .bind(actor.employee_id)
            .bind(request_id)
            .execute(&mut *tx)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        return Err(LeaveError::conflict(
            "Leave request was already processed by another approver",
        ));
    }

    if outcome.is_final() {
        ledger::apply(
            &mut tx,
            req.employee_id,
            employee.join_date,
            req.start_date.year(),
            today,
            parsed_type(&req)?,
            req.total_days,
        )
        .await?;
    }

    tx.commit().await?;

    let updated = fetch_request(pool, request_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })?;
    Ok((updated, outcome))
}

/// Rejects a pending request, stamping exactly one stage's audit fields.
pub async fn reject(
    pool: &MySqlPool,
    recap: &RecapLock,
    actor: &Actor,
    request_id: u64,
    comment: String,
) -> Result<LeaveRequest, LeaveError> {
    recap.ensure_unlocked()?;

    if comment.trim().is_empty() {
        return Err(LeaveError::validation(vec![
            "A rejection comment is required".to_string(),
        ]));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let req = fetch_request_for_update(&mut *tx, request_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })?;
    ensure_pending(&req)?;
    authorize_approver(actor, &req)?;

    let employee = fetch_employee(&mut *tx, req.employee_id)
        .await?
        .ok_or(LeaveError::NotFound { entity: "employee" })?;
    let head = approver::division_head(&mut *tx, employee.division_id).await?;

    let sql = match reject_slot(&req, head) {
        RejectSlot::Supervisor => {
            "UPDATE leave_requests SET supervisor_status = 'rejected', \
             supervisor_comment = ?, supervisor_action_at = ?, status = 'rejected', \
             rejected_at = ? WHERE id = ? AND status = 'pending'"
        }
        RejectSlot::DivisionHead => {
            "UPDATE leave_requests SET division_head_status = 'rejected', \
             division_head_comment = ?, division_head_action_at = ?, status = 'rejected', \
             rejected_at = ? WHERE id = ? AND status = 'pending'"
        }
    };
    let result = sqlx::query(sql)
        .bind(&comment)
        .bind(now)
        .bind(now)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LeaveError::conflict(
            "Leave request was already processed by another approver",
        ));
    }

    tx.commit().await?;

    fetch_request(pool, request_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })
}

/// Cancels an approved, not-yet-started leave and restores the consumed
/// balance within the same transaction.
pub async fn cancel(
    pool: &MySqlPool,
    actor: &Actor,
    request_id: u64,
    reason: Option<String>,
) -> Result<LeaveRequest, LeaveError> {
    let today = Utc::now().date_naive();
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let req = fetch_request_for_update(&mut *tx, request_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })?;

    if req.employee_id != actor.employee_id {
        return Err(LeaveError::forbidden(
            "Only the requesting employee may cancel this leave",
        ));
    }
    can_cancel(parsed_status(&req)?, req.start_date, today)?;

    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());

    let result = sqlx::query(
        "UPDATE leave_requests SET status = 'cancelled', cancelled_at = ?, \
         cancellation_reason = ? WHERE id = ? AND status = 'approved'",
    )
    .bind(now)
    .bind(&reason)
    .bind(request_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(LeaveError::conflict(
            "Leave request was already processed",
        ));
    }

    let employee = fetch_employee(&mut *tx, req.employee_id)
        .await?
        .ok_or(LeaveError::NotFound { entity: "employee" })?;
    ledger::reverse(
        &mut tx,
        req.employee_id,
        employee.join_date,
        req.start_date.year(),
        today,
        parsed_type(&req)?,
        req.total_days,
    )
    .await?;

    tx.commit().await?;

    fetch_request(pool, request_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })
}

/// Hard-removes a still-pending request. No ledger interaction: nothing was
/// ever consumed.
pub async fn delete(
    pool: &MySqlPool,
    actor: &Actor,
    request_id: u64,
) -> Result<(), LeaveError> {
    let req = fetch_request(pool, request_id)
        .await?
        .ok_or(LeaveError::NotFound {
            entity: "leave request",
        })?;

    if req.employee_id != actor.employee_id {
        return Err(LeaveError::forbidden(
            "Only the requesting employee may delete this leave request",
        ));
    }

    let result = sqlx::query("DELETE FROM leave_requests WHERE id = ? AND status = 'pending'")
        .bind(request_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LeaveError::conflict(
            "Only pending requests can be deleted",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pending_request(supervisor_id: Option<u64>, current_approver: Option<u64>) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 1000,
            leave_type: "annual".into(),
            is_paid: true,
            start_date: date(2026, 1, 6),
            end_date: date(2026, 1, 8),
            total_days: 3.0,
            reason: None,
            attachments: None,
            status: "pending".into(),
            current_approver_id: current_approver,
            supervisor_id,
            supervisor_status: None,
            supervisor_comment: None,
            supervisor_action_at: None,
            division_head_status: None,
            division_head_comment: None,
            division_head_action_at: None,
            approved_at: None,
            rejected_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: None,
        }
    }

    const SUPERVISOR: u64 = 5;
    const HEAD: u64 = 7;

    #[test]
    fn supervisor_then_division_head_chain() {
        // Scenario: supervisor S and a distinct division head D
        let mut req = pending_request(Some(SUPERVISOR), Some(SUPERVISOR));
        assert_eq!(detect_stage(&req, Some(HEAD)), Stage::Supervisor);

        let outcome = approval_outcome(Stage::Supervisor, Some(HEAD), SUPERVISOR);
        assert_eq!(
            outcome,
            ApprovalOutcome::NextStage {
                next_approver: HEAD
            }
        );

        // After the supervisor's approval the request waits on the head
        req.supervisor_status = Some("approved".into());
        req.current_approver_id = Some(HEAD);
        assert_eq!(detect_stage(&req, Some(HEAD)), Stage::DivisionHead);
        assert!(approval_outcome(Stage::DivisionHead, Some(HEAD), HEAD).is_final());
    }

    #[test]
    fn supervisor_who_is_also_head_finalizes_in_one_step() {
        let req = pending_request(Some(HEAD), Some(HEAD));
        assert_eq!(detect_stage(&req, Some(HEAD)), Stage::Supervisor);
        assert_eq!(
            approval_outcome(Stage::Supervisor, Some(HEAD), HEAD),
            ApprovalOutcome::Finalize {
                backfill_supervisor: false
            }
        );
    }

    #[test]
    fn no_supervisor_goes_straight_to_division_head() {
        // Scenario: no supervisor, division head D approves directly
        let req = pending_request(None, Some(HEAD));
        assert_eq!(detect_stage(&req, Some(HEAD)), Stage::DivisionHead);
        assert!(approval_outcome(Stage::DivisionHead, Some(HEAD), HEAD).is_final());
    }

    #[test]
    fn no_stages_left_means_direct_approval_with_backfill() {
        let req = pending_request(None, Some(1));
        assert_eq!(detect_stage(&req, None), Stage::Direct);
        assert_eq!(
            approval_outcome(Stage::Direct, None, 1),
            ApprovalOutcome::Finalize {
                backfill_supervisor: true
            }
        );
    }

    #[test]
    fn reject_slot_prefers_the_unactioned_supervisor_stage() {
        let req = pending_request(Some(SUPERVISOR), Some(SUPERVISOR));
        assert_eq!(reject_slot(&req, Some(HEAD)), RejectSlot::Supervisor);
    }

    #[test]
    fn reject_slot_moves_to_division_head_after_supervisor_acted() {
        let mut req = pending_request(Some(SUPERVISOR), Some(HEAD));
        req.supervisor_status = Some("approved".into());
        req.supervisor_action_at = Some(Utc::now());
        assert_eq!(reject_slot(&req, Some(HEAD)), RejectSlot::DivisionHead);
    }

    #[test]
    fn reject_slot_falls_back_to_supervisor_as_audit_slot() {
        let req = pending_request(None, Some(1));
        assert_eq!(reject_slot(&req, None), RejectSlot::Supervisor);
    }

    #[test]
    fn approver_authorization() {
        let req = pending_request(Some(SUPERVISOR), Some(SUPERVISOR));
        let supervisor = Actor {
            employee_id: SUPERVISOR,
            role: Role::Employee,
        };
        let admin = Actor {
            employee_id: 99,
            role: Role::Admin,
        };
        let bystander = Actor {
            employee_id: 42,
            role: Role::Employee,
        };
        assert!(authorize_approver(&supervisor, &req).is_ok());
        assert!(authorize_approver(&admin, &req).is_ok());
        assert!(matches!(
            authorize_approver(&bystander, &req),
            Err(LeaveError::Forbidden { .. })
        ));
    }

    #[test]
    fn only_pending_requests_can_be_acted_on() {
        let mut req = pending_request(Some(SUPERVISOR), Some(SUPERVISOR));
        req.status = "approved".into();
        assert!(matches!(
            ensure_pending(&req),
            Err(LeaveError::Conflict { .. })
        ));
    }

    #[test]
    fn cancel_guard() {
        let today = date(2026, 1, 5);
        // Tomorrow's approved leave can be cancelled
        assert!(can_cancel(LeaveStatus::Approved, date(2026, 1, 6), today).is_ok());
        // Started or past leave cannot
        assert!(can_cancel(LeaveStatus::Approved, today, today).is_err());
        assert!(can_cancel(LeaveStatus::Approved, date(2026, 1, 2), today).is_err());
        // Only APPROVED can be cancelled
        assert!(can_cancel(LeaveStatus::Pending, date(2026, 1, 6), today).is_err());
        assert!(can_cancel(LeaveStatus::Cancelled, date(2026, 1, 6), today).is_err());
    }
}
