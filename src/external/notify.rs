use sqlx::MySqlPool;
use strum::Display;

use crate::model::leave_request::LeaveRequest;

/// Notification kinds fired at lifecycle transitions. Delivery is an
/// external concern; this adapter logs the outbound notice and reports
/// success. Every invocation is fire-and-forget relative to the state
/// transition that triggered it.
#[derive(Debug, Copy, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NoticeKind {
    Submitted,
    Approved,
    Rejected,
    Cancelled,
    Reminder,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub to: String,
    pub cc: Vec<String>,
    pub request_id: u64,
    pub summary: String,
}

#[derive(Debug, Clone, Default)]
pub struct Notifier;

impl Notifier {
    pub fn new() -> Self {
        Self
    }

    pub async fn send(&self, notice: &Notice) -> anyhow::Result<()> {
        tracing::info!(
            kind = %notice.kind,
            to = %notice.to,
            cc = ?notice.cc,
            request_id = notice.request_id,
            summary = %notice.summary,
            "dispatching leave notification"
        );
        Ok(())
    }
}

/// Sends in the background; a delivery failure never reaches the caller.
pub fn spawn_notice(notifier: Notifier, notice: Notice) {
    actix_web::rt::spawn(async move {
        if let Err(e) = notifier.send(&notice).await {
            tracing::warn!(error = %e, request_id = notice.request_id, "notification failed");
        }
    });
}

/// CC fan-out for the starts-soon reminder: division peers plus all division
/// heads, deduplicated, missing addresses dropped, the TO recipient excluded.
pub fn reminder_cc_list(
    to: &str,
    peers: &[Option<String>],
    heads: &[Option<String>],
) -> Vec<String> {
    let mut cc: Vec<String> = Vec::new();
    for email in peers.iter().chain(heads.iter()) {
        let Some(email) = email.as_deref() else {
            continue;
        };
        if email.is_empty() || email == to {
            continue;
        }
        if !cc.iter().any(|e| e == email) {
            cc.push(email.to_string());
        }
    }
    cc
}

async fn email_of(pool: &MySqlPool, employee_id: u64) -> Option<String> {
    sqlx::query_scalar::<_, String>("SELECT email FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| tracing::warn!(error = %e, employee_id, "email lookup failed"))
        .ok()
        .flatten()
}

fn summary_of(req: &LeaveRequest) -> String {
    format!(
        "{} leave {} to {} ({} days)",
        req.leave_type, req.start_date, req.end_date, req.total_days
    )
}

/// Tells the current approver a request awaits their action. Used both on
/// submission and when an approval advances to the next stage.
pub async fn notify_pending_approver(pool: &MySqlPool, notifier: Notifier, req: &LeaveRequest) {
    let Some(approver_id) = req.current_approver_id else {
        return;
    };
    let Some(to) = email_of(pool, approver_id).await else {
        return;
    };
    spawn_notice(
        notifier,
        Notice {
            kind: NoticeKind::Submitted,
            to,
            cc: Vec::new(),
            request_id: req.id,
            summary: summary_of(req),
        },
    );
}

/// Tells the employee their request reached a terminal state.
pub async fn notify_employee(
    pool: &MySqlPool,
    notifier: Notifier,
    req: &LeaveRequest,
    kind: NoticeKind,
) {
    let Some(to) = email_of(pool, req.employee_id).await else {
        return;
    };
    spawn_notice(
        notifier,
        Notice {
            kind,
            to,
            cc: Vec::new(),
            request_id: req.id,
            summary: summary_of(req),
        },
    );
}

/// Cancellation fans out to the employee plus the approval chain; recipients
/// without an address are silently dropped.
pub async fn notify_cancellation(pool: &MySqlPool, notifier: Notifier, req: &LeaveRequest) {
    let Some(to) = email_of(pool, req.employee_id).await else {
        return;
    };
    let mut cc = Vec::new();
    for id in [req.supervisor_id, req.current_approver_id].into_iter().flatten() {
        if id == req.employee_id {
            continue;
        }
        if let Some(email) = email_of(pool, id).await {
            if email != to && !cc.contains(&email) {
                cc.push(email);
            }
        }
    }
    spawn_notice(
        notifier,
        Notice {
            kind: NoticeKind::Cancelled,
            to,
            cc,
            request_id: req.id,
            summary: summary_of(req),
        },
    );
}

/// Starts-soon reminder to the approver with the division fan-out in CC.
pub async fn send_start_reminder(pool: &MySqlPool, notifier: Notifier, req: &LeaveRequest) {
    let Some(approver_id) = req.current_approver_id else {
        return;
    };
    let Some(to) = email_of(pool, approver_id).await else {
        return;
    };

    let peers = sqlx::query_scalar::<_, Option<String>>(
        "SELECT e.email FROM employees e \
         JOIN employees owner ON owner.division_id = e.division_id \
         WHERE owner.id = ? AND e.id != ? AND e.status = 'active'",
    )
    .bind(req.employee_id)
    .bind(req.employee_id)
    .fetch_all(pool)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "reminder peer lookup failed");
        Vec::new()
    });

    let heads = sqlx::query_scalar::<_, Option<String>>(
        "SELECT e.email FROM employees e JOIN divisions d ON d.head_id = e.id",
    )
    .fetch_all(pool)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "reminder head lookup failed");
        Vec::new()
    });

    spawn_notice(
        notifier,
        Notice {
            kind: NoticeKind::Reminder,
            to: to.clone(),
            cc: reminder_cc_list(&to, &peers, &heads),
            request_id: req.id,
            summary: summary_of(req),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cc_list_dedupes_and_excludes_the_to_recipient() {
        let peers = vec![
            Some("a@x.test".to_string()),
            Some("b@x.test".to_string()),
            None,
            Some("head@x.test".to_string()),
        ];
        let heads = vec![
            Some("head@x.test".to_string()),
            Some("b@x.test".to_string()),
            Some(String::new()),
        ];
        let cc = reminder_cc_list("head@x.test", &peers, &heads);
        assert_eq!(cc, vec!["a@x.test".to_string(), "b@x.test".to_string()]);
    }
}
