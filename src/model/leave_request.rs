use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Maternity,
    Menstrual,
    Marriage,
    Unpaid,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Paid/unpaid is derived from the type, never stored independently.
    pub fn is_paid(&self) -> bool {
        !matches!(self, LeaveType::Unpaid)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

/// Per-stage audit value (supervisor / division head columns).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Attachment entry stored as a JSON list on the request. Tagged union so
/// read-time handling is exhaustive instead of stringly dispatched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    File {
        /// Opaque store key
        path: String,
        filename: String,
        size: u64,
        mime_type: String,
    },
    Url {
        url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "annual", value_type = String)]
    pub leave_type: String,
    pub is_paid: bool,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3.0)]
    pub total_days: f64,
    #[schema(example = "Family event", nullable = true)]
    pub reason: Option<String>,
    /// JSON list of Attachment entries
    #[schema(value_type = String, nullable = true)]
    pub attachments: Option<String>,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    #[schema(example = 5, nullable = true)]
    pub current_approver_id: Option<u64>,
    /// Supervisor snapshot taken at submission time
    #[schema(example = 5, nullable = true)]
    pub supervisor_id: Option<u64>,
    #[schema(example = "approved", value_type = String, nullable = true)]
    pub supervisor_status: Option<String>,
    pub supervisor_comment: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub supervisor_action_at: Option<DateTime<Utc>>,
    #[schema(example = "approved", value_type = String, nullable = true)]
    pub division_head_status: Option<String>,
    pub division_head_comment: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub division_head_action_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn leave_type(&self) -> Option<LeaveType> {
        self.leave_type.parse().ok()
    }

    pub fn status(&self) -> Option<LeaveStatus> {
        self.status.parse().ok()
    }

    pub fn supervisor_approved(&self) -> bool {
        self.supervisor_status.as_deref() == Some(ApprovalStatus::Approved.as_str())
    }

    pub fn division_head_approved(&self) -> bool {
        self.division_head_status.as_deref() == Some(ApprovalStatus::Approved.as_str())
    }

    /// Parses the attachment blob; malformed or absent blobs read as empty.
    pub fn attachment_list(&self) -> Vec<Attachment> {
        self.attachments
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_type_round_trips_through_db_strings() {
        assert_eq!(LeaveType::Annual.as_str(), "annual");
        assert_eq!("menstrual".parse::<LeaveType>().unwrap(), LeaveType::Menstrual);
        assert!("holiday".parse::<LeaveType>().is_err());
    }

    #[test]
    fn unpaid_is_the_only_unpaid_type() {
        assert!(!LeaveType::Unpaid.is_paid());
        assert!(LeaveType::Annual.is_paid());
        assert!(LeaveType::Maternity.is_paid());
    }

    #[test]
    fn attachment_union_is_tagged() {
        let raw = r#"[{"type":"file","path":"k1","filename":"note.pdf","size":10,"mime_type":"application/pdf"},{"type":"url","url":"https://x.test/doc"}]"#;
        let parsed: Vec<Attachment> = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed[0], Attachment::File { .. }));
        assert!(matches!(parsed[1], Attachment::Url { .. }));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!LeaveStatus::Pending.is_terminal());
        assert!(LeaveStatus::Approved.is_terminal());
        assert!(LeaveStatus::Rejected.is_terminal());
        assert!(LeaveStatus::Cancelled.is_terminal());
    }
}
