use actix_web::{HttpResponse, http::StatusCode};
use derive_more::{Display, Error};
use serde_json::json;

/// Failure taxonomy for every lifecycle operation. Validation carries the
/// full violation list so the caller sees all broken rules at once, never a
/// partially applied submission.
#[derive(Debug, Display, Error)]
pub enum LeaveError {
    #[display(fmt = "validation failed")]
    Validation {
        #[error(not(source))]
        violations: Vec<String>,
    },

    #[display(fmt = "{} not found", entity)]
    NotFound {
        #[error(not(source))]
        entity: &'static str,
    },

    #[display(fmt = "{}", reason)]
    Conflict {
        #[error(not(source))]
        reason: String,
    },

    #[display(fmt = "{}", reason)]
    Forbidden {
        #[error(not(source))]
        reason: String,
    },

    #[display(fmt = "leave operations are locked for payroll recap")]
    RecapLocked,

    #[display(fmt = "dependency failure: {}", detail)]
    Dependency {
        #[error(not(source))]
        detail: String,
    },
}

impl LeaveError {
    pub fn validation(violations: Vec<String>) -> Self {
        LeaveError::Validation { violations }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        LeaveError::Conflict {
            reason: reason.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        LeaveError::Forbidden {
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(e: sqlx::Error) -> Self {
        LeaveError::Dependency {
            detail: e.to_string(),
        }
    }
}

impl actix_web::ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation { .. } => StatusCode::BAD_REQUEST,
            LeaveError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeaveError::Conflict { .. } => StatusCode::CONFLICT,
            LeaveError::Forbidden { .. } => StatusCode::FORBIDDEN,
            LeaveError::RecapLocked => StatusCode::LOCKED,
            LeaveError::Dependency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            LeaveError::Validation { violations } => json!({
                "message": "Validation failed",
                "violations": violations,
            }),
            // Internal detail stays in the logs
            LeaveError::Dependency { detail } => {
                tracing::error!(error = %detail, "dependency failure");
                json!({ "message": "Internal Server Error" })
            }
            other => json!({ "message": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let v = LeaveError::validation(vec!["x".into()]);
        assert_eq!(v.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            LeaveError::NotFound { entity: "leave request" }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LeaveError::conflict("already processed").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LeaveError::forbidden("not the approver").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(LeaveError::RecapLocked.status_code(), StatusCode::LOCKED);
    }
}
