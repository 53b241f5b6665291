use crate::api::division::{CreateDivision, UpdateDivisionHead};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::leave_balance::BalanceQuery;
use crate::api::leave_request::{
    ApproveLeave, CancelLeave, CreateLeave, LeaveFilter, LeaveListResponse, LeaveSummary,
    RecapLockToggle, RejectLeave, UploadQuery,
};
use crate::external::attachments::StoredAttachment;
use crate::model::employee::Employee;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{Attachment, LeaveRequest};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LeaveHub API",
        version = "1.0.0",
        description = r#"
## Leave administration backend

Employee leave requests with a multi-stage approval workflow
(supervisor → division head → HR fallback) and a per-employee,
per-year leave-balance ledger.

### 🔹 Key Features
- **Leave Requests**
  - Submit, approve, reject, cancel, and delete leave requests
  - Rule validation: quotas, monthly caps, overlaps, type-specific limits
- **Balances**
  - Tenure-prorated annual quota, per-category consumption counters
- **Recap Lock**
  - Freeze approvals during payroll recap windows

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication**.
Role 1 = Admin, role 2 = HR; approval authority otherwise follows the
request's current approver.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::set_recap_lock,
        crate::api::leave_request::upload_attachment,
        crate::api::leave_request::attachment_url,

        crate::api::leave_balance::my_balance,
        crate::api::leave_balance::employee_balance,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,

        crate::api::division::create_division,
        crate::api::division::get_division,
        crate::api::division::set_division_head
    ),
    components(
        schemas(
            CreateLeave,
            ApproveLeave,
            RejectLeave,
            CancelLeave,
            RecapLockToggle,
            LeaveFilter,
            LeaveSummary,
            LeaveListResponse,
            LeaveRequest,
            Attachment,
            StoredAttachment,
            UploadQuery,
            LeaveBalance,
            BalanceQuery,
            CreateEmployee,
            EmployeeQuery,
            Employee,
            EmployeeListResponse,
            CreateDivision,
            UpdateDivisionHead,
            crate::model::division::Division,
            crate::model::employee::Gender,
            crate::model::leave_request::LeaveType
        )
    ),
    tags(
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Balance", description = "Leave balance ledger APIs"),
        (name = "Employee", description = "Employee administration APIs"),
        (name = "Division", description = "Division / approver graph APIs"),
    )
)]
pub struct ApiDoc;
