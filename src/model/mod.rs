pub mod division;
pub mod employee;
pub mod leave_balance;
pub mod leave_request;
pub mod role;
