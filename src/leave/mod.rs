pub mod approver;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod recap;
pub mod rules;
pub mod workdays;
