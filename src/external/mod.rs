pub mod attachments;
pub mod notify;
