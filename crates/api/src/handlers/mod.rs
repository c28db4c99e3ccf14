pub mod dashboard;
pub mod dispatch;
pub mod status;
