pub mod analytics;
pub mod balance;
pub mod credit;
pub mod employee;
pub mod holiday;
pub mod leave;
pub mod leave_type;
