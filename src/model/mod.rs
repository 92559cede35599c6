pub mod application;
pub mod balance;
pub mod credit;
pub mod employee;
pub mod holiday;
pub mod leave_type;

pub use application::{DurationType, LeaveApplication, LeaveStatus};
pub use balance::{CreditBucket, LeaveBalance};
pub use credit::{CreditStatus, LeaveCreditRequest};
pub use employee::{Caller, EmployeeProfile, Gender, Role};
pub use holiday::{HolidayType, PublicHoliday};
pub use leave_type::{AccrualMethod, GenderEligibility, LeaveKind, LeaveType, NewLeaveType};
