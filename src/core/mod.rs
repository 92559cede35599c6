pub mod analytics;
pub mod calendar;
pub mod credit;
pub mod ledger;
pub mod lifecycle;
pub mod registry;
pub mod workdays;

pub use analytics::Analytics;
pub use calendar::HolidayCalendar;
pub use credit::CreditWorkflow;
pub use ledger::{BalanceLedger, LockMap};
pub use lifecycle::LifecycleEngine;
pub use registry::TypeRegistry;
