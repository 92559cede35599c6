//! Fire-and-forget notification collaborator.
//!
//! State transitions are announced to whatever sits behind [`Notifier`]
//! (toast layer, mail relay). Delivery is never required for correctness;
//! the engines call [`Notifier::notify`] after the transaction has settled
//! and ignore the outcome.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LeaveSubmitted,
    LeaveSignedOff,
    LeaveApproved,
    LeaveRejected,
    LeaveCancelled,
    LeaveRecalled,
    LeaveSubstituted,
    CreditRequested,
    CreditApproved,
    CreditRejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveEvent {
    pub event_id: String,
    pub kind: EventKind,
    pub employee_id: u64,
    /// Application or credit-request id, depending on the kind.
    pub subject_id: u64,
    pub detail: String,
}

impl LeaveEvent {
    pub fn new(kind: EventKind, employee_id: u64, subject_id: u64, detail: impl Into<String>) -> Self {
        LeaveEvent {
            event_id: Uuid::new_v4().to_string(),
            kind,
            employee_id,
            subject_id,
            detail: detail.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: LeaveEvent);
}

/// Default sink: structured log lines that downstream collectors can ship.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: LeaveEvent) {
        tracing::info!(
            event_id = %event.event_id,
            kind = ?event.kind,
            employee_id = event.employee_id,
            subject_id = event.subject_id,
            detail = %event.detail,
            "leave event"
        );
    }
}

#[cfg(test)]
pub mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Captures events for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub events: Mutex<Vec<LeaveEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: LeaveEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
