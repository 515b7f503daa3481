//! Hooks fired after a state change has been committed.

use chrono::{DateTime, Utc};
use log::info;
use models::status::SessionStatus;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged {
        session_id: Uuid,
        class_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        actor_id: Uuid,
        at: DateTime<Utc>,
    },
    RescheduleApproved {
        request_id: Uuid,
        session_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        approver_id: Uuid,
    },
    RescheduleRejected {
        request_id: Uuid,
        session_id: Uuid,
        approver_id: Uuid,
    },
}

/// Receives events once the write that caused them is durable.
/// Implementations must not block; delivery failures are theirs to handle.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &SessionEvent);
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &SessionEvent) {
        match event {
            SessionEvent::StatusChanged {
                session_id,
                from,
                to,
                actor_id,
                ..
            } => info!("Session {session_id}: {from} -> {to} by {actor_id}"),
            SessionEvent::RescheduleApproved {
                request_id,
                session_id,
                start_at,
                end_at,
                ..
            } => info!(
                "Reschedule {request_id} approved, session {session_id} moved to {start_at} - {end_at}"
            ),
            SessionEvent::RescheduleRejected {
                request_id,
                session_id,
                ..
            } => info!("Reschedule {request_id} for session {session_id} rejected"),
        }
    }
}
