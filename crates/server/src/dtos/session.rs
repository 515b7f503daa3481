use chrono::{DateTime, Utc};
use database::entities::{attendance_record, session};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub class_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[schema(example = "scheduled")]
    pub status: String,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub actual_start_at: Option<DateTime<Utc>>,
    pub actual_end_at: Option<DateTime<Utc>>,
    pub reschedule_pending: bool,
}

impl From<session::Model> for SessionResponse {
    fn from(session: session::Model) -> Self {
        Self {
            id: session.id,
            class_id: session.class_id,
            start_at: session.start_at,
            end_at: session.end_at,
            status: session.status,
            cancellation_reason: session.cancellation_reason,
            cancelled_by: session.cancelled_by,
            actual_start_at: session.actual_start_at,
            actual_end_at: session.actual_end_at,
            reschedule_pending: session.reschedule_pending,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionBody {
    pub actor_id: Uuid,
    /// One of initiate, start, end, cancel, mark_absence
    #[schema(example = "initiate")]
    pub action: String,
    /// Required when a teacher cancels
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendanceBody {
    pub actor_id: Uuid,
    pub party_id: Uuid,
    /// present or absent
    #[schema(example = "present")]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub session_id: Uuid,
    pub party_id: Uuid,
    pub party_role: String,
    pub status: String,
    pub marked_at: Option<DateTime<Utc>>,
}

impl From<attendance_record::Model> for AttendanceResponse {
    fn from(record: attendance_record::Model) -> Self {
        Self {
            session_id: record.session_id,
            party_id: record.party_id,
            party_role: record.party_role,
            status: record.status,
            marked_at: record.marked_at,
        }
    }
}
