use chrono::{DateTime, Utc};
use database::{entities::reschedule_request, services::reschedule::RescheduleOutcome};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::session::SessionResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRescheduleBody {
    pub requester_id: Uuid,
    pub reason: String,
    pub requested_start_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveRescheduleBody {
    pub approver_id: Uuid,
    /// approve or reject
    #[schema(example = "approve")]
    pub decision: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PendingQuery {
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RescheduleRequestResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub requester_id: Uuid,
    pub reason: String,
    pub requested_start_at: DateTime<Utc>,
    #[schema(example = "pending")]
    pub status: String,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<reschedule_request::Model> for RescheduleRequestResponse {
    fn from(request: reschedule_request::Model) -> Self {
        Self {
            id: request.id,
            session_id: request.session_id,
            requester_id: request.requester_id,
            reason: request.reason,
            requested_start_at: request.requested_start_at,
            status: request.status,
            processed_by: request.processed_by,
            processed_at: request.processed_at,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolutionResponse {
    pub request: RescheduleRequestResponse,
    /// The moved session, present when the request was approved
    pub session: Option<SessionResponse>,
}

impl From<RescheduleOutcome> for ResolutionResponse {
    fn from(outcome: RescheduleOutcome) -> Self {
        match outcome {
            RescheduleOutcome::Approved { request, session } => Self {
                request: request.into(),
                session: Some(session.into()),
            },
            RescheduleOutcome::Rejected { request } => Self {
                request: request.into(),
                session: None,
            },
        }
    }
}
