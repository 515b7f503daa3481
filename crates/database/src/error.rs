use chrono::{DateTime, Utc};
use models::{ValidationError, lifecycle::GuardError};
use sea_orm::DbErr;
use uuid::Uuid;

/// Errors returned by the scheduling services
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    PreconditionFailed(String),

    /// Another writer changed the row between our read and our write
    #[error("{entity} {id} was modified concurrently, reload and retry")]
    ConcurrencyConflict { entity: &'static str, id: Uuid },

    #[error(
        "reschedule request {request_id} asked for {requested_start}, which is no longer in the future; \
         reject it and submit a new request"
    )]
    Expired {
        request_id: Uuid,
        requested_start: DateTime<Utc>,
    },

    #[error("class {class_id} could not be fully created ({source}); rolled back: {rolled_back}")]
    PartialFailure {
        class_id: Uuid,
        rolled_back: bool,
        #[source]
        source: DbErr,
    },

    /// The caller's deadline passed before the work finished; nothing it wrote was kept
    #[error("class {class_id} was not saved because the request deadline passed; rolled back: {rolled_back}")]
    DeadlineExceeded { class_id: Uuid, rolled_back: bool },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0}")]
    PermissionDenied(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl From<GuardError> for SchedulingError {
    fn from(err: GuardError) -> Self {
        Self::PreconditionFailed(err.to_string())
    }
}

impl SchedulingError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn conflict(entity: &'static str, id: Uuid) -> Self {
        Self::ConcurrencyConflict { entity, id }
    }
}
