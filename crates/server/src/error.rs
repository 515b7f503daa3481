use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use database::SchedulingError;
use log::error;
use models::ValidationError;
use serde::Serialize;
use utoipa::ToSchema;

/// Body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "precondition_failed")]
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub enum AppError {
    Scheduling(SchedulingError),
    /// The work was handed to a task that never reported back
    Internal(String),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        Self::Scheduling(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Scheduling(err.into())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        let Self::Scheduling(err) = self else {
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal");
        };

        match err {
            SchedulingError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            SchedulingError::PreconditionFailed(_) => (StatusCode::CONFLICT, "precondition_failed"),
            SchedulingError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            SchedulingError::Expired { .. } => (StatusCode::GONE, "expired"),
            SchedulingError::PartialFailure { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "partial_failure")
            }
            SchedulingError::DeadlineExceeded { .. } => {
                (StatusCode::REQUEST_TIMEOUT, "deadline_exceeded")
            }
            SchedulingError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            SchedulingError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            SchedulingError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            Self::Scheduling(err) => err.to_string(),
            Self::Internal(message) => message.clone(),
        };
        if status.is_server_error() {
            error!("{code}: {message}");
        }

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
