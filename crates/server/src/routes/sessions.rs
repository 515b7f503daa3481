use crate::{
    dtos::{
        parse_variant,
        reschedule::{RescheduleRequestResponse, SubmitRescheduleBody},
        session::{AttendanceResponse, MarkAttendanceBody, SessionResponse, TransitionBody},
    },
    error::{AppError, ErrorBody},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use database::services::{
    attendance::AttendanceService,
    lifecycle::{LifecycleService, TransitionRequest},
    reschedule::{RescheduleService, RescheduleSubmission},
};
use uuid::Uuid;

/// Apply a lifecycle action to a session
#[utoipa::path(
    post,
    path = "/sessions/{id}/transitions",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = TransitionBody,
    responses(
        (status = 200, description = "Session after the transition", body = SessionResponse),
        (status = 403, description = "Actor may not take this action", body = ErrorBody),
        (status = 409, description = "A guard failed or another writer got there first", body = ErrorBody)
    ),
    tag = "Sessions"
)]
pub async fn transition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<SessionResponse>, AppError> {
    let request = TransitionRequest {
        session_id: id,
        action: parse_variant("action", &body.action)?,
        actor_id: body.actor_id,
        reason: body.reason,
    };

    let session = LifecycleService::transition(
        &state.db,
        state.notifier.as_ref(),
        &state.policy,
        request,
        Utc::now(),
    )
    .await?;
    Ok(Json(session.into()))
}

/// Mark a participant present or absent
#[utoipa::path(
    post,
    path = "/sessions/{id}/attendance",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = MarkAttendanceBody,
    responses(
        (status = 200, description = "Updated attendance record", body = AttendanceResponse),
        (status = 403, description = "Students can only mark themselves", body = ErrorBody),
        (status = 409, description = "Session already finished", body = ErrorBody)
    ),
    tag = "Sessions"
)]
pub async fn mark_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MarkAttendanceBody>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let status = parse_variant("attendance status", &body.status)?;
    let record = AttendanceService::mark(
        &state.db,
        &state.policy,
        body.actor_id,
        id,
        body.party_id,
        status,
        Utc::now(),
    )
    .await?;

    Ok(Json(record.into()))
}

/// List attendance records of a session
#[utoipa::path(
    get,
    path = "/sessions/{id}/attendance",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Attendance records", body = Vec<AttendanceResponse>),
        (status = 404, description = "Session not found", body = ErrorBody)
    ),
    tag = "Sessions"
)]
pub async fn list_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    let records = AttendanceService::list(&state.db, id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Ask for a session to be moved
#[utoipa::path(
    post,
    path = "/sessions/{id}/reschedule-requests",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = SubmitRescheduleBody,
    responses(
        (status = 201, description = "Request filed", body = RescheduleRequestResponse),
        (status = 400, description = "Empty reason or start not in the future", body = ErrorBody),
        (status = 409, description = "Session already started or has a pending request", body = ErrorBody)
    ),
    tag = "Reschedules"
)]
pub async fn submit_reschedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitRescheduleBody>,
) -> Result<(StatusCode, Json<RescheduleRequestResponse>), AppError> {
    let submission = RescheduleSubmission {
        session_id: id,
        requester_id: body.requester_id,
        reason: body.reason,
        requested_start_at: body.requested_start_at,
    };

    let request =
        RescheduleService::submit(&state.db, &state.policy, submission, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}
