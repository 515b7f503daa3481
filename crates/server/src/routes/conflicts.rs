use crate::{
    dtos::conflict::{
        AssignmentCheckRequest, AssignmentConflictsResponse, ConflictCheckRequest,
        ConflictResponse,
    },
    error::{AppError, ErrorBody},
    state::AppState,
};
use axum::{Json, extract::State};
use database::services::conflict::{AssignmentCheck, ConflictService};

/// Check one party's commitments against a proposed weekly schedule
#[utoipa::path(
    post,
    path = "/conflicts",
    request_body = ConflictCheckRequest,
    responses(
        (status = 200, description = "Overlapping commitments, empty when free", body = Vec<ConflictResponse>),
        (status = 400, description = "Invalid candidate schedule", body = ErrorBody)
    ),
    tag = "Conflicts"
)]
pub async fn check_conflicts(
    State(state): State<AppState>,
    Json(body): Json<ConflictCheckRequest>,
) -> Result<Json<Vec<ConflictResponse>>, AppError> {
    let candidate = body.candidate.try_into()?;
    let reports = ConflictService::check_conflicts(&state.db, body.party_id, &candidate).await?;
    Ok(Json(reports.into_iter().map(Into::into).collect()))
}

/// Check every proposed teacher and student at once
#[utoipa::path(
    post,
    path = "/conflicts/assignment",
    request_body = AssignmentCheckRequest,
    responses(
        (status = 200, description = "Conflicts per side", body = AssignmentConflictsResponse),
        (status = 400, description = "Invalid candidate schedule", body = ErrorBody)
    ),
    tag = "Conflicts"
)]
pub async fn check_assignment(
    State(state): State<AppState>,
    Json(body): Json<AssignmentCheckRequest>,
) -> Result<Json<AssignmentConflictsResponse>, AppError> {
    let check = AssignmentCheck {
        candidate: body.candidate.try_into()?,
        teacher_ids: body.teacher_ids,
        student_ids: body.student_ids,
    };

    let conflicts = ConflictService::check_assignment(&state.db, &check).await?;
    Ok(Json(conflicts.into()))
}
