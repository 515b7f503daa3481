use crate::{
    dtos::{
        parse_variant,
        reschedule::{
            PendingQuery, RescheduleRequestResponse, ResolutionResponse, ResolveRescheduleBody,
        },
    },
    error::{AppError, ErrorBody},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use database::services::reschedule::RescheduleService;
use uuid::Uuid;

/// List pending reschedule requests, oldest first
#[utoipa::path(
    get,
    path = "/reschedule-requests",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pending requests", body = Vec<RescheduleRequestResponse>)
    ),
    tag = "Reschedules"
)]
pub async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<RescheduleRequestResponse>>, AppError> {
    let requests = RescheduleService::list_pending(&state.db, query.session_id).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Approve or reject a pending request
#[utoipa::path(
    post,
    path = "/reschedule-requests/{id}/resolve",
    params(("id" = Uuid, Path, description = "Reschedule request ID")),
    request_body = ResolveRescheduleBody,
    responses(
        (status = 200, description = "Request resolved", body = ResolutionResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 409, description = "Already resolved, or the session can no longer move", body = ErrorBody),
        (status = 410, description = "Requested start has passed; reject and resubmit", body = ErrorBody)
    ),
    tag = "Reschedules"
)]
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolveRescheduleBody>,
) -> Result<Json<ResolutionResponse>, AppError> {
    let decision = parse_variant("decision", &body.decision)?;
    let outcome = RescheduleService::resolve(
        &state.db,
        state.notifier.as_ref(),
        &state.policy,
        id,
        body.approver_id,
        decision,
        Utc::now(),
    )
    .await?;

    Ok(Json(outcome.into()))
}
