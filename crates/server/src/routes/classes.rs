use crate::{
    dtos::{
        class::{
            AddParticipantRequest, AdminQuery, AdminRequest, ClassDetailsResponse, ClassResponse,
            CreateClassRequest, CreatedClassResponse, ExtendSessionsRequest, ParticipantResponse,
            UpcomingQuery,
        },
        parse_variant,
        session::SessionResponse,
    },
    error::{AppError, ErrorBody},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use database::services::{
    class::ClassService,
    generator::{ClassDraft, GeneratorService},
};
use uuid::Uuid;

/// Create a class and generate its sessions
#[utoipa::path(
    post,
    path = "/classes",
    request_body = CreateClassRequest,
    responses(
        (status = 201, description = "Class created with its first window of sessions", body = CreatedClassResponse),
        (status = 400, description = "Invalid draft", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 408, description = "Deadline passed; nothing was kept", body = ErrorBody),
        (status = 500, description = "Generation failed and was rolled back", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn create_class(
    State(state): State<AppState>,
    Json(body): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<CreatedClassResponse>), AppError> {
    let draft = ClassDraft {
        title: body.title,
        subject: body.subject,
        timezone: body.timezone,
        start_date: body.start_date,
        end_date: body.end_date,
        schedule: body.schedule.try_into()?,
        teacher_ids: body.teacher_ids,
        student_ids: body.student_ids,
    };

    // Detached so that a timed-out request still gets its rows rolled back
    let admin_id = body.admin_id;
    let deadline = state.deadline();
    let generated = tokio::spawn(async move {
        GeneratorService::generate_sessions_within(
            &state.db,
            &state.policy,
            admin_id,
            draft,
            Utc::now(),
            Some(deadline),
        )
        .await
    })
    .await
    .map_err(|e| AppError::Internal(format!("class generation task failed: {e}")))??;

    Ok((StatusCode::CREATED, Json(generated.into())))
}

/// Get a class with its weekly template and participants
#[utoipa::path(
    get,
    path = "/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class found", body = ClassDetailsResponse),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClassDetailsResponse>, AppError> {
    let details = ClassService::get_class(&state.db, id).await?;
    Ok(Json(details.into()))
}

/// Delete a class and everything belonging to it
#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID"), AdminQuery),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AdminQuery>,
) -> Result<StatusCode, AppError> {
    ClassService::delete_class(&state.db, query.admin_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generate sessions for the next window of a class
#[utoipa::path(
    post,
    path = "/classes/{id}/extend",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = ExtendSessionsRequest,
    responses(
        (status = 200, description = "Newly generated sessions, possibly none", body = Vec<SessionResponse>),
        (status = 409, description = "Class is archived or being extended concurrently", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn extend_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ExtendSessionsRequest>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let deadline = state.deadline();
    let sessions = tokio::spawn(async move {
        GeneratorService::extend_sessions_within(
            &state.db,
            &state.policy,
            body.admin_id,
            id,
            body.through,
            Utc::now(),
            Some(deadline),
        )
        .await
    })
    .await
    .map_err(|e| AppError::Internal(format!("session extension task failed: {e}")))??;

    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// Assign a teacher or student to a class
#[utoipa::path(
    post,
    path = "/classes/{id}/participants",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = AddParticipantRequest,
    responses(
        (status = 201, description = "Participant added", body = ParticipantResponse),
        (status = 409, description = "Already assigned, or class archived", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn add_participant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddParticipantRequest>,
) -> Result<(StatusCode, Json<ParticipantResponse>), AppError> {
    let role = parse_variant("role", &body.role)?;
    let participant = ClassService::add_participant(
        &state.db,
        body.admin_id,
        id,
        body.party_id,
        role,
        Utc::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(participant.into())))
}

/// Unassign a participant from a class
#[utoipa::path(
    delete,
    path = "/classes/{id}/participants/{party_id}",
    params(
        ("id" = Uuid, Path, description = "Class ID"),
        ("party_id" = Uuid, Path, description = "Participant's profile ID"),
        AdminQuery
    ),
    responses(
        (status = 204, description = "Participant removed"),
        (status = 404, description = "Not a participant of this class", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn remove_participant(
    State(state): State<AppState>,
    Path((id, party_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<AdminQuery>,
) -> Result<StatusCode, AppError> {
    ClassService::remove_participant(&state.db, query.admin_id, id, party_id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Archive a class
#[utoipa::path(
    post,
    path = "/classes/{id}/archive",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = AdminRequest,
    responses(
        (status = 200, description = "Class archived", body = ClassResponse),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn archive_class(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdminRequest>,
) -> Result<Json<ClassResponse>, AppError> {
    let class = ClassService::archive_class(&state.db, body.admin_id, id).await?;
    Ok(Json(class.into()))
}

/// List every session of a class, earliest first
#[utoipa::path(
    get,
    path = "/classes/{id}/sessions",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Sessions of the class", body = Vec<SessionResponse>),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    tag = "Classes"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let sessions = ClassService::list_sessions(&state.db, id).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// Upcoming sessions a teacher or student is expected at
#[utoipa::path(
    get,
    path = "/parties/{id}/sessions",
    params(("id" = Uuid, Path, description = "Profile ID"), UpcomingQuery),
    responses(
        (status = 200, description = "Sessions that have not ended and are not cancelled", body = Vec<SessionResponse>)
    ),
    tag = "Classes"
)]
pub async fn list_party_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let after = query.after.unwrap_or_else(Utc::now);
    let sessions = ClassService::list_party_sessions(&state.db, id, after).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}
