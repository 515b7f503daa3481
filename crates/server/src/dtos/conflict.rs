use chrono::{DateTime, NaiveDate, Utc};
use database::services::conflict::{AssignmentConflicts, CandidateSchedule, ConflictReport};
use models::ValidationError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::class::ScheduleDto;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CandidateDto {
    pub schedule: ScheduleDto,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(example = "Europe/London")]
    pub timezone: String,
    /// Skip this class's own sessions
    #[serde(default)]
    pub exclude_class_id: Option<Uuid>,
}

impl TryFrom<CandidateDto> for CandidateSchedule {
    type Error = ValidationError;

    fn try_from(dto: CandidateDto) -> Result<Self, Self::Error> {
        Ok(Self {
            schedule: dto.schedule.try_into()?,
            start_date: dto.start_date,
            end_date: dto.end_date,
            timezone: dto.timezone,
            exclude_class_id: dto.exclude_class_id,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConflictCheckRequest {
    pub party_id: Uuid,
    pub candidate: CandidateDto,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentCheckRequest {
    pub candidate: CandidateDto,
    #[serde(default)]
    pub teacher_ids: Vec<Uuid>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConflictResponse {
    pub party_id: Uuid,
    pub class_id: Uuid,
    /// Absent when the clash is with an occurrence not generated yet
    pub conflicting_session_id: Option<Uuid>,
    pub existing_start: DateTime<Utc>,
    pub existing_end: DateTime<Utc>,
    pub overlap_start: DateTime<Utc>,
    pub overlap_end: DateTime<Utc>,
}

impl From<ConflictReport> for ConflictResponse {
    fn from(report: ConflictReport) -> Self {
        Self {
            party_id: report.party_id,
            class_id: report.class_id,
            conflicting_session_id: report.conflicting_session_id,
            existing_start: report.existing_start,
            existing_end: report.existing_end,
            overlap_start: report.overlap_start,
            overlap_end: report.overlap_end,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentConflictsResponse {
    pub has_conflicts: bool,
    pub teachers: Vec<ConflictResponse>,
    pub students: Vec<ConflictResponse>,
}

impl From<AssignmentConflicts> for AssignmentConflictsResponse {
    fn from(conflicts: AssignmentConflicts) -> Self {
        Self {
            has_conflicts: !conflicts.is_empty(),
            teachers: conflicts.teachers.into_iter().map(Into::into).collect(),
            students: conflicts.students.into_iter().map(Into::into).collect(),
        }
    }
}
