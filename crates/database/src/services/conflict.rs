use crate::{
    entities::{attendance_record, class, class_participant, session},
    error::SchedulingError,
    services::class::ClassService,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use futures::future::{try_join, try_join_all};
use log::debug;
use models::{
    ValidationError,
    conflict::{Commitment, Interval, Overlap, find_overlaps},
    schedule::{DateRange, WeeklySchedule, expand},
    status::SessionStatus,
    time::parse_timezone,
};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A proposed weekly template to check against existing commitments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSchedule {
    pub schedule: WeeklySchedule,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone: String,
    /// Ignore this class's sessions, for checking a class against itself
    #[serde(default)]
    pub exclude_class_id: Option<Uuid>,
}

impl CandidateSchedule {
    /// The concrete intervals the candidate would occupy
    pub fn intervals(&self) -> Result<Vec<Interval>, ValidationError> {
        let zone = parse_timezone(&self.timezone)?;
        let range = DateRange::new(self.start_date, self.end_date)?;
        self.schedule.validate()?;

        Ok(expand(&self.schedule, range, zone)
            .into_iter()
            .map(|o| Interval::new(o.start, o.end))
            .collect())
    }
}

/// An existing commitment of a party overlapping the candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub party_id: Uuid,
    pub class_id: Uuid,
    /// `None` when the commitment is a future occurrence not yet generated
    pub conflicting_session_id: Option<Uuid>,
    pub existing_start: DateTime<Utc>,
    pub existing_end: DateTime<Utc>,
    pub overlap_start: DateTime<Utc>,
    pub overlap_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentCheck {
    pub candidate: CandidateSchedule,
    #[serde(default)]
    pub teacher_ids: Vec<Uuid>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

/// Conflicts per side of an assignment; both sides are always checked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentConflicts {
    pub teachers: Vec<ConflictReport>,
    pub students: Vec<ConflictReport>,
}

impl AssignmentConflicts {
    pub fn is_empty(&self) -> bool {
        self.teachers.is_empty() && self.students.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CommitmentKey {
    class_id: Uuid,
    session_id: Option<Uuid>,
    start: DateTime<Utc>,
}

pub struct ConflictService;

impl ConflictService {
    /// Reports every existing session of `party_id` that the candidate
    /// overlaps, across all of their classes. Advisory only.
    pub async fn check_conflicts(
        db: &DatabaseConnection,
        party_id: Uuid,
        candidate: &CandidateSchedule,
    ) -> Result<Vec<ConflictReport>, SchedulingError> {
        let intervals = candidate.intervals()?;
        Ok(Self::check_intervals(db, party_id, &intervals, candidate.exclude_class_id).await?)
    }

    /// Checks every teacher and every student independently and concurrently
    pub async fn check_assignment(
        db: &DatabaseConnection,
        check: &AssignmentCheck,
    ) -> Result<AssignmentConflicts, SchedulingError> {
        let intervals = check.candidate.intervals()?;
        let exclude = check.candidate.exclude_class_id;

        let (teachers, students) = try_join(
            Self::check_parties(db, &check.teacher_ids, &intervals, exclude),
            Self::check_parties(db, &check.student_ids, &intervals, exclude),
        )
        .await?;

        Ok(AssignmentConflicts { teachers, students })
    }

    /// The candidate describing an existing class, excluding the class itself
    pub async fn candidate_for_class(
        db: &DatabaseConnection,
        class_id: Uuid,
    ) -> Result<CandidateSchedule, SchedulingError> {
        let class = ClassService::find_class(db, class_id).await?;
        let schedule = ClassService::template(db, class_id).await?;

        Ok(CandidateSchedule {
            schedule,
            start_date: class.start_date,
            end_date: class.end_date,
            timezone: class.timezone,
            exclude_class_id: Some(class_id),
        })
    }

    async fn check_parties(
        db: &DatabaseConnection,
        party_ids: &[Uuid],
        intervals: &[Interval],
        exclude_class_id: Option<Uuid>,
    ) -> Result<Vec<ConflictReport>, DbErr> {
        let per_party = try_join_all(
            party_ids
                .iter()
                .map(|party_id| Self::check_intervals(db, *party_id, intervals, exclude_class_id)),
        )
        .await?;
        Ok(per_party.into_iter().flatten().collect())
    }

    async fn check_intervals(
        db: &DatabaseConnection,
        party_id: Uuid,
        intervals: &[Interval],
        exclude_class_id: Option<Uuid>,
    ) -> Result<Vec<ConflictReport>, DbErr> {
        let Some(window) = span(intervals) else {
            return Ok(Vec::new());
        };

        let mut commitments = Self::materialised(db, party_id, window, exclude_class_id).await?;
        commitments.extend(Self::projected(db, party_id, window, exclude_class_id).await?);

        let reports: Vec<ConflictReport> = find_overlaps(intervals, &commitments)
            .into_iter()
            .map(|overlap| report(party_id, overlap))
            .collect();
        debug!(
            "Party {party_id}: {} commitments in window, {} conflicts",
            commitments.len(),
            reports.len()
        );
        Ok(reports)
    }

    /// Generated sessions the party is expected at. Cancelled sessions do
    /// not occupy time.
    async fn materialised(
        db: &DatabaseConnection,
        party_id: Uuid,
        window: Interval,
        exclude_class_id: Option<Uuid>,
    ) -> Result<Vec<Commitment<CommitmentKey>>, DbErr> {
        let mut query = attendance_record::Entity::find()
            .filter(attendance_record::Column::PartyId.eq(party_id))
            .find_also_related(session::Entity)
            .filter(session::Column::StartAt.lt(window.end))
            .filter(session::Column::EndAt.gt(window.start))
            .filter(session::Column::Status.ne(SessionStatus::Cancelled.to_string()));
        if let Some(excluded) = exclude_class_id {
            query = query.filter(session::Column::ClassId.ne(excluded));
        }

        Ok(query
            .all(db)
            .await?
            .into_iter()
            .filter_map(|(_, session)| session)
            .map(|session| Commitment {
                key: CommitmentKey {
                    class_id: session.class_id,
                    session_id: Some(session.id),
                    start: session.start_at,
                },
                interval: session.interval(),
            })
            .collect())
    }

    /// Occurrences of the party's classes past their generated window
    async fn projected(
        db: &DatabaseConnection,
        party_id: Uuid,
        window: Interval,
        exclude_class_id: Option<Uuid>,
    ) -> Result<Vec<Commitment<CommitmentKey>>, DbErr> {
        let class_ids: Vec<Uuid> = class_participant::Entity::find()
            .filter(class_participant::Column::PartyId.eq(party_id))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.class_id)
            .filter(|id| Some(*id) != exclude_class_id)
            .collect();
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }

        let classes = class::Entity::find()
            .filter(class::Column::Id.is_in(class_ids))
            .filter(class::Column::Archived.eq(false))
            .all(db)
            .await?;

        let per_class = try_join_all(
            classes
                .into_iter()
                .map(|class| Self::project_class(db, class, window)),
        )
        .await?;
        Ok(per_class.into_iter().flatten().collect())
    }

    async fn project_class(
        db: &DatabaseConnection,
        class: class::Model,
        window: Interval,
    ) -> Result<Vec<Commitment<CommitmentKey>>, DbErr> {
        let from = match class.generated_through {
            Some(last) if last >= class.end_date => return Ok(Vec::new()),
            Some(last) => last.checked_add_days(Days::new(1)).unwrap_or(last),
            None => class.start_date,
        };
        let Some(remaining) = DateRange::new(from, class.end_date)
            .ok()
            .and_then(|r| r.intersect(&local_dates(window)))
        else {
            return Ok(Vec::new());
        };

        let zone: Tz = parse_timezone(&class.timezone).map_err(|e| DbErr::Type(e.to_string()))?;
        let schedule = ClassService::template(db, class.id).await?;

        Ok(expand(&schedule, remaining, zone)
            .into_iter()
            .map(|o| Commitment {
                key: CommitmentKey {
                    class_id: class.id,
                    session_id: None,
                    start: o.start,
                },
                interval: Interval::new(o.start, o.end),
            })
            .filter(|c| c.interval.overlaps(&window))
            .collect())
    }
}

/// Smallest interval covering all of `intervals`
fn span(intervals: &[Interval]) -> Option<Interval> {
    let start = intervals.iter().map(|i| i.start).min()?;
    let end = intervals.iter().map(|i| i.end).max()?;
    Some(Interval::new(start, end))
}

/// Every calendar date an instant in `window` can fall on in any zone
fn local_dates(window: Interval) -> DateRange {
    let start = window.start.date_naive();
    let end = window.end.date_naive();
    DateRange {
        start: start.checked_sub_days(Days::new(1)).unwrap_or(start),
        end: end.checked_add_days(Days::new(1)).unwrap_or(end),
    }
}

fn report(party_id: Uuid, overlap: Overlap<CommitmentKey>) -> ConflictReport {
    ConflictReport {
        party_id,
        class_id: overlap.key.class_id,
        conflicting_session_id: overlap.key.session_id,
        existing_start: overlap.existing.start,
        existing_end: overlap.existing.end,
        overlap_start: overlap.overlap.start,
        overlap_end: overlap.overlap.end,
    }
}
