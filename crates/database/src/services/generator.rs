use crate::{
    config::SchedulingPolicy,
    entities::{attendance_record, class, class_participant, class_slot, profile, session},
    error::SchedulingError,
    services::{actor::ActorService, class::ClassService},
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use futures::future::try_join_all;
use log::{error, info, warn};
use models::{
    ValidationError,
    days::weekday_to_index,
    schedule::{DateRange, Occurrence, WeeklySchedule, expand},
    status::{AttendanceStatus, PartyRole, SessionStatus},
    time::{local_date, parse_timezone},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Instant};
use uuid::Uuid;

/// Everything an administrator supplies to create a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDraft {
    pub title: String,
    pub subject: String,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub schedule: WeeklySchedule,
    #[serde(default)]
    pub teacher_ids: Vec<Uuid>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

impl ClassDraft {
    /// Checks the draft and resolves its zone and date range
    pub fn validate(&self) -> Result<(Tz, DateRange), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        let zone = parse_timezone(&self.timezone)?;
        let range = DateRange::new(self.start_date, self.end_date)?;
        self.schedule.validate()?;

        let teachers: HashSet<_> = self.teacher_ids.iter().collect();
        if let Some(both) = self.student_ids.iter().find(|id| teachers.contains(id)) {
            return Err(ValidationError::Invalid(format!(
                "{both} is listed as both a teacher and a student"
            )));
        }

        Ok((zone, range))
    }

    /// Assigned parties in order, without duplicates
    pub fn participants(&self) -> Vec<(Uuid, PartyRole)> {
        let mut seen = HashSet::new();
        let teachers = self.teacher_ids.iter().map(|id| (*id, PartyRole::Teacher));
        let students = self.student_ids.iter().map(|id| (*id, PartyRole::Student));

        teachers
            .chain(students)
            .filter(|(id, _)| seen.insert(*id))
            .collect()
    }
}

/// A newly created class and what was written for it
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedClass {
    pub class: class::Model,
    pub slots: Vec<class_slot::Model>,
    pub participants: Vec<class_participant::Model>,
    pub sessions: Vec<session::Model>,
}

pub struct GeneratorService;

impl GeneratorService {
    /// Creates a class and materialises its sessions up to the policy horizon.
    ///
    /// Any failure after the class row is written deletes everything written
    /// for the class and returns `PartialFailure`.
    pub async fn generate_sessions(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        admin_id: Uuid,
        draft: ClassDraft,
        now: DateTime<Utc>,
    ) -> Result<GeneratedClass, SchedulingError> {
        Self::generate_sessions_within(db, policy, admin_id, draft, now, None).await
    }

    /// [`Self::generate_sessions`] bounded by a caller deadline. If the
    /// deadline has passed once everything is written, the class is deleted
    /// again and `DeadlineExceeded` is returned.
    pub async fn generate_sessions_within(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        admin_id: Uuid,
        draft: ClassDraft,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<GeneratedClass, SchedulingError> {
        ActorService::require_admin(db, admin_id).await?;
        let (zone, range) = draft.validate()?;
        let participants = draft.participants();
        Self::ensure_profiles_exist(db, &participants).await?;

        let through = Self::window_end(range, zone, policy, now);
        let class = class::Model {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            subject: draft.subject.trim().to_string(),
            timezone: draft.timezone.clone(),
            start_date: range.start,
            end_date: range.end,
            days_pattern: draft.schedule.days().to_string(),
            generated_through: Some(through),
            archived: false,
            created_at: now,
        };
        let class_id = class.id;

        class::Entity::insert(class.clone().into_active_model().reset_all())
            .exec(db)
            .await?;
        info!("Created class {class_id} ({}), generating through {through}", class.title);

        match Self::populate(db, policy, &class, &draft.schedule, zone, &participants, now).await {
            Ok(_) if is_past(deadline) => {
                warn!("Deadline passed while generating class {class_id}, rolling back");
                let rolled_back = Self::compensate_class(db, class_id).await;
                Err(SchedulingError::DeadlineExceeded {
                    class_id,
                    rolled_back,
                })
            }
            Ok((slots, participants, sessions)) => {
                info!(
                    "Class {class_id}: wrote {} sessions for {} participants",
                    sessions.len(),
                    participants.len()
                );
                Ok(GeneratedClass {
                    class,
                    slots,
                    participants,
                    sessions,
                })
            }
            Err(source) => {
                error!("Failed to populate class {class_id}: {source}, rolling back");
                let rolled_back = Self::compensate_class(db, class_id).await;
                Err(SchedulingError::PartialFailure {
                    class_id,
                    rolled_back,
                    source,
                })
            }
        }
    }

    /// Materialises sessions for a class up to `through` (capped at the
    /// class's end date). Already generated dates are skipped, so repeated
    /// calls are harmless.
    pub async fn extend_sessions(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        admin_id: Uuid,
        class_id: Uuid,
        through: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<session::Model>, SchedulingError> {
        Self::extend_sessions_within(db, policy, admin_id, class_id, through, now, None).await
    }

    /// [`Self::extend_sessions`] bounded by a caller deadline, undone like a
    /// failed write if the deadline has passed once the window is written
    pub async fn extend_sessions_within(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        admin_id: Uuid,
        class_id: Uuid,
        through: NaiveDate,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<Vec<session::Model>, SchedulingError> {
        ActorService::require_admin(db, admin_id).await?;
        let class = ClassService::find_class(db, class_id).await?;
        if class.archived {
            return Err(SchedulingError::PreconditionFailed(format!(
                "class {class_id} is archived"
            )));
        }

        let from = match class.generated_through {
            Some(last) => last.checked_add_days(Days::new(1)).unwrap_or(last),
            None => class.start_date,
        };
        let until = through.min(class.end_date);
        if from > until {
            return Ok(Vec::new());
        }

        let zone = parse_timezone(&class.timezone)?;
        let schedule = ClassService::template(db, class_id).await?;
        let participants = ClassService::participants(db, class_id)
            .await?
            .into_iter()
            .map(|p| Ok((p.party_id, parse_role(&p.role)?)))
            .collect::<Result<Vec<_>, DbErr>>()?;

        // Claim the window first so two extensions never generate the same dates
        let claimed = class::Entity::update_many()
            .col_expr(class::Column::GeneratedThrough, Expr::value(until))
            .filter(class::Column::Id.eq(class_id))
            .filter(match class.generated_through {
                Some(last) => class::Column::GeneratedThrough.eq(last),
                None => class::Column::GeneratedThrough.is_null(),
            })
            .exec(db)
            .await?;
        if claimed.rows_affected == 0 {
            warn!("Class {class_id}: lost the race to extend through {until}");
            return Err(SchedulingError::conflict("class", class_id));
        }

        let occurrences = expand(&schedule, DateRange { start: from, end: until }, zone);
        let (sessions, records) = Self::draft_rows(class_id, &occurrences, &participants, now);

        match Self::insert_sessions(db, policy, &sessions, &records).await {
            Ok(()) if is_past(deadline) => {
                warn!("Deadline passed while extending class {class_id}, rolling back");
                let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
                let rolled_back =
                    Self::compensate_extension(db, class_id, &ids, class.generated_through).await;
                Err(SchedulingError::DeadlineExceeded {
                    class_id,
                    rolled_back,
                })
            }
            Ok(()) => {
                info!(
                    "Class {class_id}: extended from {from} through {until}, {} new sessions",
                    sessions.len()
                );
                Ok(sessions)
            }
            Err(source) => {
                error!("Failed to extend class {class_id}: {source}, rolling back");
                let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
                let rolled_back =
                    Self::compensate_extension(db, class_id, &ids, class.generated_through).await;
                Err(SchedulingError::PartialFailure {
                    class_id,
                    rolled_back,
                    source,
                })
            }
        }
    }

    /// The last local date generated up front: the horizon past today (or
    /// past the start, for classes that begin later), capped at the end date
    pub fn window_end(
        range: DateRange,
        zone: Tz,
        policy: &SchedulingPolicy,
        now: DateTime<Utc>,
    ) -> NaiveDate {
        let from = local_date(now, zone).max(range.start);
        let horizon = from
            .checked_add_days(Days::new(u64::from(policy.horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        range.end.min(horizon)
    }

    async fn populate(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        class: &class::Model,
        schedule: &WeeklySchedule,
        zone: Tz,
        participants: &[(Uuid, PartyRole)],
        now: DateTime<Utc>,
    ) -> Result<
        (
            Vec<class_slot::Model>,
            Vec<class_participant::Model>,
            Vec<session::Model>,
        ),
        DbErr,
    > {
        let slots: Vec<class_slot::Model> = schedule
            .slots()
            .map(|(weekday, slot)| class_slot::Model {
                id: Uuid::new_v4(),
                class_id: class.id,
                weekday: weekday_to_index(weekday),
                start_time: slot.start,
                end_time: slot.end,
            })
            .collect();

        let members: Vec<class_participant::Model> = participants
            .iter()
            .map(|(party_id, role)| class_participant::Model {
                id: Uuid::new_v4(),
                class_id: class.id,
                party_id: *party_id,
                role: role.to_string(),
                created_at: now,
            })
            .collect();

        let txn = db.begin().await?;
        class_slot::Entity::insert_many(slots.iter().cloned().map(|s| s.into_active_model().reset_all()))
            .exec(&txn)
            .await?;
        if !members.is_empty() {
            class_participant::Entity::insert_many(
                members.iter().cloned().map(|m| m.into_active_model().reset_all()),
            )
            .exec(&txn)
            .await?;
        }
        txn.commit().await?;

        let window = DateRange {
            start: class.start_date,
            end: class.generated_through.unwrap_or(class.end_date),
        };
        let occurrences = expand(schedule, window, zone);
        let (sessions, records) = Self::draft_rows(class.id, &occurrences, participants, now);
        Self::insert_sessions(db, policy, &sessions, &records).await?;

        Ok((slots, members, sessions))
    }

    /// One `scheduled` session per occurrence and one `expected` record per
    /// participant per session
    fn draft_rows(
        class_id: Uuid,
        occurrences: &[Occurrence],
        participants: &[(Uuid, PartyRole)],
        now: DateTime<Utc>,
    ) -> (Vec<session::Model>, Vec<attendance_record::Model>) {
        let sessions: Vec<session::Model> = occurrences
            .iter()
            .map(|occurrence| session::Model {
                id: Uuid::new_v4(),
                class_id,
                start_at: occurrence.start,
                end_at: occurrence.end,
                status: SessionStatus::Scheduled.to_string(),
                cancellation_reason: None,
                cancelled_by: None,
                actual_start_at: None,
                actual_end_at: None,
                reschedule_pending: false,
                updated_at: now,
            })
            .collect();

        let records = sessions
            .iter()
            .flat_map(|session| {
                participants
                    .iter()
                    .map(move |(party_id, role)| attendance_record::Model {
                        id: Uuid::new_v4(),
                        session_id: session.id,
                        party_id: *party_id,
                        party_role: role.to_string(),
                        status: AttendanceStatus::Expected.to_string(),
                        marked_at: None,
                    })
            })
            .collect();

        (sessions, records)
    }

    /// Writes sessions in batches, each batch with its attendance records in
    /// one transaction
    async fn insert_sessions(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        sessions: &[session::Model],
        records: &[attendance_record::Model],
    ) -> Result<(), DbErr> {
        let total = sessions.len();
        let batch_count = total.div_ceil(policy.batch_size);

        let batch_futures = sessions
            .chunks(policy.batch_size)
            .enumerate()
            .map(|(batch_idx, batch)| {
                let db = db.clone();
                let ids: HashSet<Uuid> = batch.iter().map(|s| s.id).collect();
                let batch_records: Vec<attendance_record::Model> = records
                    .iter()
                    .filter(|r| ids.contains(&r.session_id))
                    .cloned()
                    .collect();

                async move {
                    let result = Self::insert_batch(&db, batch, batch_records).await;
                    match &result {
                        Ok(()) => info!(
                            "Wrote session batch {}/{batch_count} ({} sessions)",
                            batch_idx + 1,
                            batch.len()
                        ),
                        Err(e) => error!("Error in session batch {}: {e}", batch_idx + 1),
                    }
                    result
                }
            });

        try_join_all(batch_futures).await?;
        Ok(())
    }

    async fn insert_batch(
        db: &DatabaseConnection,
        sessions: &[session::Model],
        records: Vec<attendance_record::Model>,
    ) -> Result<(), DbErr> {
        let txn = db.begin().await?;

        session::Entity::insert_many(
            sessions.iter().cloned().map(|s| s.into_active_model().reset_all()),
        )
        .exec(&txn)
        .await?;

        // Large classes can exceed the bind parameter limit in a single statement
        for chunk in records.chunks(500) {
            attendance_record::Entity::insert_many(
                chunk.iter().cloned().map(|r| r.into_active_model().reset_all()),
            )
            .exec(&txn)
            .await?;
        }

        txn.commit().await
    }

    async fn ensure_profiles_exist(
        db: &DatabaseConnection,
        participants: &[(Uuid, PartyRole)],
    ) -> Result<(), SchedulingError> {
        if participants.is_empty() {
            return Ok(());
        }

        let known: HashSet<Uuid> = profile::Entity::find()
            .filter(profile::Column::Id.is_in(participants.iter().map(|(id, _)| *id)))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        match participants.iter().find(|(id, _)| !known.contains(id)) {
            Some((missing, _)) => Err(SchedulingError::not_found("profile", *missing)),
            None => Ok(()),
        }
    }

    /// Deletes every row written for a class; returns whether that succeeded
    async fn compensate_class(db: &DatabaseConnection, class_id: Uuid) -> bool {
        let result = async {
            let txn = db.begin().await?;
            ClassService::purge_class(&txn, class_id).await?;
            txn.commit().await
        }
        .await;

        match result {
            Ok(()) => {
                warn!("Rolled back class {class_id}");
                true
            }
            Err(e) => {
                error!("Compensation for class {class_id} failed, rows may be orphaned: {e}");
                false
            }
        }
    }

    async fn compensate_extension(
        db: &DatabaseConnection,
        class_id: Uuid,
        session_ids: &[Uuid],
        previous_through: Option<NaiveDate>,
    ) -> bool {
        let result = async {
            let txn = db.begin().await?;
            for chunk in session_ids.chunks(500) {
                attendance_record::Entity::delete_many()
                    .filter(attendance_record::Column::SessionId.is_in(chunk.iter().copied()))
                    .exec(&txn)
                    .await?;
                session::Entity::delete_many()
                    .filter(session::Column::Id.is_in(chunk.iter().copied()))
                    .exec(&txn)
                    .await?;
            }
            class::Entity::update_many()
                .col_expr(class::Column::GeneratedThrough, Expr::value(previous_through))
                .filter(class::Column::Id.eq(class_id))
                .exec(&txn)
                .await?;
            txn.commit().await
        }
        .await;

        match result {
            Ok(()) => {
                warn!("Rolled back extension of class {class_id}");
                true
            }
            Err(e) => {
                error!("Compensation for class {class_id} extension failed: {e}");
                false
            }
        }
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<PartyRole, DbErr> {
    raw.parse()
        .map_err(|_| DbErr::Type(format!("unknown participant role '{raw}'")))
}

fn is_past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
