use crate::{
    entities::{
        attendance_record, class, class_participant, class_slot, profile, reschedule_request,
        session,
    },
    error::SchedulingError,
    services::actor::ActorService,
};
use chrono::{DateTime, Utc};
use log::info;
use models::{
    days::weekday_from_index,
    schedule::{TimeSlot, WeeklySchedule},
    status::{AttendanceStatus, PartyRole, SessionStatus},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait, sea_query::Query,
};
use serde::Serialize;
use uuid::Uuid;

/// A class with its weekly template and participants
#[derive(Debug, Clone, Serialize)]
pub struct ClassDetails {
    pub class: class::Model,
    pub schedule: WeeklySchedule,
    pub participants: Vec<class_participant::Model>,
}

pub struct ClassService;

impl ClassService {
    pub async fn find_class<C: ConnectionTrait>(
        db: &C,
        class_id: Uuid,
    ) -> Result<class::Model, SchedulingError> {
        class::Entity::find_by_id(class_id)
            .one(db)
            .await?
            .ok_or_else(|| SchedulingError::not_found("class", class_id))
    }

    pub async fn get_class(
        db: &DatabaseConnection,
        class_id: Uuid,
    ) -> Result<ClassDetails, SchedulingError> {
        let class = Self::find_class(db, class_id).await?;
        let schedule = Self::template(db, class_id).await?;
        let participants = Self::participants(db, class_id).await?;

        Ok(ClassDetails {
            class,
            schedule,
            participants,
        })
    }

    /// Rebuilds the weekly template from the stored slots
    pub async fn template<C: ConnectionTrait>(
        db: &C,
        class_id: Uuid,
    ) -> Result<WeeklySchedule, DbErr> {
        let slots = class_slot::Entity::find()
            .filter(class_slot::Column::ClassId.eq(class_id))
            .all(db)
            .await?;

        let mut schedule = WeeklySchedule::new();
        for slot in slots {
            let weekday = weekday_from_index(slot.weekday)
                .ok_or_else(|| DbErr::Type(format!("invalid weekday index {}", slot.weekday)))?;
            let time_slot = TimeSlot::new(slot.start_time, slot.end_time)
                .map_err(|e| DbErr::Type(e.to_string()))?;
            schedule.set(weekday, Some(time_slot));
        }
        Ok(schedule)
    }

    pub async fn participants<C: ConnectionTrait>(
        db: &C,
        class_id: Uuid,
    ) -> Result<Vec<class_participant::Model>, DbErr> {
        class_participant::Entity::find()
            .filter(class_participant::Column::ClassId.eq(class_id))
            .order_by_asc(class_participant::Column::CreatedAt)
            .all(db)
            .await
    }

    /// Every session of a class, earliest first
    pub async fn list_sessions(
        db: &DatabaseConnection,
        class_id: Uuid,
    ) -> Result<Vec<session::Model>, SchedulingError> {
        Self::find_class(db, class_id).await?;

        let mut sessions = session::Entity::find()
            .filter(session::Column::ClassId.eq(class_id))
            .all(db)
            .await?;
        sessions.sort_by_key(|s| s.start_at);
        Ok(sessions)
    }

    /// Sessions a party attends that have not ended and are not cancelled
    pub async fn list_party_sessions(
        db: &DatabaseConnection,
        party_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<session::Model>, SchedulingError> {
        let rows = attendance_record::Entity::find()
            .filter(attendance_record::Column::PartyId.eq(party_id))
            .find_also_related(session::Entity)
            .filter(session::Column::EndAt.gt(now))
            .filter(session::Column::Status.ne(SessionStatus::Cancelled.to_string()))
            .order_by_asc(session::Column::StartAt)
            .all(db)
            .await?;

        Ok(rows.into_iter().filter_map(|(_, session)| session).collect())
    }

    /// Assigns a party to a class. They are expected at every live session
    /// that starts after `now`.
    pub async fn add_participant(
        db: &DatabaseConnection,
        admin_id: Uuid,
        class_id: Uuid,
        party_id: Uuid,
        role: PartyRole,
        now: DateTime<Utc>,
    ) -> Result<class_participant::Model, SchedulingError> {
        ActorService::require_admin(db, admin_id).await?;
        let class = Self::find_class(db, class_id).await?;
        if class.archived {
            return Err(SchedulingError::PreconditionFailed(format!(
                "class {class_id} is archived"
            )));
        }
        if let Some(existing) = ActorService::participant_role(db, class_id, party_id).await? {
            return Err(SchedulingError::PreconditionFailed(format!(
                "{party_id} is already a {existing} of class {class_id}"
            )));
        }
        if profile::Entity::find_by_id(party_id)
            .one(db)
            .await?
            .is_none()
        {
            return Err(SchedulingError::not_found("profile", party_id));
        }

        let participant = class_participant::Model {
            id: Uuid::new_v4(),
            class_id,
            party_id,
            role: role.to_string(),
            created_at: now,
        };

        let txn = db.begin().await?;
        class_participant::Entity::insert(participant.clone().into_active_model().reset_all())
            .exec(&txn)
            .await?;

        let upcoming = Self::upcoming_sessions(&txn, class_id, now).await?;
        let records: Vec<attendance_record::ActiveModel> = upcoming
            .iter()
            .map(|session| {
                attendance_record::Model {
                    id: Uuid::new_v4(),
                    session_id: session.id,
                    party_id,
                    party_role: role.to_string(),
                    status: AttendanceStatus::Expected.to_string(),
                    marked_at: None,
                }
                .into_active_model()
                .reset_all()
            })
            .collect();
        for chunk in records.chunks(500) {
            attendance_record::Entity::insert_many(chunk.to_vec())
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        info!(
            "Added {role} {party_id} to class {class_id}, expected at {} sessions",
            upcoming.len()
        );
        Ok(participant)
    }

    /// Unassigns a party; their records on sessions that already started are kept
    pub async fn remove_participant(
        db: &DatabaseConnection,
        admin_id: Uuid,
        class_id: Uuid,
        party_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        ActorService::require_admin(db, admin_id).await?;
        Self::find_class(db, class_id).await?;

        let txn = db.begin().await?;
        let removed = class_participant::Entity::delete_many()
            .filter(class_participant::Column::ClassId.eq(class_id))
            .filter(class_participant::Column::PartyId.eq(party_id))
            .exec(&txn)
            .await?;
        if removed.rows_affected == 0 {
            txn.rollback().await?;
            return Err(SchedulingError::not_found("participant", party_id));
        }

        let upcoming: Vec<Uuid> = Self::upcoming_sessions(&txn, class_id, now)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        for chunk in upcoming.chunks(500) {
            attendance_record::Entity::delete_many()
                .filter(attendance_record::Column::PartyId.eq(party_id))
                .filter(attendance_record::Column::SessionId.is_in(chunk.iter().copied()))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        info!("Removed {party_id} from class {class_id}");
        Ok(())
    }

    /// Archived classes keep their sessions but accept no new participants
    /// and no further generation
    pub async fn archive_class(
        db: &DatabaseConnection,
        admin_id: Uuid,
        class_id: Uuid,
    ) -> Result<class::Model, SchedulingError> {
        ActorService::require_admin(db, admin_id).await?;
        let class = Self::find_class(db, class_id).await?;
        if class.archived {
            return Ok(class);
        }

        let mut active = class.into_active_model();
        active.archived = Set(true);
        let class = active.update(db).await?;

        info!("Archived class {class_id}");
        Ok(class)
    }

    /// Deletes a class along with everything hanging off it
    pub async fn delete_class(
        db: &DatabaseConnection,
        admin_id: Uuid,
        class_id: Uuid,
    ) -> Result<(), SchedulingError> {
        ActorService::require_admin(db, admin_id).await?;
        Self::find_class(db, class_id).await?;

        let txn = db.begin().await?;
        Self::purge_class(&txn, class_id).await?;
        txn.commit().await?;

        info!("Deleted class {class_id}");
        Ok(())
    }

    /// Removes every row belonging to a class, children first
    pub(crate) async fn purge_class<C: ConnectionTrait>(
        db: &C,
        class_id: Uuid,
    ) -> Result<(), DbErr> {
        let class_sessions = Query::select()
            .column(session::Column::Id)
            .from(session::Entity)
            .and_where(session::Column::ClassId.eq(class_id))
            .to_owned();

        attendance_record::Entity::delete_many()
            .filter(attendance_record::Column::SessionId.in_subquery(class_sessions.clone()))
            .exec(db)
            .await?;
        reschedule_request::Entity::delete_many()
            .filter(reschedule_request::Column::SessionId.in_subquery(class_sessions))
            .exec(db)
            .await?;
        session::Entity::delete_many()
            .filter(session::Column::ClassId.eq(class_id))
            .exec(db)
            .await?;
        class_participant::Entity::delete_many()
            .filter(class_participant::Column::ClassId.eq(class_id))
            .exec(db)
            .await?;
        class_slot::Entity::delete_many()
            .filter(class_slot::Column::ClassId.eq(class_id))
            .exec(db)
            .await?;
        class::Entity::delete_by_id(class_id).exec(db).await?;

        Ok(())
    }

    /// Non-terminal sessions of a class starting after `now`
    async fn upcoming_sessions<C: ConnectionTrait>(
        db: &C,
        class_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<session::Model>, DbErr> {
        let sessions = session::Entity::find()
            .filter(session::Column::ClassId.eq(class_id))
            .all(db)
            .await?;

        let mut upcoming = Vec::new();
        for session in sessions {
            if session.start_at > now && !session.status()?.is_terminal() {
                upcoming.push(session);
            }
        }
        Ok(upcoming)
    }
}
