use crate::{
    config::SchedulingPolicy,
    entities::{attendance_record, session},
    error::SchedulingError,
    services::{actor::ActorService, lifecycle::LifecycleService},
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use models::{
    ValidationError,
    status::{AttendanceStatus, Role, SessionStatus},
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

pub struct AttendanceService;

impl AttendanceService {
    /// Marks a party present or absent. Students may only mark themselves.
    ///
    /// Marking the status a record already has changes nothing.
    pub async fn mark(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        actor_id: Uuid,
        session_id: Uuid,
        party_id: Uuid,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model, SchedulingError> {
        if status == AttendanceStatus::Expected {
            return Err(ValidationError::Invalid(
                "attendance can only be marked present or absent".to_string(),
            )
            .into());
        }

        let session = LifecycleService::find_session(db, session_id).await?;
        let actor = ActorService::resolve(db, session.class_id, actor_id).await?;
        if actor.role == Role::Student && actor.id != party_id {
            return Err(SchedulingError::PermissionDenied(
                "students can only mark their own attendance".to_string(),
            ));
        }
        policy.guard().check_attendance(session.status()?)?;

        let record = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session_id))
            .filter(attendance_record::Column::PartyId.eq(party_id))
            .one(db)
            .await?
            .ok_or_else(|| SchedulingError::not_found("attendance record", party_id))?;
        if record.status()? == status {
            return Ok(record);
        }

        // Touching the session row locks it until commit, and the status
        // predicate is re-checked against any transition that committed first
        let txn = db.begin().await?;
        let live: Vec<String> = SessionStatus::live().map(|s| s.to_string()).collect();
        let locked = session::Entity::update_many()
            .col_expr(session::Column::UpdatedAt, Expr::value(now))
            .filter(session::Column::Id.eq(session_id))
            .filter(session::Column::Status.is_in(live))
            .exec(&txn)
            .await?;
        if locked.rows_affected == 0 {
            txn.rollback().await?;
            warn!("Session {session_id}: attendance for {party_id} lost a concurrent update");
            return Err(SchedulingError::conflict("session", session_id));
        }

        attendance_record::Entity::update_many()
            .col_expr(attendance_record::Column::Status, Expr::value(status.to_string()))
            .col_expr(attendance_record::Column::MarkedAt, Expr::value(now))
            .filter(attendance_record::Column::Id.eq(record.id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!("Session {session_id}: {party_id} marked {status} by {actor_id}");
        Ok(attendance_record::Model {
            status: status.to_string(),
            marked_at: Some(now),
            ..record
        })
    }

    pub async fn list(
        db: &DatabaseConnection,
        session_id: Uuid,
    ) -> Result<Vec<attendance_record::Model>, SchedulingError> {
        LifecycleService::find_session(db, session_id).await?;

        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session_id))
            .all(db)
            .await?;
        Ok(records)
    }
}
