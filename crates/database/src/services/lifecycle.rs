use crate::{
    config::SchedulingPolicy,
    entities::{attendance_record, session},
    error::SchedulingError,
    notify::{Notifier, SessionEvent},
    services::{actor::ActorService, class::ClassService},
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use models::{
    lifecycle::{ActionContext, SessionAction, SessionTiming},
    status::{AttendanceStatus, SessionStatus},
    time::parse_timezone,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub session_id: Uuid,
    pub action: SessionAction,
    pub actor_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

pub struct LifecycleService;

impl LifecycleService {
    pub async fn find_session<C: ConnectionTrait>(
        db: &C,
        session_id: Uuid,
    ) -> Result<session::Model, SchedulingError> {
        session::Entity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or_else(|| SchedulingError::not_found("session", session_id))
    }

    /// Applies a lifecycle action to a session.
    ///
    /// The new status is written with a conditional update on the status
    /// read here; if another writer got there first nothing is written and
    /// `ConcurrencyConflict` is returned. Marking an absence sets every
    /// attendance record to absent in the same transaction, before the
    /// status changes.
    pub async fn transition(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        policy: &SchedulingPolicy,
        request: TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<session::Model, SchedulingError> {
        let session = Self::find_session(db, request.session_id).await?;
        let class = ClassService::find_class(db, session.class_id).await?;
        let actor = ActorService::resolve(db, class.id, request.actor_id).await?;

        if !request.action.permits(actor.role) {
            return Err(SchedulingError::PermissionDenied(format!(
                "a {} cannot {} a session",
                actor.role, request.action
            )));
        }

        let current = session.status()?;
        let timing = SessionTiming {
            start: session.start_at,
            end: session.end_at,
            zone: parse_timezone(&class.timezone)?,
        };
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());
        let ctx = ActionContext {
            role: actor.role,
            reason,
            now,
        };
        let next = policy.guard().check(current, request.action, &timing, &ctx)?;

        let txn = db.begin().await?;

        if request.action == SessionAction::MarkAbsence {
            // Lock the session before its attendance rows, in the same order
            // attendance marking takes them
            let locked = session::Entity::update_many()
                .col_expr(session::Column::UpdatedAt, Expr::value(now))
                .filter(session::Column::Id.eq(session.id))
                .filter(session::Column::Status.eq(current.to_string()))
                .exec(&txn)
                .await?;
            if locked.rows_affected == 0 {
                txn.rollback().await?;
                warn!("Session {}: absence lost a concurrent update", session.id);
                return Err(SchedulingError::conflict("session", session.id));
            }

            attendance_record::Entity::update_many()
                .col_expr(
                    attendance_record::Column::Status,
                    Expr::value(AttendanceStatus::Absent.to_string()),
                )
                .col_expr(attendance_record::Column::MarkedAt, Expr::value(now))
                .filter(attendance_record::Column::SessionId.eq(session.id))
                .exec(&txn)
                .await?;
        }

        let mut update = session::Entity::update_many()
            .col_expr(session::Column::Status, Expr::value(next.to_string()))
            .col_expr(session::Column::UpdatedAt, Expr::value(now));
        update = match request.action {
            SessionAction::Start => {
                update.col_expr(session::Column::ActualStartAt, Expr::value(now))
            }
            SessionAction::End | SessionAction::MarkAbsence => {
                update.col_expr(session::Column::ActualEndAt, Expr::value(now))
            }
            SessionAction::Cancel => update
                .col_expr(
                    session::Column::CancellationReason,
                    Expr::value(reason.map(str::to_string)),
                )
                .col_expr(session::Column::CancelledBy, Expr::value(actor.id)),
            SessionAction::Initiate => update,
        };

        let result = update
            .filter(session::Column::Id.eq(session.id))
            .filter(session::Column::Status.eq(current.to_string()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            warn!(
                "Session {}: {} lost a concurrent update, expected {current}",
                session.id, request.action
            );
            return Err(SchedulingError::conflict("session", session.id));
        }
        txn.commit().await?;

        info!(
            "Session {}: {current} -> {next} ({} by {})",
            session.id, request.action, actor.id
        );
        notifier.notify(&SessionEvent::StatusChanged {
            session_id: session.id,
            class_id: class.id,
            from: current,
            to: next,
            actor_id: actor.id,
            at: now,
        });

        Self::find_session(db, session.id).await
    }

    /// Moves a session to new instants inside the caller's transaction.
    ///
    /// Only valid from `scheduled` or `cancelled`; the write is conditional on
    /// the status read by the caller.
    pub(crate) async fn apply_reschedule<C: ConnectionTrait>(
        txn: &C,
        policy: &SchedulingPolicy,
        session: &session::Model,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<SessionStatus, SchedulingError> {
        let current = session.status()?;
        let next = policy.guard().reschedule(current)?;

        let result = session::Entity::update_many()
            .col_expr(session::Column::Status, Expr::value(next.to_string()))
            .col_expr(session::Column::StartAt, Expr::value(start_at))
            .col_expr(session::Column::EndAt, Expr::value(end_at))
            .col_expr(
                session::Column::CancellationReason,
                Expr::value(Option::<String>::None),
            )
            .col_expr(session::Column::CancelledBy, Expr::value(Option::<Uuid>::None))
            .col_expr(session::Column::ReschedulePending, Expr::value(false))
            .col_expr(session::Column::UpdatedAt, Expr::value(now))
            .filter(session::Column::Id.eq(session.id))
            .filter(session::Column::Status.eq(current.to_string()))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            warn!("Session {}: reschedule lost a concurrent update", session.id);
            return Err(SchedulingError::conflict("session", session.id));
        }
        Ok(next)
    }
}
