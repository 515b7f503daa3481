use crate::{
    config::SchedulingPolicy,
    entities::{reschedule_request, session},
    error::SchedulingError,
    notify::{Notifier, SessionEvent},
    services::{actor::ActorService, lifecycle::LifecycleService},
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use models::{
    ValidationError,
    status::{RescheduleDecision, RescheduleStatus},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleSubmission {
    pub session_id: Uuid,
    pub requester_id: Uuid,
    pub reason: String,
    pub requested_start_at: DateTime<Utc>,
}

/// What resolving a request did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RescheduleOutcome {
    Approved {
        request: reschedule_request::Model,
        session: session::Model,
    },
    Rejected {
        request: reschedule_request::Model,
    },
}

pub struct RescheduleService;

impl RescheduleService {
    pub async fn find_request<C: ConnectionTrait>(
        db: &C,
        request_id: Uuid,
    ) -> Result<reschedule_request::Model, SchedulingError> {
        reschedule_request::Entity::find_by_id(request_id)
            .one(db)
            .await?
            .ok_or_else(|| SchedulingError::not_found("reschedule request", request_id))
    }

    /// Files a request to move a session that has not started yet.
    ///
    /// A session holds at most one pending request; a second submission is
    /// refused until the first is resolved.
    pub async fn submit(
        db: &DatabaseConnection,
        policy: &SchedulingPolicy,
        submission: RescheduleSubmission,
        now: DateTime<Utc>,
    ) -> Result<reschedule_request::Model, SchedulingError> {
        let reason = submission.reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyField("reason").into());
        }
        if submission.requested_start_at <= now {
            return Err(ValidationError::Invalid(format!(
                "requested start {} is not in the future",
                submission.requested_start_at
            ))
            .into());
        }

        let session = LifecycleService::find_session(db, submission.session_id).await?;
        ActorService::resolve(db, session.class_id, submission.requester_id).await?;
        policy
            .guard()
            .check_reschedule_submission(session.status()?, session.start_at, now)?;

        let request = reschedule_request::Model {
            id: Uuid::new_v4(),
            session_id: session.id,
            requester_id: submission.requester_id,
            reason: reason.to_string(),
            requested_start_at: submission.requested_start_at,
            status: RescheduleStatus::Pending.to_string(),
            processed_by: None,
            processed_at: None,
            created_at: now,
        };

        let txn = db.begin().await?;
        let claimed = session::Entity::update_many()
            .col_expr(session::Column::ReschedulePending, Expr::value(true))
            .filter(session::Column::Id.eq(session.id))
            .filter(session::Column::ReschedulePending.eq(false))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Err(SchedulingError::PreconditionFailed(format!(
                "session {} already has a pending reschedule request",
                session.id
            )));
        }

        reschedule_request::Entity::insert(request.clone().into_active_model().reset_all())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(
            "Reschedule {} filed for session {} by {}, to {}",
            request.id, session.id, request.requester_id, request.requested_start_at
        );
        Ok(request)
    }

    /// Approves or rejects a pending request. Admins only.
    ///
    /// Approval moves the session to the requested start, keeping its
    /// duration. A requested start that is no longer in the future fails
    /// with `Expired` and leaves the request pending.
    pub async fn resolve(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        policy: &SchedulingPolicy,
        request_id: Uuid,
        approver_id: Uuid,
        decision: RescheduleDecision,
        now: DateTime<Utc>,
    ) -> Result<RescheduleOutcome, SchedulingError> {
        ActorService::require_admin(db, approver_id).await?;
        let request = Self::find_request(db, request_id).await?;
        let status = request.status()?;
        if status != RescheduleStatus::Pending {
            return Err(SchedulingError::PreconditionFailed(format!(
                "reschedule request {request_id} is already {status}"
            )));
        }
        let session = LifecycleService::find_session(db, request.session_id).await?;

        match decision {
            RescheduleDecision::Approve => {
                if request.requested_start_at <= now {
                    warn!("Reschedule {request_id} expired at approval");
                    return Err(SchedulingError::Expired {
                        request_id,
                        requested_start: request.requested_start_at,
                    });
                }
                let start_at = request.requested_start_at;
                let end_at = start_at + session.duration();

                let txn = db.begin().await?;
                LifecycleService::apply_reschedule(&txn, policy, &session, start_at, end_at, now)
                    .await?;
                let request =
                    Self::close(&txn, request, RescheduleStatus::Approved, approver_id, now)
                        .await?;
                txn.commit().await?;

                info!("Reschedule {request_id} approved by {approver_id}");
                notifier.notify(&SessionEvent::RescheduleApproved {
                    request_id,
                    session_id: session.id,
                    start_at,
                    end_at,
                    approver_id,
                });

                let session = LifecycleService::find_session(db, session.id).await?;
                Ok(RescheduleOutcome::Approved { request, session })
            }
            RescheduleDecision::Reject => {
                let txn = db.begin().await?;
                let request =
                    Self::close(&txn, request, RescheduleStatus::Rejected, approver_id, now)
                        .await?;
                session::Entity::update_many()
                    .col_expr(session::Column::ReschedulePending, Expr::value(false))
                    .filter(session::Column::Id.eq(session.id))
                    .exec(&txn)
                    .await?;
                txn.commit().await?;

                info!("Reschedule {request_id} rejected by {approver_id}");
                notifier.notify(&SessionEvent::RescheduleRejected {
                    request_id,
                    session_id: session.id,
                    approver_id,
                });
                Ok(RescheduleOutcome::Rejected { request })
            }
        }
    }

    /// Pending requests, oldest first, optionally for one session
    pub async fn list_pending(
        db: &DatabaseConnection,
        session_id: Option<Uuid>,
    ) -> Result<Vec<reschedule_request::Model>, SchedulingError> {
        let mut query = reschedule_request::Entity::find()
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending.to_string()));
        if let Some(session_id) = session_id {
            query = query.filter(reschedule_request::Column::SessionId.eq(session_id));
        }

        Ok(query
            .order_by_asc(reschedule_request::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Moves a pending request to its final status; resolved requests are
    /// immutable
    async fn close<C: ConnectionTrait>(
        txn: &C,
        request: reschedule_request::Model,
        status: RescheduleStatus,
        approver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<reschedule_request::Model, SchedulingError> {
        let result = reschedule_request::Entity::update_many()
            .col_expr(reschedule_request::Column::Status, Expr::value(status.to_string()))
            .col_expr(reschedule_request::Column::ProcessedBy, Expr::value(approver_id))
            .col_expr(reschedule_request::Column::ProcessedAt, Expr::value(now))
            .filter(reschedule_request::Column::Id.eq(request.id))
            .filter(
                reschedule_request::Column::Status.eq(RescheduleStatus::Pending.to_string()),
            )
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(SchedulingError::conflict("reschedule request", request.id));
        }

        Ok(reschedule_request::Model {
            status: status.to_string(),
            processed_by: Some(approver_id),
            processed_at: Some(now),
            ..request
        })
    }
}
