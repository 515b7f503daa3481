//! The session lifecycle graph and its guards.
//!
//! ```text
//! scheduled --initiate--> pending --start--> running --end--> complete
//!     |                      |                  |
//!     +------cancel----------+                  +--mark_absence--> absence
//!     v
//! cancelled --(approved reschedule)--> scheduled
//! ```
//!
//! Everything here is pure; the caller supplies the current status, the
//! session's instants and zone, and "now".

use crate::{
    status::{Role, SessionStatus},
    time::local_date,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// An action a participant or admin takes on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionAction {
    Initiate,
    Start,
    End,
    Cancel,
    MarkAbsence,
}

impl SessionAction {
    /// Roles allowed to take this action; cancellation is open to everyone
    pub fn permits(self, role: Role) -> bool {
        match self {
            Self::Cancel => true,
            Self::Initiate | Self::Start | Self::End | Self::MarkAbsence => {
                matches!(role, Role::Admin | Role::Teacher)
            }
        }
    }
}

/// A guard rejected an action. Messages name the guard that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("cannot {action} a session that is {from}{}", hint(.action, .from))]
    InvalidTransition {
        action: SessionAction,
        from: SessionStatus,
    },

    #[error("session can only be initiated between {opens_at} and {closes_at}")]
    OutsideInitiationWindow {
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    },

    #[error("cannot cancel on the session's start day ({session_date}), mark it as an absence instead")]
    SameDayCancellation { session_date: NaiveDate },

    #[error("cannot cancel a session whose start day ({session_date}) has already passed")]
    CancellationAfterStartDay { session_date: NaiveDate },

    #[error("a teacher must give a reason to cancel a session")]
    ReasonRequired,

    #[error("session is already {0}")]
    Terminal(SessionStatus),

    #[error("only scheduled or cancelled sessions can be rescheduled, this one is {0}")]
    NotReschedulable(SessionStatus),

    #[error("session has already started at {0}")]
    AlreadyStarted(DateTime<Utc>),
}

fn hint(action: &SessionAction, from: &SessionStatus) -> &'static str {
    match (action, from) {
        (SessionAction::Start, SessionStatus::Scheduled) => ", initiate it first",
        (SessionAction::Cancel, SessionStatus::Running) => ", mark it as an absence instead",
        _ => "",
    }
}

/// Timing facts about the session being transitioned
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub zone: Tz,
}

/// Who is acting, and when
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub role: Role,
    pub reason: Option<&'a str>,
    pub now: DateTime<Utc>,
}

/// Validates actions against the lifecycle graph
#[derive(Debug, Clone, Copy)]
pub struct TransitionGuard {
    /// How long before the start a session may be initiated
    pub initiate_lead: Duration,
}

impl Default for TransitionGuard {
    fn default() -> Self {
        Self {
            initiate_lead: Duration::minutes(5),
        }
    }
}

impl TransitionGuard {
    /// Returns the status `action` moves the session to, or the guard that failed
    pub fn check(
        &self,
        current: SessionStatus,
        action: SessionAction,
        timing: &SessionTiming,
        ctx: &ActionContext<'_>,
    ) -> Result<SessionStatus, GuardError> {
        use SessionAction as A;
        use SessionStatus as S;

        match (action, current) {
            (A::Initiate, S::Scheduled) => {
                let opens_at = timing.start - self.initiate_lead;
                if ctx.now < opens_at || ctx.now > timing.end {
                    return Err(GuardError::OutsideInitiationWindow {
                        opens_at,
                        closes_at: timing.end,
                    });
                }
                Ok(S::Pending)
            }
            (A::Start, S::Pending) => Ok(S::Running),
            (A::End, S::Running) => Ok(S::Complete),
            (A::MarkAbsence, S::Running) => Ok(S::Absence),
            (A::Cancel, S::Scheduled | S::Pending) => {
                Self::check_cancellation(timing, ctx)?;
                Ok(S::Cancelled)
            }
            (action, from) => Err(GuardError::InvalidTransition { action, from }),
        }
    }

    fn check_cancellation(timing: &SessionTiming, ctx: &ActionContext<'_>) -> Result<(), GuardError> {
        let session_date = local_date(timing.start, timing.zone);
        let today = local_date(ctx.now, timing.zone);

        if today == session_date {
            return Err(GuardError::SameDayCancellation { session_date });
        }
        if today > session_date {
            return Err(GuardError::CancellationAfterStartDay { session_date });
        }

        let has_reason = ctx.reason.is_some_and(|r| !r.trim().is_empty());
        if ctx.role == Role::Teacher && !has_reason {
            return Err(GuardError::ReasonRequired);
        }
        Ok(())
    }

    /// The status a session returns to when a reschedule is applied
    pub fn reschedule(&self, current: SessionStatus) -> Result<SessionStatus, GuardError> {
        match current {
            SessionStatus::Scheduled | SessionStatus::Cancelled => Ok(SessionStatus::Scheduled),
            other => Err(GuardError::NotReschedulable(other)),
        }
    }

    /// Reschedule requests may only target live sessions that have not started
    pub fn check_reschedule_submission(
        &self,
        current: SessionStatus,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), GuardError> {
        if current.is_terminal() {
            return Err(GuardError::Terminal(current));
        }
        if now >= start {
            return Err(GuardError::AlreadyStarted(start));
        }
        Ok(())
    }

    /// Attendance may be marked at any non-terminal status
    pub fn check_attendance(&self, current: SessionStatus) -> Result<(), GuardError> {
        if current.is_terminal() {
            return Err(GuardError::Terminal(current));
        }
        Ok(())
    }
}
