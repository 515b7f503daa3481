use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// Malformed input, rejected before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("date range is inverted: {start} is after {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("time slot {start}-{end} is invalid: start must be before end, or end must be 00:00")]
    InvalidTimeSlot { start: NaiveTime, end: NaiveTime },

    #[error("weekly schedule has no scheduled days")]
    EmptySchedule,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}
