use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Operational status of a single session
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    /// Initiated by an admin or teacher shortly before the start
    Pending,
    Running,
    Complete,
    Cancelled,
    /// The session was a no-show
    Absence,
}

impl SessionStatus {
    /// No lifecycle action leads out of a terminal status. A cancelled
    /// session can still come back through an approved reschedule.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Absence)
    }

    pub fn live() -> impl Iterator<Item = Self> {
        Self::iter().filter(|s| !s.is_terminal())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Expected,
    Present,
    Absent,
}

/// The part a participant plays in a class
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PartyRole {
    Teacher,
    Student,
}

/// Role of a profile in the identity store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl From<PartyRole> for Role {
    fn from(role: PartyRole) -> Self {
        match role {
            PartyRole::Teacher => Self::Teacher,
            PartyRole::Student => Self::Student,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RescheduleStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RescheduleDecision {
    Approve,
    Reject,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_string_round_trip() {
        for status in SessionStatus::iter() {
            assert_eq!(SessionStatus::from_str(status.as_ref()).unwrap(), status);
        }
        assert_eq!(SessionStatus::Cancelled.to_string(), "cancelled");
        assert!(SessionStatus::from_str("done").is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = SessionStatus::iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![
                SessionStatus::Complete,
                SessionStatus::Cancelled,
                SessionStatus::Absence
            ]
        );
        assert_eq!(SessionStatus::live().count(), 3);
    }

    #[test]
    fn test_serde_names_match_storage_names() {
        let json = serde_json::to_string(&AttendanceStatus::Expected).unwrap();
        assert_eq!(json, "\"expected\"");
        assert_eq!(
            serde_json::from_str::<PartyRole>("\"teacher\"").unwrap(),
            PartyRole::Teacher
        );
        assert_eq!(Role::from(PartyRole::Student), Role::Student);
    }
}
