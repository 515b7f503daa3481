use chrono::Weekday;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The weekdays a class meets on, one bit per day with Monday lowest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[repr(transparent)]
pub struct DaySet(u8);

/// Letters used in the stored `days_pattern`, Monday first
const DAY_LETTERS: [(Weekday, char); 7] = [
    (Weekday::Mon, 'M'),
    (Weekday::Tue, 'T'),
    (Weekday::Wed, 'W'),
    (Weekday::Thu, 'R'),
    (Weekday::Fri, 'F'),
    (Weekday::Sat, 'S'),
    (Weekday::Sun, 'U'),
];

impl DaySet {
    pub const ALL: Self = DaySet(0b111_1111);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= Self::from(weekday).0;
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.0 & Self::from(weekday).0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The weekdays in this set, Monday first
    pub fn weekdays(self) -> impl Iterator<Item = Weekday> {
        DAY_LETTERS
            .into_iter()
            .map(|(weekday, _)| weekday)
            .filter(move |weekday| self.contains(*weekday))
    }
}

impl From<Weekday> for DaySet {
    fn from(weekday: Weekday) -> Self {
        DaySet(1 << weekday.num_days_from_monday())
    }
}

impl Display for DaySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        DAY_LETTERS
            .iter()
            .filter(|(weekday, _)| self.contains(*weekday))
            .try_for_each(|(_, letter)| write!(f, "{letter}"))
    }
}

/// Stable numbering used when a weekday is stored as an integer (Monday = 0)
pub fn weekday_to_index(weekday: Weekday) -> i16 {
    weekday.num_days_from_monday() as i16
}

/// Inverse of [`weekday_to_index`]
pub fn weekday_from_index(index: i16) -> Option<Weekday> {
    u8::try_from(index)
        .ok()
        .and_then(|i| Weekday::try_from(i).ok())
}
