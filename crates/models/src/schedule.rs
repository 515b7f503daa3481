use crate::{days::DaySet, error::ValidationError, time::local_to_utc};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Represents a local time range for a class meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Creates a new `TimeSlot` if `start` is before `end`, or if the slot runs
    /// until midnight (`end` is 00:00 and `start` is later in the day)
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ValidationError> {
        let slot = Self { start, end };
        slot.validate()?;
        Ok(slot)
    }

    /// Parses two `HH:MM` strings into a slot
    pub fn from_strings(start: &str, end: &str) -> Result<Self, ValidationError> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .map_err(|_| ValidationError::Invalid(format!("'{s}' is not an HH:MM time")))
        };

        Self::new(parse(start)?, parse(end)?)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let until_midnight = self.end == NaiveTime::MIN && self.start > NaiveTime::MIN;
        if self.start < self.end || until_midnight {
            Ok(())
        } else {
            Err(ValidationError::InvalidTimeSlot {
                start: self.start,
                end: self.end,
            })
        }
    }

    /// Whether the slot ends on the following calendar day
    pub fn spans_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Length of the slot on a wall clock with no DST change
    pub fn wall_duration(&self) -> Duration {
        let length = self.end - self.start;
        if self.spans_midnight() {
            length + Duration::days(1)
        } else {
            length
        }
    }
}

/// The weekly recurrence template: at most one slot per weekday
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default)]
    pub monday: Option<TimeSlot>,
    #[serde(default)]
    pub tuesday: Option<TimeSlot>,
    #[serde(default)]
    pub wednesday: Option<TimeSlot>,
    #[serde(default)]
    pub thursday: Option<TimeSlot>,
    #[serde(default)]
    pub friday: Option<TimeSlot>,
    #[serde(default)]
    pub saturday: Option<TimeSlot>,
    #[serde(default)]
    pub sunday: Option<TimeSlot>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, weekday: Weekday) -> Option<TimeSlot> {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn set(&mut self, weekday: Weekday, slot: Option<TimeSlot>) {
        let entry = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *entry = slot;
    }

    /// Builder-style variant of [`WeeklySchedule::set`]
    pub fn with(mut self, weekday: Weekday, slot: TimeSlot) -> Self {
        self.set(weekday, Some(slot));
        self
    }

    /// The days that have a slot
    pub fn days(&self) -> DaySet {
        let mut days = DaySet::new();
        for (weekday, _) in self.slots() {
            days.insert(weekday);
        }
        days
    }

    /// Scheduled slots, Monday first
    pub fn slots(&self) -> impl Iterator<Item = (Weekday, TimeSlot)> + '_ {
        DaySet::ALL
            .weekdays()
            .filter_map(|weekday| self.get(weekday).map(|slot| (weekday, slot)))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.days().is_empty() {
            return Err(ValidationError::EmptySchedule);
        }
        self.slots().try_for_each(|(_, slot)| slot.validate())
    }
}

/// An inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start > self.end {
            return Err(ValidationError::InvertedDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the range, in order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |date| *date <= end)
    }

    /// The part of this range that is also in `other`
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// One concrete meeting produced from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Local calendar date the meeting starts on
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Expands a weekly template into concrete occurrences.
///
/// Dates are walked in the zone's local calendar so the weekday of each date
/// is the weekday the template names. A slot ending at midnight ends on the
/// next local date. A slot starting inside a spring-forward gap is shifted
/// forward with the gap; if that would leave it ending at or before its start,
/// it keeps its wall-clock length instead.
pub fn expand(schedule: &WeeklySchedule, range: DateRange, zone: Tz) -> Vec<Occurrence> {
    range
        .dates()
        .filter_map(|date| {
            let slot = schedule.get(date.weekday())?;
            let start = local_to_utc(date, slot.start, zone);
            let end_date = if slot.spans_midnight() {
                date.checked_add_days(Days::new(1))?
            } else {
                date
            };
            let mut end = local_to_utc(end_date, slot.end, zone);
            if end <= start {
                end = start + slot.wall_duration();
            }

            Some(Occurrence { date, start, end })
        })
        .collect()
}
