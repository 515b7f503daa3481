//! Conversion between wall-clock times in a named zone and UTC instants.
//!
//! Conversions follow the zone's DST rules for the date in question, never a
//! fixed offset. Local times that do not exist (spring-forward gap) are
//! shifted forward by the size of the gap; local times that occur twice
//! (fall-back overlap) resolve to the first occurrence.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ValidationError;

/// Parse an IANA zone name such as `"America/Toronto"`
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone(name.to_string()))
}

/// Resolve a local date and time in `zone` to an absolute instant
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, zone: Tz) -> DateTime<Utc> {
    let local = date.and_time(time);

    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc),
        LocalResult::None => resolve_gap(local, zone),
    }
}

/// Express an instant as a local date and time in `zone`
pub fn utc_to_local(instant: DateTime<Utc>, zone: Tz) -> (NaiveDate, NaiveTime) {
    let local = instant.with_timezone(&zone).naive_local();
    (local.date(), local.time())
}

/// The calendar date an instant falls on in `zone`
pub fn local_date(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    utc_to_local(instant, zone).0
}

/// A nonexistent local time is read with the offset in force just before the
/// transition, which lands it `gap` later on the post-transition clock.
fn resolve_gap(local: NaiveDateTime, zone: Tz) -> DateTime<Utc> {
    let before = local - Duration::days(1);
    let offset = zone.offset_from_utc_datetime(&before).fix();
    let seconds = i64::from(offset.local_minus_utc());

    (local - Duration::seconds(seconds)).and_utc()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn toronto() -> Tz {
        parse_timezone("America/Toronto").unwrap()
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("Europe/Berlin").is_ok());
        assert_eq!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(ValidationError::UnknownTimezone(
                "Mars/Olympus_Mons".to_string()
            ))
        );
    }

    #[test]
    fn test_offset_differs_between_winter_and_summer() {
        let winter = local_to_utc(date(2024, 1, 15), time(14, 0), toronto());
        let summer = local_to_utc(date(2024, 7, 15), time(14, 0), toronto());

        assert_eq!(winter.hour(), 19);
        assert_eq!(summer.hour(), 18);
    }

    #[test]
    fn test_spring_forward_gap_shifts_forward() {
        // 2024-03-10 02:30 does not exist in Toronto; clocks jump 02:00 -> 03:00
        let instant = local_to_utc(date(2024, 3, 10), time(2, 30), toronto());

        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
        assert_eq!(utc_to_local(instant, toronto()), (date(2024, 3, 10), time(3, 30)));
    }

    #[test]
    fn test_fall_back_overlap_picks_first() {
        // 2024-11-03 01:30 happens twice in Toronto; the EDT reading comes first
        let instant = local_to_utc(date(2024, 11, 3), time(1, 30), toronto());

        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn test_round_trip() {
        let zones = ["America/Toronto", "Europe/London", "Asia/Kolkata", "Australia/Sydney", "UTC"];
        let dates = [date(2024, 1, 31), date(2024, 3, 11), date(2024, 6, 30), date(2024, 10, 7)];
        let times = [time(0, 0), time(9, 15), time(23, 30)];

        for zone in zones {
            let tz = parse_timezone(zone).unwrap();
            for d in dates {
                for t in times {
                    let instant = local_to_utc(d, t, tz);
                    assert_eq!(utc_to_local(instant, tz), (d, t), "{zone} {d} {t}");
                }
            }
        }
    }

    #[test]
    fn test_local_date_can_differ_from_utc_date() {
        // 21:00 in Toronto in winter is already the next day in UTC
        let instant = local_to_utc(date(2024, 2, 2), time(21, 0), toronto());

        assert_eq!(instant.date_naive(), date(2024, 2, 3));
        assert_eq!(local_date(instant, toronto()), date(2024, 2, 2));
    }
}
