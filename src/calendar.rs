//! Calendar rules for the booking grid.
//!
//! Pure, deterministic functions deciding which dates are bookable and
//! generating the fixed daily slot grid. The clinic operates in a single
//! timezone; all civil dates and times in this module are interpreted in
//! that zone.
//!
//! # Booking Rules
//!
//! - Appointments are weekday-only.
//! - Same-day bookings close at the 19:00 cutoff.
//! - Dates can be booked up to 60 days ahead (day 60 included).
//! - Slots run 09:00-17:30 in 30-minute steps (17 slots per day).

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc, Weekday};
use chrono_tz::Tz;

/// The single timezone the clinic operates in.
pub const CLINIC_TIMEZONE: &str = "Europe/Madrid";

/// Slot length in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// How long a hold keeps a slot reserved before it lapses.
pub const HOLD_MINUTES: i64 = 10;

/// First slot of the day starts at 09:00.
const OPEN_HOUR: u32 = 9;

/// Grid ends at 17:30 (the last slot is 17:00-17:30).
const CLOSE_HOUR: u32 = 17;
const CLOSE_MINUTE: u32 = 30;

/// Same-day bookings are rejected from 19:00 onwards (inclusive).
const SAME_DAY_CUTOFF_HOUR: u32 = 19;

/// Furthest-out bookable day, counted from today. Day 60 is still bookable.
const BOOKING_HORIZON_DAYS: i64 = 60;

/// One 30-minute interval on the daily grid, as civil times in the clinic
/// timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Why a date cannot be booked. Maps one-to-one onto the hold rejection
/// codes surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotBookable {
    InPast,
    Weekend,
    AfterCutoff,
    BeyondHorizon,
}

/// Returns the configured clinic timezone.
///
/// The zone name is a compile-time constant, so parsing cannot fail.
pub fn clinic_tz() -> Tz {
    CLINIC_TIMEZONE.parse().expect("valid timezone constant")
}

/// Current wall-clock date and time in the clinic timezone.
pub fn clinic_now(now: DateTime<Utc>) -> DateTime<Tz> {
    now.with_timezone(&clinic_tz())
}

/// True for Saturday and Sunday.
pub fn is_weekend_day(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True if `date` falls on a civil day strictly before `today`.
pub fn is_past_date(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

/// True once the clock reaches the same-day cutoff. Exactly 19:00 counts
/// as past the cutoff.
pub fn is_after_same_day_cutoff(now_time: NaiveTime) -> bool {
    let cutoff = NaiveTime::from_hms_opt(SAME_DAY_CUTOFF_HOUR, 0, 0).expect("valid cutoff");
    now_time >= cutoff
}

/// Whether a booking for `date` is still accepted given the current clinic
/// wall clock. Only restricts today; future dates are unaffected.
pub fn can_book_same_day(date: NaiveDate, now: DateTime<Tz>) -> bool {
    if date == now.date_naive() {
        !is_after_same_day_cutoff(now.time())
    } else {
        true
    }
}

/// Composite bookability rule. Returns the first failing reason, checked in
/// order: past date, weekend, same-day cutoff, horizon.
pub fn check_date_bookable(date: NaiveDate, now: DateTime<Tz>) -> Result<(), NotBookable> {
    let today = now.date_naive();

    if is_past_date(date, today) {
        return Err(NotBookable::InPast);
    }
    if is_weekend_day(date) {
        return Err(NotBookable::Weekend);
    }
    if !can_book_same_day(date, now) {
        return Err(NotBookable::AfterCutoff);
    }
    if (date - today).num_days() > BOOKING_HORIZON_DAYS {
        return Err(NotBookable::BeyondHorizon);
    }

    Ok(())
}

/// Convenience boolean form of [`check_date_bookable`].
pub fn is_date_bookable(date: NaiveDate, now: DateTime<Tz>) -> bool {
    check_date_bookable(date, now).is_ok()
}

/// The fixed daily grid: 17 contiguous 30-minute slots from 09:00 to 17:30.
///
/// The grid is the same for every date; bookability of the date itself is a
/// separate concern ([`check_date_bookable`]).
pub fn generate_daily_slots() -> Vec<Slot> {
    let close = NaiveTime::from_hms_opt(CLOSE_HOUR, CLOSE_MINUTE, 0).expect("valid close time");
    let mut slots = Vec::new();
    let mut start = NaiveTime::from_hms_opt(OPEN_HOUR, 0, 0).expect("valid open time");

    while start < close {
        let end = start + TimeDelta::minutes(SLOT_MINUTES);
        slots.push(Slot { start, end });
        start = end;
    }

    slots
}

/// True if `time` is a valid slot start on the daily grid.
pub fn is_valid_slot_start(time: NaiveTime) -> bool {
    generate_daily_slots().iter().any(|s| s.start == time)
}

/// Resolve a civil `date` + slot `time` to absolute start/end instants.
///
/// Returns `None` for civil times that do not exist in the clinic timezone
/// (spring-forward gap); the grid never lands in it, but the conversion is
/// still checked rather than assumed.
pub fn slot_instants(date: NaiveDate, time: NaiveTime) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start_local = date.and_time(time);
    let start = start_local
        .and_local_timezone(clinic_tz())
        .earliest()?
        .with_timezone(&Utc);
    let end = start + TimeDelta::minutes(SLOT_MINUTES);
    Some((start, end))
}

/// Hold lifetime as a duration.
pub fn hold_duration() -> TimeDelta {
    TimeDelta::minutes(HOLD_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn madrid(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Tz> {
        clinic_tz()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .unwrap()
    }

    #[test]
    fn grid_is_seventeen_contiguous_slots() {
        let slots = generate_daily_slots();
        assert_eq!(slots.len(), 17);
        assert_eq!(slots[0].start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(
            slots.last().unwrap().end,
            NaiveTime::from_hms_opt(17, 30, 0).unwrap()
        );
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "grid must have no gaps");
        }
        for slot in &slots {
            assert_eq!(slot.end - slot.start, TimeDelta::minutes(30));
        }
    }

    #[test]
    fn weekend_days_detected() {
        assert!(is_weekend_day(date(2026, 2, 14))); // Saturday
        assert!(is_weekend_day(date(2026, 2, 15))); // Sunday
        assert!(!is_weekend_day(date(2026, 2, 16))); // Monday
    }

    #[test]
    fn cutoff_boundary_is_inclusive() {
        assert!(!is_after_same_day_cutoff(
            NaiveTime::from_hms_opt(18, 59, 59).unwrap()
        ));
        assert!(is_after_same_day_cutoff(
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        ));
    }

    #[test]
    fn same_day_booking_respects_cutoff() {
        let before = madrid(2026, 2, 16, 18, 59, 59);
        let at = madrid(2026, 2, 16, 19, 0, 0);

        assert!(can_book_same_day(date(2026, 2, 16), before));
        assert!(!can_book_same_day(date(2026, 2, 16), at));
        // Cutoff only applies to today.
        assert!(can_book_same_day(date(2026, 2, 17), at));
    }

    #[test]
    fn past_dates_rejected() {
        let now = madrid(2026, 2, 16, 10, 0, 0);
        assert_eq!(
            check_date_bookable(date(2026, 2, 13), now),
            Err(NotBookable::InPast)
        );
    }

    #[test]
    fn weekend_rejected_regardless_of_time() {
        let morning = madrid(2026, 2, 13, 8, 0, 0);
        assert_eq!(
            check_date_bookable(date(2026, 2, 14), morning),
            Err(NotBookable::Weekend)
        );
        assert_eq!(
            check_date_bookable(date(2026, 2, 15), morning),
            Err(NotBookable::Weekend)
        );
    }

    #[test]
    fn horizon_includes_day_sixty() {
        // A Thursday, so day 60 (Monday) and day 61 (Tuesday) are both
        // weekdays and the horizon rule is what decides.
        let now = madrid(2026, 2, 5, 10, 0, 0);
        let day_60 = date(2026, 2, 5) + TimeDelta::days(60); // 2026-04-06, Monday
        let day_61 = day_60 + TimeDelta::days(1);

        assert_eq!(check_date_bookable(day_60, now), Ok(()));
        assert_eq!(
            check_date_bookable(day_61, now),
            Err(NotBookable::BeyondHorizon)
        );
    }

    #[test]
    fn grid_membership() {
        assert!(is_valid_slot_start(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert!(is_valid_slot_start(
            NaiveTime::from_hms_opt(17, 0, 0).unwrap()
        ));
        assert!(!is_valid_slot_start(
            NaiveTime::from_hms_opt(17, 30, 0).unwrap()
        ));
        assert!(!is_valid_slot_start(
            NaiveTime::from_hms_opt(9, 15, 0).unwrap()
        ));
    }

    #[test]
    fn slot_instants_span_thirty_minutes() {
        let (start, end) = slot_instants(
            date(2026, 2, 16),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(end - start, TimeDelta::minutes(30));
        // Madrid is UTC+1 in February.
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 16, 8, 0, 0).unwrap());
    }
}
