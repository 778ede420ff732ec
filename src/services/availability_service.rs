//! Slot availability resolver.
//!
//! Given a target date, produces the full daily slot grid with each slot
//! marked available or not. Occupancy comes from non-terminal bookings
//! overlapping the day; a held booking whose expiry has already passed is
//! excluded by the query itself (the lazy-expiry read), so a stale hold
//! never blocks a slot even before the sweeper materializes it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{calendar, db::DbPool, error::AppError};

/// One grid slot annotated with occupancy.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SlotAvailability {
    /// Slot start, civil time in the clinic timezone ("09:00")
    pub time: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub available: bool,
}

/// The full grid for one day.
#[derive(Debug, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub timezone: String,
    pub slots: Vec<SlotAvailability>,
}

/// Resolve the availability grid for `date`.
///
/// Fails with a service-unavailable condition if the store is unreachable;
/// no partial or stale grid is ever returned.
pub async fn resolve_day(pool: &DbPool, date: NaiveDate) -> Result<DayAvailability, AppError> {
    // Only held-and-live or confirmed rows occupy slots. Terminal rows and
    // past-due holds are filtered out here, not post-hoc.
    let occupied: Vec<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT start_at, end_at
        FROM bookings
        WHERE date = $1
          AND (status = 'confirmed' OR (status = 'held' AND expires_at > NOW()))
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(DayAvailability {
        date,
        timezone: calendar::CLINIC_TIMEZONE.to_string(),
        slots: mark_slots(date, &occupied),
    })
}

/// Annotate the daily grid with occupancy from the given booking intervals.
///
/// A slot is unavailable when any booking interval intersects it under the
/// half-open overlap test: `booking.start < slot.end && booking.end >
/// slot.start`. Pure so the marking logic is unit-testable without a store.
fn mark_slots(
    date: NaiveDate,
    occupied: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<SlotAvailability> {
    calendar::generate_daily_slots()
        .into_iter()
        .filter_map(|slot| {
            let (start_at, end_at) = calendar::slot_instants(date, slot.start)?;
            let taken = occupied
                .iter()
                .any(|&(b_start, b_end)| b_start < end_at && b_end > start_at);
            Some(SlotAvailability {
                time: slot.start.format("%H:%M").to_string(),
                start_at,
                end_at,
                available: !taken,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).unwrap()
    }

    // Madrid is UTC+1 on this date: the 09:00 slot is 08:00-08:30 UTC.
    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, h, m, 0).unwrap()
    }

    #[test]
    fn empty_day_is_fully_available() {
        let slots = mark_slots(day(), &[]);
        assert_eq!(slots.len(), 17);
        assert!(slots.iter().all(|s| s.available));
        assert_eq!(slots[0].time, "09:00");
        assert_eq!(slots[16].time, "17:00");
    }

    #[test]
    fn booking_blocks_exactly_its_slot() {
        let slots = mark_slots(day(), &[(utc(8, 0), utc(8, 30))]);
        assert!(!slots[0].available);
        assert!(slots[1..].iter().all(|s| s.available));
    }

    #[test]
    fn overlap_test_is_half_open() {
        // A booking ending exactly at a slot's start does not block it.
        let slots = mark_slots(day(), &[(utc(8, 0), utc(8, 30))]);
        assert!(slots[1].available, "09:30 slot must stay free");

        // A booking straddling two slots blocks both.
        let slots = mark_slots(day(), &[(utc(8, 15), utc(8, 45))]);
        assert!(!slots[0].available);
        assert!(!slots[1].available);
        assert!(slots[2].available);
    }

    #[test]
    fn slot_instants_carry_the_madrid_offset() {
        let slots = mark_slots(day(), &[]);
        assert_eq!(slots[0].start_at, utc(8, 0));
        assert_eq!(slots[0].end_at, utc(8, 30));
    }
}
