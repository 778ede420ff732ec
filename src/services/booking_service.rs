//! Booking service - hold, confirmation, and cancellation logic.
//!
//! This service owns the booking state machine:
//!
//! - `create_hold`: places a 10-minute exclusive claim on one slot
//! - `confirm_booking`: upgrades a live hold into a permanent booking
//! - `cancel_booking`: moves a booking into the terminal cancelled state
//!
//! # Same-Slot Exclusion
//!
//! At most one non-terminal (held or confirmed) booking may exist per slot
//! at any instant. Two concurrent hold requests for the same slot contend
//! on a transaction-scoped advisory lock keyed by the slot, so the
//! occupancy check and the insert are atomic from the store's perspective;
//! the partial unique index on `slot_key` backstops the invariant. The
//! confirmation write is conditioned on the row still being a live hold, so
//! a confirm racing the hold's expiry cannot resurrect it.

use chrono::Utc;

use crate::{
    calendar,
    db::DbPool,
    error::AppError,
    models::{
        booking::{
            Booking, BookingStatus, CancelRequest, CancelResponse, ConfirmRequest,
            ConfirmResponse, HoldRequest, HoldResponse, slot_key,
        },
        contact::Contact,
    },
    services::notification_service::Notifier,
};

/// Place a temporary hold on a slot.
///
/// # Process
///
/// 1. Validate timezone, slot time, and date bookability (no store access)
/// 2. Start a database transaction and take the slot advisory lock
/// 3. Materialize expiry of any stale hold on this slot
/// 4. Re-check occupancy; reject with `SLOT_TAKEN` if claimed
/// 5. Insert the `held` row with three fresh capability tokens
///
/// No row is written on any validation or occupancy failure.
///
/// # Errors
///
/// - `InvalidTimezone`: timezone is not the supported clinic timezone
/// - `InvalidDate`: time off the grid, date malformed, or beyond the horizon
/// - `DateInPast` / `WeekendNotAllowed` / `CutoffExceeded`: calendar rules
/// - `SlotTaken`: another non-terminal booking claims this slot
/// - `Database`: store error
pub async fn create_hold(pool: &DbPool, request: HoldRequest) -> Result<HoldResponse, AppError> {
    let now = Utc::now();

    validate_hold_request(&request, now)?;

    let (start_at, end_at) =
        calendar::slot_instants(request.date, request.time).ok_or(AppError::InvalidDate)?;
    let key = slot_key(request.date, request.time);
    let expires_at = now + calendar::hold_duration();

    let session_token = generate_token();
    let cancel_token = generate_token();
    let reschedule_token = generate_token();

    let mut tx = pool.begin().await?;

    // Serialize writers for this slot. hashtext() keys the lock off the
    // same slot_key every write path derives, and the lock releases with
    // the transaction.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&key)
        .execute(&mut *tx)
        .await?;

    // A past-due hold no longer occupies the slot; materialize it so the
    // partial unique index cannot trip on it.
    sqlx::query(
        r#"
        UPDATE bookings
        SET status = 'expired', expires_at = NULL, updated_at = NOW()
        WHERE slot_key = $1 AND status = 'held' AND expires_at <= NOW()
        "#,
    )
    .bind(&key)
    .execute(&mut *tx)
    .await?;

    // Occupancy re-check at write time, under the lock.
    let occupied: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM bookings WHERE slot_key = $1 AND status IN ('held', 'confirmed'))",
    )
    .bind(&key)
    .fetch_one(&mut *tx)
    .await?;

    if occupied {
        tx.rollback().await?;
        return Err(AppError::SlotTaken);
    }

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            session_token, cancel_token, reschedule_token,
            date, time, start_at, end_at, timezone, slot_key,
            status, expires_at, locale
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'held', $10, $11)
        RETURNING *
        "#,
    )
    .bind(&session_token)
    .bind(&cancel_token)
    .bind(&reschedule_token)
    .bind(request.date)
    .bind(request.time)
    .bind(start_at)
    .bind(end_at)
    .bind(&request.timezone)
    .bind(&key)
    .bind(expires_at)
    .bind(&request.locale)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(booking_id = %booking.id, slot = %key, "slot held");

    Ok(HoldResponse {
        session_token,
        booking: (&booking).into(),
    })
}

/// Confirm a held booking, attaching contact and ROI data.
///
/// # Process
///
/// 1. Validate contact fields and the ROI payload (no store access)
/// 2. Look up the hold by session token and run the state guard
/// 3. Conditioned update: the write only lands if the row is still a live
///    hold at write time, so a racing expiry or double confirm loses
/// 4. Dispatch the confirmation notification (failure never unconfirms)
///
/// # Errors
///
/// - `TokenInvalid`: no booking matches the session token
/// - `TokenExpired`: the hold lapsed before confirmation
/// - `BookingNotHeld`: already confirmed or cancelled
/// - `RoiRequired`: ROI payload missing or empty
/// - `Validation`: malformed contact fields
/// - `Database`: store error
pub async fn confirm_booking(
    pool: &DbPool,
    notifier: &Notifier,
    request: ConfirmRequest,
) -> Result<ConfirmResponse, AppError> {
    let contact = Contact::try_from(request.contact)?;
    validate_roi(&request.roi)?;

    let now = Utc::now();

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE session_token = $1")
        .bind(&request.session_token)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    check_confirmable(&booking.status, booking.expires_at, now)?;

    // Conditioned write: status and expiry are re-checked by the store, not
    // trusted from the read above.
    let confirmed = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = 'confirmed',
            confirmed_at = $2,
            expires_at = NULL,
            contact_full_name = $3,
            contact_email = $4,
            contact_phone = $5,
            contact_clinic_name = $6,
            contact_message = $7,
            roi = $8,
            updated_at = NOW()
        WHERE session_token = $1 AND status = 'held' AND expires_at > $2
        RETURNING *
        "#,
    )
    .bind(&request.session_token)
    .bind(now)
    .bind(&contact.full_name)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.clinic_name)
    .bind(&contact.message)
    .bind(&request.roi)
    .fetch_optional(pool)
    .await?;

    let booking = match confirmed {
        Some(booking) => booking,
        // Lost the race between the guard and the write. Re-read to report
        // the accurate reason.
        None => {
            let current =
                sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE session_token = $1")
                    .bind(&request.session_token)
                    .fetch_optional(pool)
                    .await?
                    .ok_or(AppError::TokenInvalid)?;
            check_confirmable(&current.status, current.expires_at, Utc::now())?;
            return Err(AppError::BookingNotHeld);
        }
    };

    tracing::info!(booking_id = %booking.id, slot = %booking.slot_key, "booking confirmed");

    let notification = notifier.dispatch_confirmation(pool, &booking).await;

    Ok(ConfirmResponse {
        booking: (&booking).into(),
        cancel_token: booking.cancel_token.clone(),
        reschedule_token: booking.reschedule_token.clone(),
        notification,
    })
}

/// Cancel a booking via its cancel capability token.
///
/// Idempotent: cancelling an already-cancelled booking succeeds and is a
/// no-op in effect. No occupancy re-check is needed, since cancellation
/// only ever removes occupancy.
///
/// # Errors
///
/// - `TokenInvalid`: no booking matches the cancel token
/// - `Database`: store error
pub async fn cancel_booking(
    pool: &DbPool,
    request: CancelRequest,
) -> Result<CancelResponse, AppError> {
    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = 'cancelled', expires_at = NULL, updated_at = NOW()
        WHERE cancel_token = $1
        RETURNING *
        "#,
    )
    .bind(&request.cancel_token)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::TokenInvalid)?;

    tracing::info!(booking_id = %booking.id, slot = %booking.slot_key, "booking cancelled");

    Ok(CancelResponse {
        id: booking.id,
        status: BookingStatus::Cancelled.as_str().to_string(),
    })
}

/// Pre-store validation for a hold request: timezone, grid membership, and
/// the calendar bookability rules, each mapped to its rejection code.
fn validate_hold_request(
    request: &HoldRequest,
    now: chrono::DateTime<Utc>,
) -> Result<(), AppError> {
    if request.timezone != calendar::CLINIC_TIMEZONE {
        return Err(AppError::InvalidTimezone);
    }
    if !calendar::is_valid_slot_start(request.time) {
        return Err(AppError::InvalidDate);
    }
    calendar::check_date_bookable(request.date, calendar::clinic_now(now))?;
    Ok(())
}

/// State guard for confirmation: the booking must be a live hold.
///
/// A lapsed hold is reported as `TOKEN_EXPIRED` whether or not the sweeper
/// has materialized it yet, and is never silently resurrected. Confirmed
/// and cancelled rows are `BOOKING_NOT_HELD`.
fn check_confirmable(
    status: &str,
    expires_at: Option<chrono::DateTime<Utc>>,
    now: chrono::DateTime<Utc>,
) -> Result<(), AppError> {
    if status == BookingStatus::Expired.as_str() {
        return Err(AppError::TokenExpired);
    }
    if status != BookingStatus::Held.as_str() {
        return Err(AppError::BookingNotHeld);
    }
    match expires_at {
        Some(expiry) if now > expiry => Err(AppError::TokenExpired),
        Some(_) => Ok(()),
        // A held row always carries an expiry; a missing one means the
        // hold is no longer live.
        None => Err(AppError::TokenExpired),
    }
}

/// The ROI payload must be a JSON object with at least one entry.
fn validate_roi(roi: &serde_json::Value) -> Result<(), AppError> {
    match roi.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err(AppError::RoiRequired),
    }
}

/// Generate an opaque capability token: 32 random bytes, hex-encoded.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone};

    fn hold_request(date: &str, time: &str, timezone: &str) -> HoldRequest {
        serde_json::from_value(serde_json::json!({
            "date": date,
            "time": time,
            "timezone": timezone,
        }))
        .unwrap()
    }

    // 2026-02-16 is a Monday; 10:00 Madrid is 09:00 UTC.
    fn monday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn hold_rejects_unsupported_timezone() {
        let request = hold_request("2026-02-16", "09:00", "America/New_York");
        assert!(matches!(
            validate_hold_request(&request, monday_morning()),
            Err(AppError::InvalidTimezone)
        ));
    }

    #[test]
    fn hold_rejects_off_grid_time() {
        let request = hold_request("2026-02-16", "08:15", "Europe/Madrid");
        assert!(matches!(
            validate_hold_request(&request, monday_morning()),
            Err(AppError::InvalidDate)
        ));
    }

    #[test]
    fn hold_rejects_weekend_with_specific_code() {
        let request = hold_request("2026-02-21", "09:00", "Europe/Madrid");
        assert!(matches!(
            validate_hold_request(&request, monday_morning()),
            Err(AppError::WeekendNotAllowed)
        ));
    }

    #[test]
    fn hold_rejects_past_date() {
        let request = hold_request("2026-02-13", "09:00", "Europe/Madrid");
        assert!(matches!(
            validate_hold_request(&request, monday_morning()),
            Err(AppError::DateInPast)
        ));
    }

    #[test]
    fn same_day_hold_honors_the_cutoff_boundary() {
        let request = hold_request("2026-02-16", "17:00", "Europe/Madrid");

        // 18:59:59 Madrid == 17:59:59 UTC in February.
        let just_before = Utc.with_ymd_and_hms(2026, 2, 16, 17, 59, 59).unwrap();
        assert!(validate_hold_request(&request, just_before).is_ok());

        let at_cutoff = Utc.with_ymd_and_hms(2026, 2, 16, 18, 0, 0).unwrap();
        assert!(matches!(
            validate_hold_request(&request, at_cutoff),
            Err(AppError::CutoffExceeded)
        ));
    }

    #[test]
    fn hold_rejects_beyond_horizon_as_invalid_date() {
        // 63 days out from a Monday is again a Monday, past the 60-day
        // horizon but clear of the weekend rule.
        let far = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap() + TimeDelta::days(63);
        let request = hold_request(&far.format("%Y-%m-%d").to_string(), "09:00", "Europe/Madrid");
        assert!(matches!(
            validate_hold_request(&request, monday_morning()),
            Err(AppError::InvalidDate)
        ));
    }

    #[test]
    fn valid_hold_request_passes() {
        let request = hold_request("2026-02-16", "09:00", "Europe/Madrid");
        assert!(validate_hold_request(&request, monday_morning()).is_ok());
    }

    #[test]
    fn live_hold_is_confirmable() {
        let now = monday_morning();
        assert!(check_confirmable("held", Some(now + TimeDelta::minutes(5)), now).is_ok());
    }

    #[test]
    fn expired_hold_fails_with_token_expired() {
        let now = monday_morning();
        assert!(matches!(
            check_confirmable("held", Some(now - TimeDelta::seconds(1)), now),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn confirmed_and_cancelled_fail_with_booking_not_held() {
        let now = monday_morning();
        for status in ["confirmed", "cancelled"] {
            assert!(
                matches!(
                    check_confirmable(status, None, now),
                    Err(AppError::BookingNotHeld)
                ),
                "status {status} must not be confirmable"
            );
        }
    }

    #[test]
    fn materialized_expired_hold_still_reports_token_expired() {
        assert!(matches!(
            check_confirmable("expired", None, monday_morning()),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn roi_must_be_a_non_empty_object() {
        assert!(validate_roi(&serde_json::json!({"monthly_savings": 1240})).is_ok());
        assert!(matches!(
            validate_roi(&serde_json::json!({})),
            Err(AppError::RoiRequired)
        ));
        assert!(matches!(
            validate_roi(&serde_json::Value::Null),
            Err(AppError::RoiRequired)
        ));
        assert!(matches!(
            validate_roi(&serde_json::json!("1240")),
            Err(AppError::RoiRequired)
        ));
    }

    #[test]
    fn tokens_are_opaque_and_independent() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hold_expiry_uses_the_hold_duration() {
        let now = monday_morning();
        assert_eq!(now + calendar::hold_duration(), now + TimeDelta::minutes(10));
    }

    #[test]
    fn slot_key_matches_request_fields() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(slot_key(date, time), "2026-02-16T09:00");
    }
}
