//! Booking data models and API request/response types.
//!
//! This module defines:
//! - `Booking`: Database entity representing a claim on an appointment slot
//! - `BookingStatus`: the booking lifecycle states
//! - Request types for the hold, confirm, and cancel operations
//! - Public response views returned to clients

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::contact::ContactRequest;

/// Lifecycle state of a booking.
///
/// # State Machine
///
/// ```text
/// held ──> confirmed   (Confirmation Engine)
/// held ──> cancelled   (Cancellation)
/// held ──> expired     (passive, once now > expires_at)
/// ```
///
/// `confirmed`, `cancelled`, and `expired` are terminal. Only `held` and
/// `confirmed` occupy a slot; terminal `expired`/`cancelled` rows never
/// block availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Held,
    Confirmed,
    Expired,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Held => "held",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Expired => "expired",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

/// Represents a booking record from the database.
///
/// # Database Table
///
/// Maps to the `bookings` table. Each booking:
/// - Holds three independent capability tokens (confirm / cancel / reschedule)
/// - Stores the slot redundantly as civil date/time plus UTC instants
/// - Carries a derived `slot_key` under a partial unique index so the store
///   itself rejects a second non-terminal booking for the same slot
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Booking {
    /// Unique identifier for this booking
    pub id: Uuid,

    /// Capability token controlling confirmation (returned from hold)
    pub session_token: String,

    /// Capability token controlling cancellation (returned from confirm)
    pub cancel_token: String,

    /// Capability token reserved for a future reschedule flow
    pub reschedule_token: String,

    /// Civil calendar day of the slot (clinic timezone)
    pub date: NaiveDate,

    /// Civil start time of the slot (clinic timezone)
    pub time: NaiveTime,

    /// Absolute slot start instant
    pub start_at: DateTime<Utc>,

    /// Absolute slot end instant
    pub end_at: DateTime<Utc>,

    /// IANA timezone name; currently always the single supported value
    pub timezone: String,

    /// Derived slot identity, e.g. "2026-02-16T09:00"
    pub slot_key: String,

    /// Lifecycle state: held, confirmed, expired, or cancelled
    pub status: String,

    /// Instant after which a held booking no longer occupies its slot.
    ///
    /// Non-null only while `status = 'held'`; cleared on every transition
    /// out of the held state.
    pub expires_at: Option<DateTime<Utc>>,

    /// Set exactly once, on the transition into `confirmed`
    pub confirmed_at: Option<DateTime<Utc>>,

    pub contact_full_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_clinic_name: Option<String>,
    pub contact_message: Option<String>,

    /// Requested UI locale, kept for the outbound notification
    pub locale: String,

    /// Opaque ROI-calculator payload, attached at confirmation
    pub roi: Option<serde_json::Value>,

    /// Whether the confirmation notification was delivered
    pub notification_sent: bool,
    pub notification_error: Option<String>,
    pub notification_provider: Option<String>,
    pub notification_message_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derive the slot key used for store-level slot exclusion.
///
/// Format: `YYYY-MM-DDTHH:MM`. The same derivation is used on every write
/// path and in the advisory-lock hash, so two requests for the same slot
/// always contend on the same key.
pub fn slot_key(date: NaiveDate, time: NaiveTime) -> String {
    format!("{}T{}", date.format("%Y-%m-%d"), time.format("%H:%M"))
}

/// Request to place a temporary hold on a slot.
///
/// # JSON Example
///
/// ```json
/// {
///   "date": "2026-02-16",
///   "time": "09:00",
///   "timezone": "Europe/Madrid",
///   "locale": "es"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    /// Requested calendar day (must be a bookable weekday)
    pub date: NaiveDate,

    /// Requested slot start time (must be on the 09:00-17:30 grid)
    #[serde(with = "slot_time_format")]
    pub time: NaiveTime,

    /// Must equal the single supported clinic timezone
    pub timezone: String,

    /// UI locale, defaults to "es"
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "es".to_string()
}

/// Serde adapter for `HH:MM` slot times (chrono's default wants seconds).
mod slot_time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

/// Request to confirm a held booking.
///
/// # JSON Example
///
/// ```json
/// {
///   "session_token": "4f9a...",
///   "contact": {
///     "full_name": "Laura Gómez",
///     "email": "laura@clinicasur.es",
///     "phone": "+34 612 345 678",
///     "clinic_name": "Clínica Sur",
///     "message": "Prefiero la mañana"
///   },
///   "roi": { "monthly_savings": 1240 }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub session_token: String,
    pub contact: ContactRequest,

    /// Opaque ROI-calculator output; must be a non-empty object
    pub roi: serde_json::Value,
}

/// Request to cancel a booking via its cancel capability token.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub cancel_token: String,
}

/// Public view of a booking, returned from the hold endpoint.
///
/// Exposes only slot identity, expiry, and status; tokens other than the
/// session token are withheld until confirmation.
#[derive(Debug, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub timezone: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Booking> for BookingView {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            date: booking.date,
            time: booking.time.format("%H:%M").to_string(),
            start_at: booking.start_at,
            end_at: booking.end_at,
            timezone: booking.timezone.clone(),
            status: booking.status.clone(),
            expires_at: booking.expires_at,
        }
    }
}

/// Response body for a successful hold.
#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub session_token: String,
    pub booking: BookingView,
}

/// Outcome of the confirmation-notification dispatch.
///
/// Delivery is delegated to an external collaborator; the core only records
/// whether a dispatch was attempted and how it went.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// No notification endpoint configured
    Skipped,
    /// Dispatch attempted and acknowledged
    Ok,
    /// Dispatch attempted but failed; the booking is still confirmed
    Error,
}

/// Response body for a successful confirmation.
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub booking: BookingView,
    pub cancel_token: String,
    pub reschedule_token: String,
    pub notification: NotificationStatus,
}

/// Response body for a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: Uuid,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_is_stable_and_minute_precise() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(slot_key(date, time), "2026-02-16T09:00");
    }

    #[test]
    fn hold_request_accepts_hh_mm_times() {
        let request: HoldRequest = serde_json::from_value(serde_json::json!({
            "date": "2026-02-16",
            "time": "09:00",
            "timezone": "Europe/Madrid"
        }))
        .unwrap();
        assert_eq!(request.time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(request.locale, "es");
    }

    #[test]
    fn hold_request_rejects_malformed_times() {
        let result = serde_json::from_value::<HoldRequest>(serde_json::json!({
            "date": "2026-02-16",
            "time": "nine",
            "timezone": "Europe/Madrid"
        }));
        assert!(result.is_err());
    }
}
