//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::calendar::NotBookable;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and a machine-readable
/// error code. Callers use the code to distinguish "fix your input and
/// retry" (validation, 4xx) from "retry later" (store failures, 503) from
/// "this token/slot is permanently unusable" (business rejections).
///
/// # Error Categories
///
/// - **Store Errors**: Any sqlx::Error from database operations
/// - **Input Validation Errors**: Malformed dates, times, contact fields
/// - **Business-Rule Rejections**: Weekend, past date, cutoff, slot taken,
///   token invalid/expired, booking not held, ROI missing
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error, timeout).
    ///
    /// Returns HTTP 503 Service Unavailable with a generic message; store
    /// details never leak to clients. Retryable with backoff.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested timezone is not the single supported clinic timezone.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Unsupported timezone")]
    InvalidTimezone,

    /// Date or time is malformed or not on the booking grid.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Invalid booking date or time")]
    InvalidDate,

    /// Requested date is in the past.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Date is in the past")]
    DateInPast,

    /// Requested date falls on a weekend.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Weekend bookings are not available")]
    WeekendNotAllowed,

    /// Same-day booking requested after the daily cutoff.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Same-day booking cutoff has passed")]
    CutoffExceeded,

    /// Slot is already held or confirmed by another booking.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Slot is no longer available")]
    SlotTaken,

    /// No booking matches the supplied capability token.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Unknown booking token")]
    TokenInvalid,

    /// The hold behind this session token has lapsed.
    ///
    /// Returns HTTP 410 Gone.
    #[error("Booking hold has expired")]
    TokenExpired,

    /// Booking is not in the `held` state (already confirmed or cancelled).
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Booking is not awaiting confirmation")]
    BookingNotHeld,

    /// Confirmation requires a non-empty ROI payload.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("ROI data is required to confirm")]
    RoiRequired,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains field-level detail about what was invalid.
    #[error("Invalid request")]
    Validation(String),
}

/// Map a calendar-rule rejection to its client-facing error code.
///
/// The horizon limit has no dedicated code; dates beyond it are reported
/// as the generic `INVALID_DATE`.
impl From<NotBookable> for AppError {
    fn from(reason: NotBookable) -> Self {
        match reason {
            NotBookable::InPast => AppError::DateInPast,
            NotBookable::Weekend => AppError::WeekendNotAllowed,
            NotBookable::AfterCutoff => AppError::CutoffExceeded,
            NotBookable::BeyondHorizon => AppError::InvalidDate,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "SLOT_TAKEN",
///     "message": "Slot is no longer available"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl AppError {
    /// Map each error variant to (HTTP status, error code, message).
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable, please retry".to_string(),
            ),
            AppError::InvalidTimezone => (
                StatusCode::BAD_REQUEST,
                "INVALID_TIMEZONE",
                self.to_string(),
            ),
            AppError::InvalidDate => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_DATE",
                self.to_string(),
            ),
            AppError::DateInPast => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DATE_IN_PAST",
                self.to_string(),
            ),
            AppError::WeekendNotAllowed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "WEEKEND_NOT_ALLOWED",
                self.to_string(),
            ),
            AppError::CutoffExceeded => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CUTOFF_EXCEEDED",
                self.to_string(),
            ),
            AppError::SlotTaken => (StatusCode::CONFLICT, "SLOT_TAKEN", self.to_string()),
            AppError::TokenInvalid => (StatusCode::NOT_FOUND, "TOKEN_INVALID", self.to_string()),
            AppError::TokenExpired => (StatusCode::GONE, "TOKEN_EXPIRED", self.to_string()),
            AppError::BookingNotHeld => {
                (StatusCode::CONFLICT, "BOOKING_NOT_HELD", self.to_string())
            }
            AppError::RoiRequired => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ROI_REQUIRED",
                self.to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_map_to_specific_codes() {
        let cases = [
            (
                AppError::InvalidTimezone,
                StatusCode::BAD_REQUEST,
                "INVALID_TIMEZONE",
            ),
            (
                AppError::DateInPast,
                StatusCode::UNPROCESSABLE_ENTITY,
                "DATE_IN_PAST",
            ),
            (
                AppError::WeekendNotAllowed,
                StatusCode::UNPROCESSABLE_ENTITY,
                "WEEKEND_NOT_ALLOWED",
            ),
            (
                AppError::CutoffExceeded,
                StatusCode::UNPROCESSABLE_ENTITY,
                "CUTOFF_EXCEEDED",
            ),
            (AppError::SlotTaken, StatusCode::CONFLICT, "SLOT_TAKEN"),
            (AppError::TokenInvalid, StatusCode::NOT_FOUND, "TOKEN_INVALID"),
            (AppError::TokenExpired, StatusCode::GONE, "TOKEN_EXPIRED"),
            (
                AppError::BookingNotHeld,
                StatusCode::CONFLICT,
                "BOOKING_NOT_HELD",
            ),
            (
                AppError::RoiRequired,
                StatusCode::UNPROCESSABLE_ENTITY,
                "ROI_REQUIRED",
            ),
        ];

        for (err, status, code) in cases {
            let (s, c, _) = err.parts();
            assert_eq!(s, status);
            assert_eq!(c, code);
        }
    }

    #[test]
    fn store_errors_are_generic_and_retryable() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "SERVICE_UNAVAILABLE");
        // Store internals must not leak to the client.
        assert!(!message.to_lowercase().contains("pool"));
    }
}
