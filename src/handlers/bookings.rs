//! Booking HTTP handlers.
//!
//! This module implements the booking lifecycle API endpoints:
//! - POST /api/v1/bookings/hold - Place a temporary hold on a slot
//! - POST /api/v1/bookings/confirm - Confirm a held booking
//! - POST /api/v1/bookings/cancel - Cancel via cancel token
//! - GET /api/v1/bookings/cancel/:token - Cancel via emailed link

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppError,
    models::booking::{
        CancelRequest, CancelResponse, ConfirmRequest, ConfirmResponse, HoldRequest, HoldResponse,
    },
    services::booking_service,
};

/// Place a temporary hold on a slot.
///
/// # Request Body
///
/// ```json
/// {
///   "date": "2026-02-16",
///   "time": "09:00",
///   "timezone": "Europe/Madrid",
///   "locale": "es"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "session_token": "4f9a...",
///   "booking": {
///     "id": "770e8400-...",
///     "date": "2026-02-16",
///     "time": "09:00",
///     "status": "held",
///     "expires_at": "2026-02-16T08:10:00Z"
///   }
/// }
/// ```
///
/// # Errors
///
/// `INVALID_TIMEZONE`, `INVALID_DATE`, `DATE_IN_PAST`,
/// `WEEKEND_NOT_ALLOWED`, `CUTOFF_EXCEEDED`, `SLOT_TAKEN`
pub async fn create_hold(
    State(state): State<AppState>,
    Json(request): Json<HoldRequest>,
) -> Result<(StatusCode, Json<HoldResponse>), AppError> {
    let response = booking_service::create_hold(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Confirm a held booking, attaching contact details and the ROI payload.
///
/// On success the response carries the cancel and reschedule capability
/// tokens and the notification-dispatch status.
///
/// # Errors
///
/// `TOKEN_INVALID`, `TOKEN_EXPIRED`, `BOOKING_NOT_HELD`, `ROI_REQUIRED`,
/// `VALIDATION_ERROR`
pub async fn confirm_booking(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let response = booking_service::confirm_booking(&state.pool, &state.notifier, request).await?;
    Ok(Json(response))
}

/// Cancel a booking (JSON body form).
///
/// Idempotent: re-cancelling an already-cancelled booking succeeds.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, AppError> {
    let response = booking_service::cancel_booking(&state.pool, request).await?;
    Ok(Json(response))
}

/// Cancel a booking via the link form (`GET .../cancel/{token}`).
///
/// Confirmation emails carry a plain link, so cancellation is also reachable
/// without a JSON body.
pub async fn cancel_booking_by_link(
    State(state): State<AppState>,
    Path(cancel_token): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let response = booking_service::cancel_booking(&state.pool, CancelRequest { cancel_token }).await?;
    Ok(Json(response))
}
