//! Slot availability HTTP handler.
//!
//! Implements `GET /api/v1/availability?date=YYYY-MM-DD`: the full daily
//! grid with each slot marked available or occupied.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    AppState,
    calendar,
    error::AppError,
    services::availability_service::{self, DayAvailability},
};

/// Query parameters for the availability endpoint.
///
/// The date arrives as a raw string so a malformed value maps to a
/// field-level validation error instead of a framework rejection.
#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub date: String,
}

/// Get the availability grid for one day.
///
/// # Response (200)
///
/// ```json
/// {
///   "date": "2026-02-16",
///   "timezone": "Europe/Madrid",
///   "slots": [
///     { "time": "09:00", "start_at": "2026-02-16T08:00:00Z",
///       "end_at": "2026-02-16T08:30:00Z", "available": false },
///     { "time": "09:30", "start_at": "2026-02-16T08:30:00Z",
///       "end_at": "2026-02-16T09:00:00Z", "available": true }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - **400** `VALIDATION_ERROR`: malformed date
/// - **422** `DATE_IN_PAST` / `WEEKEND_NOT_ALLOWED` / `CUTOFF_EXCEEDED` /
///   `INVALID_DATE`: date not bookable
/// - **503** `SERVICE_UNAVAILABLE`: store unreachable
pub async fn get_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<DayAvailability>, AppError> {
    let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date: must be formatted YYYY-MM-DD".to_string()))?;

    // Unbookable days never have a grid worth rendering; reject them with
    // the same codes the hold path uses.
    calendar::check_date_bookable(date, calendar::clinic_now(Utc::now()))?;

    let day = availability_service::resolve_day(&state.pool, date).await?;

    Ok(Json(day))
}
