//! Confirmation-notification dispatch.
//!
//! Delivery itself is an external collaborator: when a notification
//! endpoint is configured, the service POSTs a signed `booking.confirmed`
//! event to it and records the outcome on the booking row. When no endpoint
//! is configured, dispatch is skipped. A delivery failure never fails the
//! confirmation.
//!
//! # Security
//!
//! Payloads are signed with HMAC-SHA256 so the receiving collaborator can
//! verify origin:
//!
//! - `X-Notification-Signature: sha256=<hex_encoded_hmac>`
//! - `X-Notification-Event-Id: <uuid>`

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    models::booking::{Booking, NotificationStatus},
};

type HmacSha256 = Hmac<Sha256>;

const PROVIDER: &str = "webhook";

/// Notification dispatcher, built once from config and shared by handlers.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    endpoint: Option<String>,
    secret: Option<String>,
}

/// Event body POSTed to the notification endpoint.
#[derive(Debug, Serialize)]
struct NotificationPayload {
    event_type: String,
    event_id: Uuid,
    created_at: DateTime<Utc>,
    data: BookingEventData,
}

/// Booking fields the notification collaborator needs to compose the
/// outbound message (email provider, CRM, etc.).
#[derive(Debug, Serialize)]
struct BookingEventData {
    booking_id: Uuid,
    date: String,
    time: String,
    timezone: String,
    contact_full_name: Option<String>,
    contact_email: Option<String>,
    locale: String,
}

impl Notifier {
    /// Build the dispatcher. The endpoint and secret come validated from
    /// [`Config::from_env`]; both set means dispatch is enabled.
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            endpoint: config.notification_webhook_url.clone(),
            secret: config.notification_secret.clone(),
        }
    }

    /// Dispatch the confirmation event for `booking` and record the outcome
    /// on its row.
    ///
    /// Returns the status reported to the client: `skipped` when no
    /// endpoint is configured, otherwise `ok` or `error`. Recording
    /// failures are logged and folded into the returned status, never
    /// propagated.
    pub async fn dispatch_confirmation(
        &self,
        pool: &DbPool,
        booking: &Booking,
    ) -> NotificationStatus {
        let (Some(endpoint), Some(secret)) = (&self.endpoint, &self.secret) else {
            return NotificationStatus::Skipped;
        };

        let event_id = Uuid::new_v4();
        let outcome = self.send(endpoint, secret, event_id, booking).await;

        let (sent, error) = match &outcome {
            Ok(()) => (true, None),
            Err(message) => {
                tracing::error!(booking_id = %booking.id, error = %message, "notification dispatch failed");
                (false, Some(message.clone()))
            }
        };

        let recorded = sqlx::query(
            r#"
            UPDATE bookings
            SET notification_sent = $2,
                notification_error = $3,
                notification_provider = $4,
                notification_message_id = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(sent)
        .bind(&error)
        .bind(PROVIDER)
        .bind(event_id.to_string())
        .execute(pool)
        .await;

        if let Err(e) = recorded {
            tracing::error!(booking_id = %booking.id, "failed to record notification outcome: {e}");
        }

        if sent {
            NotificationStatus::Ok
        } else {
            NotificationStatus::Error
        }
    }

    async fn send(
        &self,
        endpoint: &str,
        secret: &str,
        event_id: Uuid,
        booking: &Booking,
    ) -> Result<(), String> {
        let payload = NotificationPayload {
            event_type: "booking.confirmed".to_string(),
            event_id,
            created_at: Utc::now(),
            data: BookingEventData {
                booking_id: booking.id,
                date: booking.date.format("%Y-%m-%d").to_string(),
                time: booking.time.format("%H:%M").to_string(),
                timezone: booking.timezone.clone(),
                contact_full_name: booking.contact_full_name.clone(),
                contact_email: booking.contact_email.clone(),
                locale: booking.locale.clone(),
            },
        };

        let body = serde_json::to_string(&payload).map_err(|e| e.to_string())?;
        let signature = sign_payload(secret, &body);

        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .header("X-Notification-Signature", signature)
            .header("X-Notification-Event-Id", event_id.to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("endpoint returned {}", response.status()))
        }
    }
}

/// Generate the HMAC-SHA256 signature for a notification payload.
///
/// Format: `sha256=<hex_encoded_hmac>`. Receivers verify by recomputing
/// over the raw request body and comparing in constant time.
fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
