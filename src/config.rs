//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `NOTIFICATION_WEBHOOK_URL` (optional): endpoint that receives signed
///   `booking.confirmed` events; notification dispatch is skipped when unset
/// - `NOTIFICATION_SECRET` (optional): HMAC key for signing notification
///   payloads, required when the webhook URL is set
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub notification_webhook_url: Option<String>,

    #[serde(default)]
    pub notification_secret: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - A notification webhook URL is set but malformed, or set without a secret
    pub fn from_env() -> anyhow::Result<Self> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(ref webhook_url) = self.notification_webhook_url {
            let parsed = url::Url::parse(webhook_url)
                .map_err(|e| anyhow::anyhow!("NOTIFICATION_WEBHOOK_URL is invalid: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("NOTIFICATION_WEBHOOK_URL must use HTTP or HTTPS");
            }
            if self.notification_secret.is_none() {
                anyhow::bail!("NOTIFICATION_SECRET is required when NOTIFICATION_WEBHOOK_URL is set");
            }
        }
        Ok(())
    }
}
