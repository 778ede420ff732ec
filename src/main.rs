//! Vetbook API - Main Application Entry Point
//!
//! This is the booking backend for a veterinary-clinic SaaS marketing site. The embedded widget reserves a 30-minute appointment slot, holds it for 10 minutes, and confirms it into a persisted booking.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Concurrency**: slot-scoped advisory locks + conditioned writes
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Spawn the hold-expiry sweeper
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod calendar;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use tracing_subscriber::EnvFilter;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::notification_service::Notifier;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: db::DbPool,
    pub notifier: Notifier,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Materialize lapsed holds in the background. Availability and
    // confirmation stay correct without it via lazy expiry checks.
    tokio::spawn(services::expiry_service::run_sweeper(pool.clone()));

    let state = AppState {
        pool,
        notifier: Notifier::from_config(&config),
    };

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        // Availability read path
        .route(
            "/api/v1/availability",
            get(handlers::availability::get_availability),
        )
        // Booking lifecycle: hold -> confirm | cancel
        .route("/api/v1/bookings/hold", post(handlers::bookings::create_hold))
        .route(
            "/api/v1/bookings/confirm",
            post(handlers::bookings::confirm_booking),
        )
        .route(
            "/api/v1/bookings/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/v1/bookings/cancel/{token}",
            get(handlers::bookings::cancel_booking_by_link),
        )
        // The widget is embedded on the marketing site, a different origin
        .layer(CorsLayer::permissive())
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
