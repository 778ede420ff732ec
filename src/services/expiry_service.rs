//! Background expiry sweeper for lapsed holds.
//!
//! Correctness does not depend on this task: the availability query and the
//! confirmation guard both treat a past-due hold as not occupying its slot,
//! and the hold path materializes stale holds under the slot lock before
//! inserting. The sweep keeps the table's status column truthful and the
//! partial slot index small.

use std::time::Duration;

use crate::{db::DbPool, error::AppError};

/// How often the sweeper wakes up.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the sweep loop forever. Spawned once at startup; sweep errors are
/// logged and the loop continues.
pub async fn run_sweeper(pool: DbPool) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        ticker.tick().await;
        match sweep_expired_holds(&pool).await {
            Ok(0) => {}
            Ok(swept) => tracing::info!(swept, "expired lapsed holds"),
            Err(e) => tracing::warn!("expiry sweep failed: {e}"),
        }
    }
}

/// Materialize `held -> expired` for every past-due hold.
///
/// Returns the number of rows transitioned.
pub async fn sweep_expired_holds(pool: &DbPool) -> Result<u64, AppError> {
    let swept = sqlx::query(
        r#"
        UPDATE bookings
        SET status = 'expired', expires_at = NULL, updated_at = NOW()
        WHERE status = 'held' AND expires_at <= NOW()
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    Ok(swept)
}
