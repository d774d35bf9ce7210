//! Background flushing of the animation library.

use std::time::Duration;

use flipdot_core::{AnimationStore, StoreError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::metrics;

/// Write the store to disk off the async runtime.
///
/// Returns whether anything was written.
///
/// # Errors
///
/// Returns the store's flush error; the store stays dirty.
pub async fn flush_store(store: &AnimationStore) -> Result<bool, StoreError> {
    let store = store.clone();
    let result = tokio::task::spawn_blocking(move || store.flush())
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
    match &result {
        Ok(true) => metrics::record_flush("written"),
        Ok(false) => metrics::record_flush("clean"),
        Err(_) => metrics::record_flush("failed"),
    }
    result
}

/// Flush `store` every `interval` until aborted.
pub fn spawn_flush_task(store: AnimationStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = flush_store(&store).await {
                tracing::warn!("Failed to flush animation library: {e}");
            }
        }
    })
}
