//! Periodic purge of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::session::SessionStore;

/// Purge expired sessions every `interval` until `shutdown` fires.
pub async fn run_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    // tokio panics on a zero period.
    let interval = interval.max(Duration::from_secs(1));
    tracing::info!(interval_secs = interval.as_secs(), "Session sweeper starting");

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Expired sessions purged");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Session sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
