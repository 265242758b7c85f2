use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::db::{DocumentStore, StoreResult};

/// Used when a zero period is requested
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Delete every document whose expiry is before `now`, active or not.
pub async fn run_sweep(store: &dyn DocumentStore, now: DateTime<Utc>) -> StoreResult<u64> {
    let expired = store.list_expired(now).await?;
    if expired.is_empty() {
        debug!("Sweep found no expired documents");
        return Ok(0);
    }
    for doc in &expired {
        debug!(
            "Expiring document {} of session {} (expired {})",
            doc.document_id, doc.session_id, doc.expires_at
        );
    }

    let deleted = store.delete_expired(now).await?;
    info!("Sweep removed {} expired documents", deleted);
    Ok(deleted)
}

/// Run [`run_sweep`] every `period` until the runtime shuts down.
///
/// Each run is its own task, so a failing or panicking sweep is logged and
/// the next tick still fires.
pub fn spawn_sweeper(store: Arc<dyn DocumentStore>, period: Duration) -> JoinHandle<()> {
    let period = if period.is_zero() {
        warn!("Sweep period must be positive, using {:?}", DEFAULT_SWEEP_PERIOD);
        DEFAULT_SWEEP_PERIOD
    } else {
        period
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Expiration sweeper running every {:?}", period);
        loop {
            interval.tick().await;
            let store = store.clone();
            let run = tokio::spawn(async move { run_sweep(store.as_ref(), Utc::now()).await });
            match run.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Expiration sweep failed: {}", e),
                Err(e) => error!("Expiration sweep aborted: {}", e),
            }
        }
    })
}
