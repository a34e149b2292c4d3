use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::DbPool;
use crate::models::poll;

/// Periodically persist CLOSED for polls past their closing time.
/// Runs until `cancel` fires.
pub fn spawn_sweeper(pool: DbPool, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Expiry sweeper stopped");
                    break;
                }
                _ = interval.tick() => sweep(&pool).await,
            }
        }
    })
}

async fn sweep(pool: &DbPool) {
    match poll::close_expired(pool, Utc::now()).await {
        Ok(0) => log::debug!("Expiry sweep: nothing to close"),
        Ok(n) => log::info!("Expiry sweep closed {n} poll(s)"),
        Err(e) => log::error!("Expiry sweep failed: {e}"),
    }
}
