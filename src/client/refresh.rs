use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::api::ApiClient;
use super::session::Session;
use crate::dto::PollDto;

pub const DEFAULT_REFRESH: Duration = Duration::from_secs(30);

/// Shorter periods, zero included, are raised to this.
pub const MIN_REFRESH: Duration = Duration::from_millis(100);

/// Latest poll list; every reload replaces it wholesale.
pub type PollFeed = Arc<watch::Sender<Vec<PollDto>>>;

/// Background task that re-fetches the poll list on a fixed period for
/// one session. Stopping it cancels the loop and waits for it to exit.
pub struct Refresher {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Refresher {
    /// Start reloading every `period`. The first fetch happens one period
    /// from now; callers load the list themselves right after sign-in.
    pub fn start(api: ApiClient, session: Session, period: Duration, feed: PollFeed) -> Self {
        let period = period.max(MIN_REFRESH);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::debug!("Refreshing polls every {}s for user {}", period.as_secs_f32(), session.user.id);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let result = tokio::select! {
                            _ = token.cancelled() => break,
                            result = api.list_polls(&session) => result,
                        };
                        match result {
                            Ok(polls) => {
                                log::debug!("Refresh loaded {} poll(s)", polls.len());
                                feed.send_replace(polls);
                            }
                            Err(e) => log::warn!("Failed to load polls: {e}"),
                        }
                    }
                }
            }
            log::debug!("Poll refresh stopped for user {}", session.user.id);
        });
        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the loop and wait until the task has exited. An in-flight
    /// request is dropped, so no snapshot lands after this returns.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            log::warn!("Poll refresh task ended abnormally: {e}");
        }
    }
}
