use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::sync::service::CalendarFeedService;

/// Periodic non-forced ingestion for a live-rendered widget. The task is
/// aborted on `cancel` or drop so teardown never leaks a timer.
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn spawn(
        service: Arc<CalendarFeedService>,
        url: String,
        interval: std::time::Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the caller already did
            // an initial ingestion.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = service.events(&url, false).await {
                    tracing::warn!("Periodic refresh of {} failed: {}", url, err);
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
