use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use crate::calendar::CalendarEvent;
use crate::feed;
use crate::layout::{build_render_plan, Period, RenderPlan};
use crate::storage::cache::FeedCache;
use crate::storage::store::StoreError;
use crate::sync::feed_client::{FeedClient, FetchError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Cache error: {0}")]
    Store(#[from] StoreError),
}

/// Ingestion pipeline for one widget: freshness-aware cache in front of
/// fetch-parse-cache cycles, with stale-while-revalidate for entries that
/// still cover today.
pub struct CalendarFeedService {
    client: Arc<FeedClient>,
    cache: Arc<FeedCache>,
    freshness: Duration,
}

impl CalendarFeedService {
    pub fn new(client: FeedClient, cache: FeedCache, freshness: Duration) -> Self {
        Self {
            client: Arc::new(client),
            cache: Arc::new(cache),
            freshness,
        }
    }

    /// The occurrence list for `url`. Non-forced reads prefer the cache:
    /// fresh entries skip the network entirely, and stale entries that still
    /// cover today are returned as-is while one background refresh is
    /// spawned. A forced read always goes to the network but still writes
    /// through the cache.
    pub async fn events(&self, url: &str, force: bool) -> Result<Vec<CalendarEvent>, ServiceError> {
        if !force {
            if let Some(events) = self.cache.get(url, self.freshness).await {
                tracing::debug!("Serving fresh cache for {}", url);
                return Ok(events);
            }
            if let Some(stale) = self.cache.get_allowing_stale(url).await
                && covers_day(&stale.events, Utc::now().date_naive())
            {
                tracing::info!("Serving stale cache for {}, refreshing in background", url);
                self.spawn_background_refresh(url);
                return Ok(stale.events);
            }
        }
        refresh(&self.client, &self.cache, url).await
    }

    /// Render-ready plan for the requested period.
    pub async fn render_plan(
        &self,
        url: &str,
        period: Period,
        today: NaiveDate,
        force: bool,
    ) -> Result<RenderPlan, ServiceError> {
        let events = self.events(url, force).await?;
        Ok(build_render_plan(events, period, today))
    }

    /// Fire-and-forget. May race with a concurrent forced refresh on the
    /// same cache slot; both writes derive from the same feed, last one
    /// wins. Failures are logged and never surfaced.
    fn spawn_background_refresh(&self, url: &str) {
        let client = Arc::clone(&self.client);
        let cache = Arc::clone(&self.cache);
        let url = url.to_string();
        tokio::spawn(async move {
            if let Err(err) = refresh(&client, &cache, &url).await {
                tracing::warn!("Background refresh of {} failed: {}", url, err);
            }
        });
    }
}

async fn refresh(
    client: &FeedClient,
    cache: &FeedCache,
    url: &str,
) -> Result<Vec<CalendarEvent>, ServiceError> {
    let body = client.fetch_ics(url).await?;
    let events = feed::ingest_feed_text(&body, Utc::now());
    cache.put(url, &events).await?;
    Ok(events)
}

/// True when any occurrence's `[start, end)` intersects the given civil day.
pub fn covers_day(events: &[CalendarEvent], day: NaiveDate) -> bool {
    let day_start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    let day_end = day_start + Duration::days(1);
    events
        .iter()
        .any(|e| e.start_instant() < day_end && e.end_instant() > day_start)
}
