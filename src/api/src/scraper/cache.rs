//! In-memory events cache with a freshness window and stale fallback.
//!
//! Fresh data is served without touching the source. Once the window has
//! passed, the next caller refreshes; callers that arrive while a refresh is
//! running wait for it and share its outcome instead of launching their own
//! browser. A failed refresh keeps serving whatever was cached before, and
//! only surfaces an error when nothing was ever fetched.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::classify::partition;
use super::clock::Clock;
use super::source::EventSource;
use crate::error::{CacheError, FetchError};
use crate::types::EventsResult;

/// Cache entry with timestamp
#[derive(Debug, Clone)]
struct CacheEntry {
    data: EventsResult,
    cached_at: DateTime<Utc>,
}

/// Where the cache stands relative to its freshness window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheState::Empty => "empty",
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
        };
        f.write_str(name)
    }
}

/// Outcome of the most recent refresh attempt, shared with waiting callers
#[derive(Default)]
struct RefreshSlot {
    last_error: Option<FetchError>,
}

pub struct EventsCache {
    source: Arc<dyn EventSource>,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    entry: RwLock<Option<CacheEntry>>,
    /// Held for the duration of a refresh
    refresh: Mutex<RefreshSlot>,
    /// Completed refresh attempts, successful or not
    attempts: AtomicU64,
}

impl EventsCache {
    pub fn new(source: Arc<dyn EventSource>, clock: Arc<dyn Clock>, freshness: Duration) -> Self {
        Self {
            source,
            clock,
            freshness,
            entry: RwLock::new(None),
            refresh: Mutex::new(RefreshSlot::default()),
            attempts: AtomicU64::new(0),
        }
    }

    /// Current state, without triggering a refresh
    pub async fn state(&self) -> CacheState {
        let entry = self.entry.read().await;
        match entry.as_ref() {
            None => CacheState::Empty,
            Some(entry) if self.is_fresh(entry) => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }

    /// Events from cache, refreshing from the source when empty or stale.
    ///
    /// Fails only when the refresh fails and nothing has ever been cached.
    pub async fn get_events(&self) -> Result<EventsResult, CacheError> {
        if let Some(data) = self.fresh_data().await {
            debug!("Returning cached events");
            return Ok(data);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut slot = self.refresh.lock().await;

        if self.attempts.load(Ordering::Acquire) != seen {
            // A refresh finished while we waited for the lock; take its outcome
            debug!("Joining result of concurrent events refresh");
            return match self.cached_data().await {
                Some(data) => Ok(data),
                None => Err(CacheError::Unavailable(slot.last_error.clone().unwrap_or_else(
                    || FetchError::Browser("concurrent refresh failed".to_string()),
                ))),
            };
        }

        if let Some(data) = self.fresh_data().await {
            return Ok(data);
        }

        let outcome = self.refresh_from_source().await;
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match outcome {
            Ok(data) => {
                slot.last_error = None;
                Ok(data)
            }
            Err(e) => {
                slot.last_error = Some(e.clone());
                match self.cached_data().await {
                    Some(stale) => {
                        warn!("Failed to refresh events, serving stale cache: {}", e);
                        Ok(stale)
                    }
                    None => {
                        error!("Failed to fetch events with nothing cached: {}", e);
                        Err(CacheError::Unavailable(e))
                    }
                }
            }
        }
    }

    /// Fetch, classify and store. Leaves the entry untouched on failure.
    async fn refresh_from_source(&self) -> Result<EventsResult, FetchError> {
        info!("Fetching fresh events data");
        let events = self.source.fetch_events().await?;

        let now = self.clock.now();
        let data = partition(events, self.clock.current_year());
        info!(
            "Events cached: {} upcoming, {} past",
            data.upcoming_events.len(),
            data.past_events.len()
        );

        *self.entry.write().await = Some(CacheEntry {
            data: data.clone(),
            cached_at: now,
        });

        Ok(data)
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.clock.now() - entry.cached_at < self.freshness
    }

    async fn fresh_data(&self) -> Option<EventsResult> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.data.clone())
    }

    async fn cached_data(&self) -> Option<EventsResult> {
        self.entry.read().await.as_ref().map(|entry| entry.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::clock::testing::ManualClock;
    use crate::types::Event;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex as StdMutex;

    /// Source that replays queued outcomes and counts calls
    struct ScriptedSource {
        outcomes: StdMutex<Vec<Result<Vec<Event>, FetchError>>>,
        calls: AtomicU32,
        delay: std::time::Duration,
    }

    impl ScriptedSource {
        fn new(outcomes: Vec<Result<Vec<Event>, FetchError>>) -> Arc<Self> {
            Self::with_delay(outcomes, std::time::Duration::ZERO)
        }

        fn with_delay(
            mut outcomes: Vec<Result<Vec<Event>, FetchError>>,
            delay: std::time::Duration,
        ) -> Arc<Self> {
            outcomes.reverse();
            Arc::new(Self {
                outcomes: StdMutex::new(outcomes),
                calls: AtomicU32::new(0),
                delay,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(FetchError::Browser("script exhausted".to_string())))
        }
    }

    fn event(id: &str, is_past: bool, date: &str) -> Event {
        Event {
            id: id.to_string(),
            title: format!("Event {}", id),
            date: date.to_string(),
            is_past,
            ..Default::default()
        }
    }

    fn failure() -> FetchError {
        FetchError::NavigationTimeout {
            url: "https://campus.hellorubric.com/?eid=51375".to_string(),
            timeout: std::time::Duration::from_secs(30),
        }
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn cache(source: Arc<ScriptedSource>) -> (Arc<EventsCache>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = EventsCache::new(source, clock.clone(), Duration::hours(1));
        (Arc::new(cache), clock)
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_source() {
        let source = ScriptedSource::new(vec![Ok(vec![event("1", false, "")])]);
        let (cache, clock) = cache(source.clone());

        let first = cache.get_events().await.unwrap();
        clock.advance(Duration::minutes(59));
        let second = cache.get_events().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(cache.state().await, CacheState::Fresh);
    }

    #[tokio::test]
    async fn test_classifies_with_clock_year() {
        let source = ScriptedSource::new(vec![Ok(vec![
            event("up", false, ""),
            event("old", true, "Sat 4 May 2024"),
            event("recent", true, "Sat 3 May 2025"),
            event("undated", true, "Jan 5"),
        ])]);
        let (cache, _clock) = cache(source);

        let result = cache.get_events().await.unwrap();
        let past: Vec<_> = result.past_events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(result.upcoming_events.len(), 1);
        assert_eq!(past, vec!["recent", "undated"]);
    }

    #[tokio::test]
    async fn test_stale_cache_refreshes() {
        let source = ScriptedSource::new(vec![
            Ok(vec![event("1", false, "")]),
            Ok(vec![event("2", false, "")]),
        ]);
        let (cache, clock) = cache(source.clone());

        cache.get_events().await.unwrap();
        clock.advance(Duration::hours(1));
        assert_eq!(cache.state().await, CacheState::Stale);

        let refreshed = cache.get_events().await.unwrap();
        assert_eq!(refreshed.upcoming_events[0].id, "2");
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.state().await, CacheState::Fresh);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_stale() {
        let source = ScriptedSource::new(vec![Ok(vec![event("1", false, "")]), Err(failure())]);
        let (cache, clock) = cache(source.clone());

        let original = cache.get_events().await.unwrap();
        clock.advance(Duration::hours(2));

        let served = cache.get_events().await.unwrap();
        assert_eq!(served, original);
        assert_eq!(source.calls(), 2);
        // Timestamp is not bumped by a failed refresh
        assert_eq!(cache.state().await, CacheState::Stale);
    }

    #[tokio::test]
    async fn test_stale_retries_source_on_every_request() {
        let source = ScriptedSource::new(vec![
            Ok(vec![event("1", false, "")]),
            Err(failure()),
            Err(failure()),
            Ok(vec![event("3", false, "")]),
        ]);
        let (cache, clock) = cache(source.clone());

        cache.get_events().await.unwrap();
        clock.advance(Duration::hours(1));

        assert_eq!(cache.get_events().await.unwrap().upcoming_events[0].id, "1");
        assert_eq!(cache.get_events().await.unwrap().upcoming_events[0].id, "1");
        assert_eq!(cache.get_events().await.unwrap().upcoming_events[0].id, "3");
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn test_empty_cache_failure_is_error() {
        let source = ScriptedSource::new(vec![Err(failure()), Ok(vec![event("1", false, "")])]);
        let (cache, _clock) = cache(source.clone());

        let result = cache.get_events().await;
        assert!(matches!(
            result,
            Err(CacheError::Unavailable(FetchError::NavigationTimeout { .. }))
        ));
        assert_eq!(cache.state().await, CacheState::Empty);

        // Next request tries again
        assert!(cache.get_events().await.is_ok());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_refresh() {
        let source = ScriptedSource::with_delay(
            vec![Ok(vec![event("1", false, "")])],
            std::time::Duration::from_millis(50),
        );
        let (cache, _clock) = cache(source.clone());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_events().await })
            })
            .collect();

        for task in tasks {
            let result = task.await.unwrap().unwrap();
            assert_eq!(result.upcoming_events[0].id, "1");
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_failure() {
        let source = ScriptedSource::with_delay(
            vec![Err(failure()), Ok(vec![event("1", false, "")])],
            std::time::Duration::from_millis(50),
        );
        let (cache, _clock) = cache(source.clone());

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_events().await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_err());
        }
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CacheState::Empty.to_string(), "empty");
        assert_eq!(CacheState::Fresh.to_string(), "fresh");
        assert_eq!(CacheState::Stale.to_string(), "stale");
    }
}
