use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use haiven_core::{BridgeError, PromptContent, PromptSource};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::snapshot::CatalogSnapshot;

#[derive(Debug, Clone, Copy)]
pub struct CatalogConfig {
    pub summary_ttl: Duration,
    pub content_ttl: Duration,
    /// How long past its TTL a value may still be served while the upstream is unreachable.
    pub stale_grace: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            summary_ttl: Duration::from_secs(300),
            content_ttl: Duration::from_secs(3600),
            stale_grace: Duration::from_secs(900),
        }
    }
}

struct CachedContent {
    value: PromptContent,
    fetched_at: Instant,
}

#[derive(Default)]
struct ContentState {
    entry: Option<CachedContent>,
    last_error: Option<BridgeError>,
}

/// Per-id fetch slot. `attempts` is bumped under the lock after every finished fetch, so a
/// caller that queued behind one can tell it completed and reuse its outcome.
#[derive(Default)]
struct ContentSlot {
    attempts: AtomicU64,
    state: Mutex<ContentState>,
}

/// Two-tier TTL cache over a [`PromptSource`].
///
/// Summary refreshes are serialized behind one lock; content fetches are serialized per prompt
/// id. Callers that wait on a fetch already in flight share its result, failures included, so
/// concurrent misses on the same key cost one upstream call.
pub struct PromptCatalog {
    source: Arc<dyn PromptSource>,
    config: CatalogConfig,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
    refresh_attempts: AtomicU64,
    refresh: Mutex<Option<BridgeError>>, // last refresh error
    content: Mutex<HashMap<String, Arc<ContentSlot>>>, // prompt_id -> slot
}

impl PromptCatalog {
    pub fn new(source: Arc<dyn PromptSource>, config: CatalogConfig) -> Self {
        Self {
            source,
            config,
            snapshot: RwLock::new(None),
            refresh_attempts: AtomicU64::new(0),
            refresh: Mutex::new(None),
            content: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Initial load at startup. Failures are logged, not returned; the next list call retries.
    pub async fn warm(&self) {
        match self.get_summaries(false).await {
            Ok(snap) => info!(count = snap.len(), "prompt catalog warmed"),
            Err(e) => warn!(
                error = %e,
                kind = e.kind().as_str(),
                "initial catalog load failed; continuing"
            ),
        }
    }

    pub async fn get_summaries(
        &self,
        force_refresh: bool,
    ) -> Result<Arc<CatalogSnapshot>, BridgeError> {
        let seen = self.snapshot.read().await.clone();
        if !force_refresh
            && let Some(snap) = &seen
            && snap.age() <= self.config.summary_ttl
        {
            return Ok(snap.clone());
        }
        let seen_generation = seen.as_ref().map(|s| s.generation());
        let seen_attempt = self.refresh_attempts.load(Ordering::Acquire);

        let mut last_error = self.refresh.lock().await;

        // Someone else refreshed while we waited for the lock.
        let current = self.snapshot.read().await.clone();
        if let Some(snap) = &current
            && (Some(snap.generation()) != seen_generation
                || (!force_refresh && snap.age() <= self.config.summary_ttl))
        {
            return Ok(snap.clone());
        }
        if self.refresh_attempts.load(Ordering::Acquire) != seen_attempt
            && let Some(err) = last_error.clone()
        {
            debug!(error = %err, "sharing failed catalog refresh with waiter");
            return self.stale_summaries_or(err, current);
        }

        let fetched = self.source.fetch_summaries().await;
        self.refresh_attempts.fetch_add(1, Ordering::Release);
        let err = match fetched {
            Ok(list) => {
                *last_error = None;
                let generation = current.as_ref().map_or(1, |s| s.generation() + 1);
                let snap = Arc::new(CatalogSnapshot::new(list, generation));
                *self.snapshot.write().await = Some(snap.clone());
                let evicted = self.evict_missing(&snap).await;
                info!(
                    count = snap.len(),
                    evicted,
                    generation,
                    "prompt catalog refreshed"
                );
                return Ok(snap);
            }
            Err(e) => e,
        };
        *last_error = Some(err.clone());
        self.stale_summaries_or(err, current)
    }

    pub async fn get_content(&self, prompt_id: &str) -> Result<PromptContent, BridgeError> {
        let snap = self.get_summaries(false).await?;
        if !snap.contains(prompt_id) {
            debug!(prompt_id, "prompt not in catalog");
            return Err(not_found(prompt_id));
        }

        let slot = self.slot_for(prompt_id).await;
        let seen_attempt = slot.attempts.load(Ordering::Acquire);
        let mut state = slot.state.lock().await;
        if let Some(cached) = &state.entry
            && cached.fetched_at.elapsed() <= self.config.content_ttl
        {
            return Ok(cached.value.clone());
        }

        let value = if slot.attempts.load(Ordering::Acquire) != seen_attempt
            && let Some(err) = state.last_error.clone()
        {
            debug!(prompt_id, error = %err, "sharing failed content fetch with waiter");
            self.stale_content_or(prompt_id, err, &state)?
        } else {
            let fetched = self.source.fetch_content(prompt_id).await;
            slot.attempts.fetch_add(1, Ordering::Release);
            match fetched {
                Ok(value) => {
                    state.last_error = None;
                    state.entry = Some(CachedContent {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                    });
                    value
                }
                Err(e) => {
                    if matches!(e, BridgeError::NotFound(_)) {
                        state.entry = None;
                    }
                    state.last_error = Some(e.clone());
                    self.stale_content_or(prompt_id, e, &state)?
                }
            }
        };
        drop(state);

        // A refresh may have dropped the id while the fetch was in flight.
        if let Some(latest) = self.snapshot.read().await.as_ref()
            && !latest.contains(prompt_id)
        {
            self.content.lock().await.remove(prompt_id);
            return Err(not_found(prompt_id));
        }
        Ok(value)
    }

    fn stale_summaries_or(
        &self,
        err: BridgeError,
        current: Option<Arc<CatalogSnapshot>>,
    ) -> Result<Arc<CatalogSnapshot>, BridgeError> {
        if err.is_transient()
            && let Some(stale) = current
            && stale.age() <= self.stale_limit(self.config.summary_ttl)
        {
            warn!(
                error = %err,
                age_secs = stale.age().as_secs(),
                "catalog refresh failed; serving stale catalog"
            );
            return Ok(stale);
        }
        Err(err)
    }

    fn stale_content_or(
        &self,
        prompt_id: &str,
        err: BridgeError,
        state: &ContentState,
    ) -> Result<PromptContent, BridgeError> {
        if err.is_transient()
            && let Some(cached) = &state.entry
            && cached.fetched_at.elapsed() <= self.stale_limit(self.config.content_ttl)
        {
            warn!(prompt_id, error = %err, "content refresh failed; serving stale content");
            return Ok(cached.value.clone());
        }
        Err(err)
    }

    fn stale_limit(&self, ttl: Duration) -> Duration {
        ttl.saturating_add(self.config.stale_grace)
    }

    async fn slot_for(&self, prompt_id: &str) -> Arc<ContentSlot> {
        let mut slots = self.content.lock().await;
        slots.entry(prompt_id.to_string()).or_default().clone()
    }

    async fn evict_missing(&self, snap: &CatalogSnapshot) -> usize {
        let mut slots = self.content.lock().await;
        let before = slots.len();
        slots.retain(|id, _| snap.contains(id));
        before - slots.len()
    }
}

fn not_found(prompt_id: &str) -> BridgeError {
    BridgeError::NotFound(format!("prompt '{prompt_id}'"))
}
