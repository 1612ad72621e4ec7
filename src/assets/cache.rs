//! Emote asset cache with fetch deduplication
//!
//! The first request for an id registers a placeholder record synchronously
//! and dispatches exactly one background fetch. Later requests for the same
//! id, whether the fetch is still running or long finished, are served from
//! the record without touching the network.
//!
//! Fetch tasks never touch the map themselves: they post a completion on an
//! mpsc channel and the owner applies it from its own task (`apply_completions`
//! on every tick, or `next_completion` when awaiting). Completions only install
//! frame data; the animation cursor belongs to the scheduler. Every dispatched
//! fetch posts exactly one completion, even when its task panics or is
//! cancelled, so `in_flight` always drains.

use super::{AssetInfo, EmoteAsset, EmoteId, EmoteIdentity, FrameTexture, LoadState};
use crate::config::AnimationSettings;
use crate::networking::{fetch_emote, EmoteSource, FetchAttempt, FetchError, FetchLimits};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub default_delay: Duration,
    pub placeholder_info: AssetInfo,
    pub limits: FetchLimits,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&AnimationSettings::default())
    }
}

impl From<&AnimationSettings> for CacheSettings {
    fn from(settings: &AnimationSettings) -> Self {
        Self {
            default_delay: settings.default_delay(),
            placeholder_info: AssetInfo {
                width: settings.placeholder_width,
                height: settings.placeholder_height,
            },
            limits: FetchLimits::default(),
        }
    }
}

impl CacheSettings {
    pub fn with_limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Cache performance statistics
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub fetches_dispatched: u64,
    pub fetches_succeeded: u64,
    pub fetches_failed: u64,
    pub provisioning_attempts: u64,
    pub cache_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit ratio as percentage
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.hits as f64 / self.total_requests as f64) * 100.0
        }
    }
}

#[derive(Debug)]
struct FetchCompletion {
    emote: EmoteIdentity,
    attempt: FetchAttempt,
}

/// Owned by a fetch task. Dropping it unsent reports the fetch as failed.
struct CompletionGuard {
    emote: Option<EmoteIdentity>,
    tx: mpsc::UnboundedSender<FetchCompletion>,
}

impl CompletionGuard {
    fn new(emote: EmoteIdentity, tx: mpsc::UnboundedSender<FetchCompletion>) -> Self {
        Self { emote: Some(emote), tx }
    }

    fn complete(mut self, attempt: FetchAttempt) {
        if let Some(emote) = self.emote.take() {
            // The receiver lives as long as the cache.
            let _ = self.tx.send(FetchCompletion { emote, attempt });
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(emote) = self.emote.take() {
            warn!("Fetch task for {} ended without a result", emote);
            let attempt = FetchAttempt {
                provisioned: false,
                result: Err(FetchError::Transport { reason: "fetch task ended early".to_string() }),
            };
            let _ = self.tx.send(FetchCompletion { emote, attempt });
        }
    }
}

pub struct AssetCache {
    /// Records indexed by emote id; never evicted
    entries: HashMap<EmoteId, EmoteAsset>,
    placeholder: FrameTexture,
    source: Arc<dyn EmoteSource>,
    settings: CacheSettings,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    in_flight: usize,
    stats: CacheStats,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AssetCache {
    pub fn new(source: Arc<dyn EmoteSource>, placeholder: FrameTexture, settings: CacheSettings) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            entries: HashMap::new(),
            placeholder,
            source,
            settings,
            completions_tx,
            completions_rx,
            in_flight: 0,
            stats: CacheStats::default(),
        }
    }

    /// Dimensions to lay the sprite out with right now.
    ///
    /// An unseen id gets a placeholder record and one background fetch; the
    /// placeholder's info is returned immediately. Once the fetch settles, the
    /// record's frames are replaced in place and every slot bound to the id
    /// picks them up without rebinding.
    pub fn resolve(&mut self, emote: &EmoteIdentity) -> AssetInfo {
        self.stats.total_requests += 1;

        if let Some(asset) = self.entries.get(&emote.id) {
            self.stats.hits += 1;
            return asset.info();
        }

        self.stats.misses += 1;
        let asset = EmoteAsset::placeholder(
            emote.clone(),
            self.placeholder.clone(),
            self.settings.placeholder_info,
            self.settings.default_delay,
        );
        let info = asset.info();
        self.entries.insert(emote.id.clone(), asset);
        self.stats.cache_entries = self.entries.len();
        self.dispatch(emote.clone());
        info
    }

    fn dispatch(&mut self, emote: EmoteIdentity) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime available, {} stays on the fallback sprite", emote);
                if let Some(asset) = self.entries.get_mut(&emote.id) {
                    asset.set_state(LoadState::Failed);
                }
                self.stats.fetches_failed += 1;
                return;
            }
        };

        if let Some(asset) = self.entries.get_mut(&emote.id) {
            asset.set_state(LoadState::Fetching);
        }
        self.in_flight += 1;
        self.stats.fetches_dispatched += 1;
        debug!("Dispatching fetch for {}", emote);

        let source = Arc::clone(&self.source);
        let limits = self.settings.limits;
        let guard = CompletionGuard::new(emote.clone(), self.completions_tx.clone());
        runtime.spawn(async move {
            let attempt = fetch_emote(source, emote, limits).await;
            guard.complete(attempt);
        });
    }

    /// Apply every completion that has already arrived. Never blocks.
    pub fn apply_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for the next fetch to settle and apply it. `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<EmoteId> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        let id = completion.emote.id.clone();
        self.apply(completion);
        Some(id)
    }

    /// Wait until no fetch is in flight.
    pub async fn settle_all(&mut self) {
        while self.next_completion().await.is_some() {}
    }

    fn apply(&mut self, completion: FetchCompletion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if completion.attempt.provisioned {
            self.stats.provisioning_attempts += 1;
        }

        let Some(asset) = self.entries.get_mut(&completion.emote.id) else {
            return;
        };
        if asset.state() != LoadState::Fetching {
            debug!("Ignoring completion for already settled {}", completion.emote);
            return;
        }

        match completion.attempt.result {
            Ok(frames) => {
                info!(
                    "✅ Emote {} ready: {} frame(s), {}x{}",
                    completion.emote,
                    frames.frames.len(),
                    frames.width,
                    frames.height
                );
                asset.install_frames(frames, self.settings.default_delay);
                asset.set_state(LoadState::Ready);
                self.stats.fetches_succeeded += 1;
            }
            Err(err) => {
                warn!(
                    "❌ Could not download emote {}: {}. Keeping the fallback sprite",
                    completion.emote, err
                );
                asset.set_state(LoadState::Failed);
                self.stats.fetches_failed += 1;
            }
        }
    }

    pub fn get(&self, id: &EmoteId) -> Option<&EmoteAsset> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &EmoteId) -> Option<&mut EmoteAsset> {
        self.entries.get_mut(id)
    }

    pub fn state(&self, id: &EmoteId) -> Option<LoadState> {
        self.entries.get(id).map(EmoteAsset::state)
    }

    pub fn contains(&self, id: &EmoteId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetches dispatched and not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn placeholder(&self) -> &FrameTexture {
        &self.placeholder
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}
