//! Overlay facade
//!
//! `OverlayContext` holds the three shared pieces (clock, cache, pool) and is
//! passed explicitly instead of being reachable globally. `EmoteOverlay` owns
//! the context plus the resolver and scheduler, and is driven by exactly two
//! entry points: chat messages and ticks.

use crate::assets::{AssetCache, CacheSettings, EmoteIdentity, FrameTexture};
use crate::config::{OverlaySettings, StreamParams};
use crate::networking::{ChatMessage, EmoteSource, EmoteTable, EmoteTags, FetchError, FetchLimits};
use crate::rendering::ActiveVisual;
use crate::world::{AnimationScheduler, ChatResolver, FrameClock, SlotId, SpritePool, TickReport};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub struct OverlayContext {
    pub clock: FrameClock,
    pub cache: AssetCache,
    pub pool: SpritePool,
}

impl OverlayContext {
    pub fn new(settings: &OverlaySettings, source: Arc<dyn EmoteSource>, placeholder: FrameTexture) -> Self {
        Self {
            clock: FrameClock::new(),
            cache: AssetCache::new(
                source,
                placeholder,
                CacheSettings::from(&settings.animation).with_limits(FetchLimits::from(&settings.hosts)),
            ),
            pool: SpritePool::new(settings.pool.clone()),
        }
    }
}

/// Outcome of feeding one chat message through the pipeline.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpawnReport {
    pub requested: usize,
    pub spawned: Vec<SlotId>,
    pub dropped: usize,
}

pub struct EmoteOverlay {
    context: OverlayContext,
    source: Arc<dyn EmoteSource>,
    resolver: ChatResolver,
    scheduler: AnimationScheduler,
    rng: StdRng,
    params: StreamParams,
    enabled: bool,
    tint: [f32; 3],
    base_scale: f32,
}

impl EmoteOverlay {
    pub fn new(
        settings: &OverlaySettings,
        source: Arc<dyn EmoteSource>,
        placeholder: FrameTexture,
        params: StreamParams,
    ) -> Self {
        Self::with_rng(settings, source, placeholder, params, StdRng::from_os_rng())
    }

    /// Same as `new` with a caller-supplied generator for spawn placement.
    pub fn with_rng(
        settings: &OverlaySettings,
        source: Arc<dyn EmoteSource>,
        placeholder: FrameTexture,
        params: StreamParams,
        rng: StdRng,
    ) -> Self {
        info!(
            "🎭 Emote overlay for {} (brightness {}, {} slots)",
            params.channel.as_deref().unwrap_or("<no channel>"),
            params.brightness,
            settings.pool.capacity
        );
        Self {
            context: OverlayContext::new(settings, Arc::clone(&source), placeholder),
            source,
            resolver: ChatResolver::new(&settings.chat),
            scheduler: AnimationScheduler::new(&settings.motion, &settings.pool),
            rng,
            params,
            enabled: true,
            tint: settings.animation.tint_rgb(),
            base_scale: settings.animation.base_scale,
        }
    }

    /// Fetch the channel's name table. On failure the overlay stays disabled
    /// for the rest of the session.
    pub async fn bootstrap_channel(&mut self, channel: &str) -> bool {
        match self.source.fetch_channel(channel).await {
            Ok(table) => {
                info!("📋 Loaded {} channel emotes for #{}", table.len(), channel);
                self.install_channel_table(table);
                true
            }
            Err(err) => {
                self.disable(&err);
                false
            }
        }
    }

    pub fn install_channel_table(&mut self, table: EmoteTable) {
        self.resolver.set_table(table);
    }

    /// Turn the live overlay off. Logged the first time only.
    pub fn disable(&mut self, reason: &FetchError) {
        if self.enabled {
            error!("❌ Channel bootstrap failed, live overlay disabled: {}", reason);
            self.enabled = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.resolver.set_focused(focused);
    }

    pub fn on_chat(&mut self, message: &ChatMessage) -> SpawnReport {
        self.on_message(&message.text, &message.emotes)
    }

    /// Resolve a message into occurrences and try to show each one. A drop
    /// for one occurrence never stops the rest.
    pub fn on_message(&mut self, text: &str, tags: &EmoteTags) -> SpawnReport {
        let mut report = SpawnReport::default();
        if !self.enabled {
            return report;
        }
        for occurrence in self.resolver.on_message(text, tags) {
            report.requested += 1;
            match self.spawn(&occurrence.emote) {
                Some(slot) => report.spawned.push(slot),
                None => report.dropped += 1,
            }
        }
        report
    }

    /// Take a slot and bind it to `emote`. The slot shows the fallback sprite
    /// until the asset's frames arrive.
    pub fn spawn(&mut self, emote: &EmoteIdentity) -> Option<SlotId> {
        let OverlayContext { clock, cache, pool } = &mut self.context;
        let slot = pool.acquire()?;
        let info = cache.resolve(emote);
        pool.configure(slot, emote.id.clone(), clock.elapsed(), &mut self.rng);
        debug!("Spawned {} in slot {} ({}x{})", emote, slot.0, info.width, info.height);
        Some(slot)
    }

    /// Step by a simulated delta.
    pub fn tick(&mut self, delta: Duration) -> TickReport {
        self.context.clock.advance(delta);
        self.run_tick()
    }

    /// Step by the wall time since the previous call.
    pub fn tick_wall(&mut self, now: Instant) -> TickReport {
        self.context.clock.tick_wall(now);
        self.run_tick()
    }

    fn run_tick(&mut self) -> TickReport {
        let OverlayContext { clock, cache, pool } = &mut self.context;
        cache.apply_completions();
        self.scheduler.tick(clock, pool, cache)
    }

    /// Visible slots with the texture of their asset's current frame.
    pub fn visuals(&self) -> Vec<ActiveVisual> {
        let OverlayContext { cache, pool, .. } = &self.context;
        pool.active_slots()
            .filter(|slot| slot.is_visible())
            .filter_map(|slot| {
                let asset = cache.get(slot.asset()?)?;
                let texture = asset.current_texture()?.clone();
                let base = Vec2::new(asset.info().aspect() * self.base_scale, self.base_scale);
                Some(ActiveVisual {
                    slot: slot.id(),
                    position: Vec3::new(slot.position().x, slot.position().y, 0.0),
                    scale: base * slot.scale_factor(),
                    texture,
                    tint: self.tint,
                })
            })
            .collect()
    }

    /// Wait until every dispatched fetch has been applied.
    pub async fn settle_fetches(&mut self) {
        self.context.cache.settle_all().await;
    }

    pub fn context(&self) -> &OverlayContext {
        &self.context
    }

    pub fn cache(&self) -> &AssetCache {
        &self.context.cache
    }

    pub fn pool(&self) -> &SpritePool {
        &self.context.pool
    }

    pub fn clock(&self) -> &FrameClock {
        &self.context.clock
    }

    pub fn resolver(&self) -> &ChatResolver {
        &self.resolver
    }

    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    /// Scene light intensity requested by the page.
    pub fn brightness(&self) -> f32 {
        self.params.brightness
    }
}
