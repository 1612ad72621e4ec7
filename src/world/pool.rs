//! Fixed-capacity pool of reusable sprite slots
//!
//! Every slot is created up front. Allocation moves a slot from the idle
//! queue to the active list; release moves it back, parked off-screen with
//! no bound emote. `active + idle == capacity` holds after every operation.

use crate::assets::EmoteId;
use crate::config::PoolSettings;
use glam::Vec2;
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotPhase {
    Idle,
    /// Handed out by `acquire`, not yet bound to an emote.
    Reserved,
    Displaying,
    ShrinkingOut { started: Duration },
}

#[derive(Debug, Clone)]
pub struct PoolSlot {
    id: SlotId,
    pub(crate) asset: Option<EmoteId>,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) spawned_at: Duration,
    pub(crate) scale_factor: f32,
    pub(crate) phase: SlotPhase,
}

impl PoolSlot {
    fn new(id: SlotId, offscreen: Vec2) -> Self {
        Self {
            id,
            asset: None,
            position: offscreen,
            velocity: Vec2::ZERO,
            spawned_at: Duration::ZERO,
            scale_factor: 1.0,
            phase: SlotPhase::Idle,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn asset(&self) -> Option<&EmoteId> {
        self.asset.as_ref()
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn spawned_at(&self) -> Duration {
        self.spawned_at
    }

    /// 1.0 while displaying, falling to 0.0 over the shrink-out.
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.phase, SlotPhase::Displaying | SlotPhase::ShrinkingOut { .. }) && self.asset.is_some()
    }
}

#[derive(Debug, Default, Clone)]
pub struct PoolStats {
    pub spawned: u64,
    pub dropped: u64,
    pub released: u64,
}

impl PoolStats {
    /// Share of requests that found no free slot, as percentage
    pub fn drop_ratio(&self) -> f64 {
        let total = self.spawned + self.dropped;
        if total == 0 {
            0.0
        } else {
            (self.dropped as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug)]
pub struct SpritePool {
    slots: Vec<PoolSlot>,
    idle: VecDeque<SlotId>,
    active: Vec<SlotId>,
    settings: PoolSettings,
    stats: PoolStats,
    exhausted: bool,
}

impl SpritePool {
    pub fn new(settings: PoolSettings) -> Self {
        let offscreen = Vec2::from_array(settings.offscreen);
        let slots: Vec<_> = (0..settings.capacity).map(|i| PoolSlot::new(SlotId(i), offscreen)).collect();
        let idle = slots.iter().map(PoolSlot::id).collect();
        debug!("Sprite pool initialized with {} slots", settings.capacity);
        Self {
            slots,
            idle,
            active: Vec::with_capacity(settings.capacity),
            settings,
            stats: PoolStats::default(),
            exhausted: false,
        }
    }

    /// Take the longest-idle slot, or `None` when every slot is busy. Callers
    /// drop the request in that case.
    pub fn acquire(&mut self) -> Option<SlotId> {
        let Some(id) = self.idle.pop_front() else {
            self.stats.dropped += 1;
            if !self.exhausted {
                debug!("Sprite pool exhausted ({} active), dropping requests", self.active.len());
                self.exhausted = true;
            }
            return None;
        };
        self.exhausted = false;
        self.active.push(id);
        self.slots[id.0].phase = SlotPhase::Reserved;
        Some(id)
    }

    /// Bind a reserved slot to an emote and give it a random spawn point and
    /// one of the four diagonal directions.
    pub fn configure<R: Rng>(&mut self, id: SlotId, asset: EmoteId, now: Duration, rng: &mut R) -> bool {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return false;
        };
        if slot.phase == SlotPhase::Idle {
            return false;
        }

        let min = Vec2::from_array(self.settings.spawn_min);
        let max = Vec2::from_array(self.settings.spawn_max);
        slot.position = Vec2::new(
            min.x + rng.random::<f32>() * (max.x - min.x),
            min.y + rng.random::<f32>() * (max.y - min.y),
        );
        slot.velocity = Vec2::new(diagonal(rng), diagonal(rng));
        slot.asset = Some(asset);
        slot.spawned_at = now;
        slot.scale_factor = 1.0;
        slot.phase = SlotPhase::Displaying;
        self.stats.spawned += 1;
        true
    }

    /// Return an active slot to the idle queue. Releasing an idle slot is a no-op.
    pub fn release(&mut self, id: SlotId) -> bool {
        let Some(index) = self.active.iter().position(|active| *active == id) else {
            return false;
        };
        self.active.swap_remove(index);

        let slot = &mut self.slots[id.0];
        slot.asset = None;
        slot.position = Vec2::from_array(self.settings.offscreen);
        slot.velocity = Vec2::ZERO;
        slot.scale_factor = 1.0;
        slot.phase = SlotPhase::Idle;

        self.idle.push_back(id);
        self.stats.released += 1;
        true
    }

    pub fn slot(&self, id: SlotId) -> Option<&PoolSlot> {
        self.slots.get(id.0)
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> Option<&mut PoolSlot> {
        self.slots.get_mut(id.0)
    }

    pub fn active_ids(&self) -> &[SlotId] {
        &self.active
    }

    pub fn active_slots(&self) -> impl Iterator<Item = &PoolSlot> {
        self.active.iter().map(move |id| &self.slots[id.0])
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.clone()
    }
}

fn diagonal<R: Rng>(rng: &mut R) -> f32 {
    if rng.random_bool(0.5) {
        -1.0
    } else {
        1.0
    }
}
