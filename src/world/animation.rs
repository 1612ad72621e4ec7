//! Per-tick sprite update: frame advance, motion, and reclamation
//!
//! All asset and slot mutation happens here, on the owner's task. Frame
//! state lives on the asset, so every slot showing the same emote flips to
//! the next frame on the same tick.

use crate::assets::{AssetCache, EmoteId};
use crate::config::{MotionSettings, PoolSettings};
use crate::world::clock::FrameClock;
use crate::world::pool::{SlotId, SlotPhase, SpritePool};
use glam::Vec2;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub moved: usize,
    pub frames_advanced: usize,
    pub shrinking_started: usize,
    pub released: Vec<SlotId>,
}

#[derive(Debug, Clone)]
pub struct AnimationScheduler {
    bounds_min: Vec2,
    bounds_max: Vec2,
    speed_divisor: f32,
    inset: f32,
    display_duration: Duration,
    shrink_duration: Duration,
}

impl AnimationScheduler {
    pub fn new(motion: &MotionSettings, pool: &PoolSettings) -> Self {
        Self {
            bounds_min: Vec2::from_array(motion.bounds_min),
            bounds_max: Vec2::from_array(motion.bounds_max),
            speed_divisor: if motion.speed_divisor > 0.0 { motion.speed_divisor } else { 1.0 },
            inset: motion.boundary_inset,
            display_duration: pool.display_duration(),
            shrink_duration: pool.shrink_duration(),
        }
    }

    pub fn tick(&self, clock: &FrameClock, pool: &mut SpritePool, cache: &mut AssetCache) -> TickReport {
        let now = clock.elapsed();
        let mut report = TickReport::default();

        report.frames_advanced = self.advance_frames(now, pool, cache);

        let ids: Vec<SlotId> = pool.active_ids().to_vec();
        for id in ids {
            let Some(slot) = pool.slot_mut(id) else {
                continue;
            };
            match slot.phase {
                SlotPhase::Idle | SlotPhase::Reserved => continue,
                SlotPhase::Displaying => {
                    if now.saturating_sub(slot.spawned_at) >= self.display_duration {
                        slot.phase = SlotPhase::ShrinkingOut { started: now };
                        report.shrinking_started += 1;
                    }
                }
                SlotPhase::ShrinkingOut { started } => {
                    let remaining = self.shrink_remaining(now.saturating_sub(started));
                    slot.scale_factor = remaining;
                    if remaining <= 0.0 {
                        report.released.push(id);
                        continue;
                    }
                }
            }

            let (position, velocity) = self.step(slot.position, slot.velocity, clock.delta_seconds());
            slot.position = position;
            slot.velocity = velocity;
            report.moved += 1;
        }

        // Shrink-out completion hands the slot back to the pool.
        for id in &report.released {
            pool.release(*id);
        }

        report
    }

    /// Advance every distinct bound, multi-frame asset once per elapsed delay.
    fn advance_frames(&self, now: Duration, pool: &SpritePool, cache: &mut AssetCache) -> usize {
        let bound: HashSet<&EmoteId> = pool.active_slots().filter_map(|slot| slot.asset()).collect();
        let mut advanced = 0;
        for id in bound {
            // A slot without a cache record is skipped for this tick.
            if let Some(asset) = cache.get_mut(id) {
                if asset.advance(now) {
                    advanced += 1;
                }
            }
        }
        advanced
    }

    fn shrink_remaining(&self, since: Duration) -> f32 {
        if self.shrink_duration.is_zero() {
            return 0.0;
        }
        (1.0 - since.as_secs_f32() / self.shrink_duration.as_secs_f32()).max(0.0)
    }

    /// Move by `velocity * dt / divisor`, reflecting off the bounds and
    /// clamping just inside them.
    pub fn step(&self, position: Vec2, velocity: Vec2, dt: f32) -> (Vec2, Vec2) {
        let mut position = position + velocity * dt / self.speed_divisor;
        let mut velocity = velocity;

        if position.x >= self.bounds_max.x {
            velocity.x = -velocity.x;
            position.x = self.bounds_max.x - self.inset;
        } else if position.x <= self.bounds_min.x {
            velocity.x = -velocity.x;
            position.x = self.bounds_min.x + self.inset;
        }

        if position.y >= self.bounds_max.y {
            velocity.y = -velocity.y;
            position.y = self.bounds_max.y - self.inset;
        } else if position.y <= self.bounds_min.y {
            velocity.y = -velocity.y;
            position.y = self.bounds_min.y + self.inset;
        }

        (position, velocity)
    }
}
