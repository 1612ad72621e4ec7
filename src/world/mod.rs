pub mod animation;
pub mod chat_resolver;
pub mod clock;
pub mod pool;

// Re-export the per-tick building blocks
pub use animation::{AnimationScheduler, TickReport};
pub use chat_resolver::{ChatOccurrence, ChatResolver, OccurrenceSource, ResolverStats};
pub use clock::FrameClock;
pub use pool::{PoolSlot, PoolStats, SlotId, SlotPhase, SpritePool};
