pub mod graph;

pub use graph::{SceneDiff, SceneGraph};

use crate::assets::FrameTexture;
use crate::world::SlotId;
use glam::{Vec2, Vec3};

/// What the renderer draws for one visible slot this tick.
#[derive(Debug, Clone)]
pub struct ActiveVisual {
    pub slot: SlotId,
    pub position: Vec3,
    pub scale: Vec2,
    pub texture: FrameTexture,
    pub tint: [f32; 3],
}

impl ActiveVisual {
    /// True when nothing the renderer uploads or positions has changed.
    pub fn same_as(&self, other: &ActiveVisual) -> bool {
        self.slot == other.slot
            && self.position == other.position
            && self.scale == other.scale
            && self.tint == other.tint
            && self.texture.same_as(&other.texture)
    }
}
