use std::collections::HashMap;
use crate::rendering::scene::ActiveVisual;
use crate::world::SlotId;

/// Changes since the previous `sync`, in slot order.
#[derive(Debug, Default, Clone)]
pub struct SceneDiff {
    pub added: Vec<SlotId>,
    pub updated: Vec<SlotId>,
    pub removed: Vec<SlotId>,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Renderer-side mirror of the visible sprites, keyed by slot.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<SlotId, ActiveVisual>,
}

impl SceneGraph {
    pub fn new() -> Self {
        SceneGraph {
            nodes: HashMap::new(),
        }
    }

    /// Replace the mirror with `visuals` and report what changed.
    pub fn sync(&mut self, visuals: &[ActiveVisual]) -> SceneDiff {
        let mut diff = SceneDiff::default();
        let mut next = HashMap::with_capacity(visuals.len());

        for visual in visuals {
            match self.nodes.remove(&visual.slot) {
                None => diff.added.push(visual.slot),
                Some(previous) if !previous.same_as(visual) => diff.updated.push(visual.slot),
                Some(_) => {}
            }
            next.insert(visual.slot, visual.clone());
        }

        diff.removed = self.nodes.drain().map(|(slot, _)| slot).collect();
        self.nodes = next;

        diff.added.sort();
        diff.updated.sort();
        diff.removed.sort();
        diff
    }

    pub fn get(&self, slot: SlotId) -> Option<&ActiveVisual> {
        self.nodes.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FrameTexture;
    use glam::{Vec2, Vec3};

    fn visual(slot: usize, x: f32, texture: &FrameTexture) -> ActiveVisual {
        ActiveVisual {
            slot: SlotId(slot),
            position: Vec3::new(x, 0.5, 0.0),
            scale: Vec2::splat(0.15),
            texture: texture.clone(),
            tint: [0.8, 0.8, 0.8],
        }
    }

    #[test]
    fn test_sync_reports_added_updated_removed() {
        let texture = FrameTexture::placeholder(2, 2);
        let mut graph = SceneGraph::new();

        let diff = graph.sync(&[visual(0, 0.0, &texture), visual(1, 0.0, &texture)]);
        assert_eq!(diff.added, vec![SlotId(0), SlotId(1)]);
        assert!(diff.updated.is_empty() && diff.removed.is_empty());

        let diff = graph.sync(&[visual(1, 0.2, &texture), visual(2, 0.0, &texture)]);
        assert_eq!(diff.added, vec![SlotId(2)]);
        assert_eq!(diff.updated, vec![SlotId(1)]);
        assert_eq!(diff.removed, vec![SlotId(0)]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_unchanged_visuals_produce_empty_diff() {
        let texture = FrameTexture::placeholder(2, 2);
        let mut graph = SceneGraph::new();
        graph.sync(&[visual(3, 0.1, &texture)]);
        assert!(graph.sync(&[visual(3, 0.1, &texture)]).is_empty());

        // Same pixels, different texture handle: the renderer must rebind.
        let other = FrameTexture::placeholder(2, 2);
        assert_eq!(graph.sync(&[visual(3, 0.1, &other)]).updated, vec![SlotId(3)]);
    }
}
