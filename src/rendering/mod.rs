pub mod scene;

// Re-export the renderer-facing handles
pub use scene::{ActiveVisual, SceneDiff, SceneGraph};
