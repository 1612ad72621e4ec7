// emote-overlay: chat-driven animated emote sprites
// Bounded sprite pool, deduplicated asset cache, per-tick animation

pub mod app;
pub mod assets;
pub mod config;
pub mod networking;
pub mod rendering;
pub mod utils;
pub mod world;

// Re-export commonly used types for convenience
pub use app::{EmoteOverlay, OverlayContext, SpawnReport};
pub use assets::{AssetCache, AssetInfo, EmoteAsset, EmoteId, EmoteIdentity, LoadState, Provider};
pub use config::{OverlaySettings, StreamParams};
pub use networking::{EmoteSource, FetchError, HttpEmoteClient};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
