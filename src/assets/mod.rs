//! Emote asset model
//!
//! An `EmoteAsset` is the cache's record for one remote emote: its load
//! state, its decoded frames, the per-frame delay table, and the shared
//! animation cursor that every sprite showing this emote reads from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod cache;
pub mod resources;
pub mod texture;

pub use cache::{AssetCache, CacheSettings, CacheStats};
pub use resources::{ReadySignal, ResourceSet, ResourceSource};
pub use texture::{FrameTexture, TextureError};

/// Remote emote identifier as used by the asset host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmoteId(pub String);

impl EmoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Emote provider tag (`Twitch`, `7TV`, `BTTV`, ...). Kept as the string the
/// provisioning service expects in its URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provider(pub String);

impl Provider {
    pub const TWITCH: &'static str = "Twitch";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn twitch() -> Self {
        Self(Self::TWITCH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emote identity: id plus provider. This is also the shape of each entry in a
/// channel's emote table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmoteIdentity {
    pub id: EmoteId,
    pub provider: Provider,
}

impl EmoteIdentity {
    pub fn new(id: impl Into<String>, provider: Provider) -> Self {
        Self { id: EmoteId::new(id), provider }
    }

    pub fn twitch(id: impl Into<String>) -> Self {
        Self::new(id, Provider::twitch())
    }
}

impl fmt::Display for EmoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.provider)
    }
}

/// Frame dimensions handed back to callers of `AssetCache::resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    pub width: u32,
    pub height: u32,
}

impl AssetInfo {
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Load state of a cache record.
///
/// A record bound to the fallback sprite reports `Unloaded` until its fetch
/// is dispatched, then `Fetching`, and `Failed` if the fetch never delivers
/// frames. It only reports `Ready` once real frames are installed. In every
/// one of these states it has a frame to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Fetching,
    Ready,
    Failed,
}

impl LoadState {
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadState::Ready | LoadState::Failed)
    }
}

/// Frame data produced by a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedFrames {
    pub frames: Vec<FrameTexture>,
    pub delays: Vec<Duration>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct EmoteAsset {
    identity: EmoteIdentity,
    state: LoadState,
    frames: Vec<FrameTexture>,
    delays: Vec<Duration>,
    width: u32,
    height: u32,
    current_frame: usize,
    last_update: Duration,
}

impl EmoteAsset {
    /// A single-frame record bound to the fallback texture.
    pub fn placeholder(identity: EmoteIdentity, texture: FrameTexture, info: AssetInfo, default_delay: Duration) -> Self {
        Self {
            identity,
            state: LoadState::Unloaded,
            frames: vec![texture],
            delays: vec![default_delay],
            width: info.width,
            height: info.height,
            current_frame: 0,
            last_update: Duration::ZERO,
        }
    }

    pub fn identity(&self) -> &EmoteIdentity {
        &self.identity
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LoadState) {
        self.state = state;
    }

    pub fn info(&self) -> AssetInfo {
        AssetInfo { width: self.width, height: self.height }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn last_update(&self) -> Duration {
        self.last_update
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn current_texture(&self) -> Option<&FrameTexture> {
        if self.frames.is_empty() {
            return None;
        }
        self.frames.get(self.current_frame % self.frames.len())
    }

    /// Delay of the frame being shown; the table wraps when it is shorter than the frame list.
    pub fn current_delay(&self) -> Duration {
        if self.delays.is_empty() {
            return Duration::ZERO;
        }
        self.delays[self.current_frame % self.delays.len()]
    }

    /// Swap in fetched frame data. The animation cursor is left alone apart
    /// from being brought back into range.
    pub(crate) fn install_frames(&mut self, fetched: FetchedFrames, default_delay: Duration) {
        self.frames = fetched.frames;
        self.delays = if fetched.delays.is_empty() {
            vec![default_delay]
        } else {
            fetched.delays
        };
        self.width = fetched.width;
        self.height = fetched.height;
        if self.current_frame >= self.frames.len() {
            self.current_frame = 0;
        }
    }

    /// Step to the next frame when the current frame's delay has been exceeded.
    /// Returns true when the frame changed. Single-frame assets never advance.
    ///
    /// `last_update` moves forward by the delay that elapsed, not to `now`, so
    /// tick overshoot carries into the next frame. A cursor more than one full
    /// delay behind snaps to `now` instead of replaying missed frames.
    pub fn advance(&mut self, now: Duration) -> bool {
        if !self.is_animated() {
            return false;
        }
        let delay = self.current_delay();
        if now.saturating_sub(self.last_update) <= delay {
            return false;
        }
        self.current_frame = (self.current_frame + 1) % self.frames.len();
        self.last_update += delay;
        if now.saturating_sub(self.last_update) > delay {
            self.last_update = now;
        }
        true
    }
}
