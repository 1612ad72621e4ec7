//! Declared local resources and the one-shot ready signal
//!
//! The overlay only needs its fallback sprite from disk, but the loader takes
//! any list of named image sources. Ready fires once, after the last source
//! settles; a source that fails to load is logged and still counts as settled.

use super::FrameTexture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub const PLACEHOLDER: &str = "sprite_placeholder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSource {
    pub name: String,
    pub path: PathBuf,
}

impl ResourceSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }
}

type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Fires its callbacks exactly once. Callbacks registered after firing run immediately.
pub struct ReadySignal {
    fired: bool,
    callbacks: Vec<ReadyCallback>,
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { fired: false, callbacks: Vec::new(), tx }
    }

    pub fn on_ready(&mut self, callback: impl FnOnce() + Send + 'static) {
        if self.fired {
            callback();
        } else {
            self.callbacks.push(Box::new(callback));
        }
    }

    /// Returns false if the signal had already fired.
    pub fn fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        for callback in self.callbacks.drain(..) {
            callback();
        }
        self.tx.send_replace(true);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.fired
    }

    /// Receiver that can `wait_for(|ready| *ready)` from another task.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ResourceSet {
    sources: Vec<ResourceSource>,
    items: HashMap<String, FrameTexture>,
    failed: Vec<String>,
    loaded: usize,
    ready: ReadySignal,
}

impl ResourceSet {
    pub fn new(sources: Vec<ResourceSource>) -> Self {
        Self {
            sources,
            items: HashMap::new(),
            failed: Vec::new(),
            loaded: 0,
            ready: ReadySignal::new(),
        }
    }

    /// The sources the overlay declares, resolved against `dir`.
    pub fn default_sources(dir: &Path) -> Vec<ResourceSource> {
        vec![ResourceSource::new(PLACEHOLDER, dir.join("Placeholder.webp"))]
    }

    pub fn ready(&mut self) -> &mut ReadySignal {
        &mut self.ready
    }

    /// Load every declared source concurrently, then fire ready.
    pub async fn load_all(&mut self) {
        if self.sources.is_empty() {
            self.check_ready();
            return;
        }

        let mut set = JoinSet::new();
        for source in self.sources.clone() {
            set.spawn(async move {
                let result = load_texture(&source.path).await;
                (source, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((source, result)) => self.source_loaded(source, result),
                Err(e) => {
                    warn!("Resource loader task failed: {}", e);
                    self.loaded += 1;
                    self.check_ready();
                }
            }
        }
    }

    fn source_loaded(&mut self, source: ResourceSource, result: anyhow::Result<FrameTexture>) {
        match result {
            Ok(texture) => {
                self.items.insert(source.name, texture);
            }
            Err(e) => {
                warn!("Could not load resource {} from {}: {:#}", source.name, source.path.display(), e);
                self.failed.push(source.name);
            }
        }
        self.loaded += 1;
        self.check_ready();
    }

    fn check_ready(&mut self) {
        if self.loaded >= self.sources.len() && self.ready.fire() {
            info!(
                "Resources ready: {}/{} loaded, {} failed",
                self.items.len(),
                self.sources.len(),
                self.failed.len()
            );
        }
    }

    pub fn texture(&self, name: &str) -> Option<&FrameTexture> {
        self.items.get(name)
    }

    /// The loaded fallback sprite, or a generated one when it is missing.
    pub fn placeholder(&self, width: u32, height: u32) -> FrameTexture {
        self.texture(PLACEHOLDER)
            .cloned()
            .unwrap_or_else(|| FrameTexture::placeholder(width, height))
    }

    pub fn to_load(&self) -> usize {
        self.sources.len()
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }
}

async fn load_texture(path: &Path) -> anyhow::Result<FrameTexture> {
    use anyhow::Context;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let label = path.display().to_string();
    let texture = tokio::task::spawn_blocking(move || FrameTexture::from_bytes(&bytes, &label)).await??;
    Ok(texture)
}
