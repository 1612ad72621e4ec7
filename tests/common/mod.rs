#![allow(dead_code)]

use async_trait::async_trait;
use emote_overlay::assets::{EmoteId, EmoteIdentity, FrameTexture};
use emote_overlay::networking::{EmoteMetadata, EmoteSource, EmoteTable, FetchError, NetworkResult};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// In-memory stand-in for the emote services.
///
/// Metadata responses are queued per id and consumed in order; an id with
/// nothing queued answers 404. A gate, when set, holds every metadata request
/// until `open_gate` is called.
#[derive(Default)]
pub struct ScriptedSource {
    metadata: Mutex<HashMap<EmoteId, VecDeque<NetworkResult<EmoteMetadata>>>>,
    broken_frames: Mutex<HashSet<(EmoteId, u32)>>,
    panicking: Mutex<HashSet<EmoteId>>,
    provision_fails: Mutex<bool>,
    channel: Mutex<Option<EmoteTable>>,
    gate: Option<Arc<Notify>>,
    pub metadata_calls: AtomicUsize,
    pub frame_calls: AtomicUsize,
    pub provision_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    frames_in_flight: AtomicUsize,
    pub max_frames_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self { gate: Some(Arc::new(Notify::new())), ..Self::default() }
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn respond(&self, id: &str, response: NetworkResult<EmoteMetadata>) {
        self.metadata
            .lock()
            .unwrap()
            .entry(EmoteId::from(id))
            .or_default()
            .push_back(response);
    }

    pub fn serve(&self, id: &str, frames: u32, delays: Option<Vec<u32>>, width: u32, height: u32) {
        self.respond(id, Ok(metadata(frames, delays, width, height)));
    }

    pub fn break_frame(&self, id: &str, index: u32) {
        self.broken_frames.lock().unwrap().insert((EmoteId::from(id), index));
    }

    /// Metadata requests for `id` panic inside the fetch task.
    pub fn panic_on_metadata(&self, id: &str) {
        self.panicking.lock().unwrap().insert(EmoteId::from(id));
    }

    pub fn fail_provisioning(&self) {
        *self.provision_fails.lock().unwrap() = true;
    }

    pub fn set_channel(&self, table: EmoteTable) {
        *self.channel.lock().unwrap() = Some(table);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn provision_calls(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }
}

pub fn metadata(frames: u32, delays: Option<Vec<u32>>, width: u32, height: u32) -> EmoteMetadata {
    EmoteMetadata { frames, frame_delay: delays, width, height }
}

pub fn not_found(id: &str) -> FetchError {
    FetchError::NotFound { url: format!("https://assets.test/{}/info.json", id) }
}

#[async_trait]
impl EmoteSource for ScriptedSource {
    async fn fetch_metadata(&self, id: &EmoteId) -> NetworkResult<EmoteMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let panics = self.panicking.lock().unwrap().contains(id);
        if panics {
            panic!("scripted panic while fetching {}", id);
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let response = self
            .metadata
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(not_found(id.as_str())));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }

    async fn fetch_frame(&self, id: &EmoteId, index: u32) -> NetworkResult<FrameTexture> {
        self.frame_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.frames_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_frames_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.frames_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken_frames.lock().unwrap().contains(&(id.clone(), index)) {
            return Err(FetchError::Status { url: format!("https://assets.test/{}/{}.webp", id, index), status: 500 });
        }
        Ok(FrameTexture::placeholder(2, 2))
    }

    async fn provision(&self, _emote: &EmoteIdentity) -> NetworkResult<()> {
        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        if *self.provision_fails.lock().unwrap() {
            Err(FetchError::Status { url: "https://backend.test/emote".to_string(), status: 503 })
        } else {
            Ok(())
        }
    }

    async fn fetch_channel(&self, channel: &str) -> NetworkResult<EmoteTable> {
        self.channel
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FetchError::NotFound { url: format!("https://backend.test/{}", channel) })
    }
}
