//! Network boundary of the overlay
//!
//! Two collaborators live here: the emote asset/provisioning services
//! (`emote_client`) and the chat transport (`chat`). Everything above this
//! module only ever sees `FetchError` values, and the asset cache converts
//! those into a `Failed` load state instead of propagating them.

pub mod chat;
pub mod emote_client;

pub use chat::{ChatMessage, EmoteTable, EmoteTagEntry, EmoteTags};
pub use emote_client::{fetch_emote, EmoteMetadata, EmoteSource, FetchAttempt, FetchLimits, HttpEmoteClient};

use crate::assets::TextureError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Response decode failed: {reason}")]
    Decode { reason: String },

    #[error("Invalid emote metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("Frame image rejected: {reason}")]
    Image { reason: String },

    #[error("Connection closed")]
    Disconnected,
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

pub type NetworkResult<T> = Result<T, FetchError>;

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode { reason: err.to_string() }
        } else {
            FetchError::Transport { reason: err.to_string() }
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Transport { reason: err.to_string() }
    }
}

impl From<TextureError> for FetchError {
    fn from(err: TextureError) -> Self {
        FetchError::Image { reason: err.to_string() }
    }
}
