//! HTTP client for the emote asset host and the provisioning service
//!
//! Endpoints:
//! - `GET {asset_host}/{id}/info.json` emote metadata
//! - `GET {asset_host}/{id}/{frame}.{ext}` one frame image
//! - `POST {provision_host}/emote/{id}/{provider}` ask the backend to mirror an emote
//! - `GET {provision_host}/{channel}` channel emote table

use super::{EmoteTable, FetchError, NetworkResult};
use crate::assets::{EmoteId, EmoteIdentity, FetchedFrames, FrameTexture};
use crate::config::HostSettings;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Metadata document served next to the frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmoteMetadata {
    pub frames: u32,
    #[serde(rename = "frameDelay", default, skip_serializing_if = "Option::is_none")]
    pub frame_delay: Option<Vec<u32>>,
    pub width: u32,
    pub height: u32,
}

impl EmoteMetadata {
    pub fn validate(&self, limits: &FetchLimits) -> NetworkResult<()> {
        if self.frames == 0 {
            return Err(FetchError::InvalidMetadata { reason: "frame count is zero".to_string() });
        }
        if self.frames > limits.max_frames {
            return Err(FetchError::InvalidMetadata {
                reason: format!("{} frames exceeds the limit of {}", self.frames, limits.max_frames),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(FetchError::InvalidMetadata {
                reason: format!("degenerate size {}x{}", self.width, self.height),
            });
        }
        Ok(())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.frame_delay
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|ms| Duration::from_millis(u64::from(*ms)))
            .collect()
    }
}

/// Bounds applied to a single emote fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_frames: u32,
    /// Frame downloads allowed to run at once for one emote.
    pub max_concurrent_frames: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self::from(&HostSettings::default())
    }
}

impl From<&HostSettings> for FetchLimits {
    fn from(hosts: &HostSettings) -> Self {
        Self {
            max_frames: hosts.max_frames,
            max_concurrent_frames: hosts.max_concurrent_frames.max(1),
        }
    }
}

/// Remote emote services as seen by the cache and the bootstrap path.
#[async_trait]
pub trait EmoteSource: Send + Sync {
    async fn fetch_metadata(&self, id: &EmoteId) -> NetworkResult<EmoteMetadata>;

    async fn fetch_frame(&self, id: &EmoteId, index: u32) -> NetworkResult<FrameTexture>;

    /// Ask the backend to mirror an emote it does not host yet.
    async fn provision(&self, emote: &EmoteIdentity) -> NetworkResult<()>;

    async fn fetch_channel(&self, channel: &str) -> NetworkResult<EmoteTable>;
}

/// Outcome of one complete fetch, including whether the provisioning path was taken.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub provisioned: bool,
    pub result: NetworkResult<FetchedFrames>,
}

/// Fetch metadata and every frame for `emote`.
///
/// A 404 on metadata triggers one provisioning request; if that succeeds the
/// metadata is fetched exactly once more. Any failure after that is final.
/// Metadata outside `limits` fails before a single frame is requested.
pub async fn fetch_emote(source: Arc<dyn EmoteSource>, emote: EmoteIdentity, limits: FetchLimits) -> FetchAttempt {
    let mut provisioned = false;

    let metadata = match source.fetch_metadata(&emote.id).await {
        Ok(metadata) => Ok(metadata),
        Err(err) if err.is_not_found() => {
            provisioned = true;
            info!("📦 Emote {} not hosted yet, requesting provisioning", emote);
            match source.provision(&emote).await {
                Ok(()) => source.fetch_metadata(&emote.id).await,
                Err(provision_err) => Err(provision_err),
            }
        }
        Err(err) => Err(err),
    };

    let result = match metadata.and_then(|m| m.validate(&limits).map(|_| m)) {
        Ok(metadata) => fetch_frames(source, &emote.id, metadata, limits.max_concurrent_frames).await,
        Err(err) => Err(err),
    };

    FetchAttempt { provisioned, result }
}

async fn fetch_frames(
    source: Arc<dyn EmoteSource>,
    id: &EmoteId,
    metadata: EmoteMetadata,
    concurrency: usize,
) -> NetworkResult<FetchedFrames> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    for index in 0..metadata.frames {
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        let id = id.clone();
        set.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return (index, Err(FetchError::Disconnected));
            };
            (index, source.fetch_frame(&id, index).await)
        });
    }

    let mut frames: Vec<Option<FrameTexture>> = vec![None; metadata.frames as usize];
    while let Some(joined) = set.join_next().await {
        let (index, frame) = joined.map_err(|e| FetchError::Transport { reason: e.to_string() })?;
        match frame {
            Ok(texture) => frames[index as usize] = Some(texture),
            Err(err) => {
                set.abort_all();
                return Err(err);
            }
        }
    }

    let frames = frames
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| FetchError::Transport { reason: "frame download incomplete".to_string() })?;

    debug!("Fetched {} frames for {}", frames.len(), id);

    Ok(FetchedFrames {
        delays: metadata.delays(),
        frames,
        width: metadata.width,
        height: metadata.height,
    })
}

/// `EmoteSource` backed by the public HTTP services.
#[derive(Debug, Clone)]
pub struct HttpEmoteClient {
    http: reqwest::Client,
    hosts: HostSettings,
}

impl HttpEmoteClient {
    pub fn new(hosts: HostSettings) -> NetworkResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(hosts.user_agent.clone())
            .build()?;
        Ok(Self { http, hosts })
    }

    fn metadata_url(&self, id: &EmoteId) -> String {
        format!("{}/{}/info.json", self.hosts.asset_host.trim_end_matches('/'), id)
    }

    fn frame_url(&self, id: &EmoteId, index: u32) -> String {
        format!(
            "{}/{}/{}.{}",
            self.hosts.asset_host.trim_end_matches('/'),
            id,
            index,
            self.hosts.frame_extension
        )
    }

    fn provision_url(&self, emote: &EmoteIdentity) -> String {
        format!(
            "{}/emote/{}/{}",
            self.hosts.provision_host.trim_end_matches('/'),
            emote.id,
            emote.provider
        )
    }

    fn channel_url(&self, channel: &str) -> String {
        format!("{}/{}", self.hosts.provision_host.trim_end_matches('/'), channel)
    }
}

fn check_status(url: &str, response: reqwest::Response) -> NetworkResult<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        Err(FetchError::NotFound { url: url.to_string() })
    } else if !status.is_success() {
        Err(FetchError::Status { url: url.to_string(), status: status.as_u16() })
    } else {
        Ok(response)
    }
}

#[async_trait]
impl EmoteSource for HttpEmoteClient {
    async fn fetch_metadata(&self, id: &EmoteId) -> NetworkResult<EmoteMetadata> {
        let url = self.metadata_url(id);
        debug!("Requesting metadata: {}", url);
        let response = check_status(&url, self.http.get(&url).send().await?)?;
        Ok(response.json::<EmoteMetadata>().await?)
    }

    async fn fetch_frame(&self, id: &EmoteId, index: u32) -> NetworkResult<FrameTexture> {
        let url = self.frame_url(id, index);
        let response = check_status(&url, self.http.get(&url).send().await?)?;
        let bytes: Bytes = response.bytes().await?;
        let label = format!("{}#{}", id, index);
        let texture = tokio::task::spawn_blocking(move || FrameTexture::from_bytes(&bytes, &label))
            .await
            .map_err(|e| FetchError::Transport { reason: e.to_string() })??;
        Ok(texture)
    }

    async fn provision(&self, emote: &EmoteIdentity) -> NetworkResult<()> {
        let url = self.provision_url(emote);
        let response = self.http.post(&url).send().await?;
        let status = response.status();
        if status.is_success() {
            info!("📦 Provisioned {} (HTTP {})", emote, status.as_u16());
            Ok(())
        } else {
            warn!("❌ Provisioning {} failed: HTTP {}", emote, status.as_u16());
            Err(FetchError::Status { url, status: status.as_u16() })
        }
    }

    async fn fetch_channel(&self, channel: &str) -> NetworkResult<EmoteTable> {
        let url = self.channel_url(channel);
        let response = check_status(&url, self.http.get(&url).send().await?)?;
        let table = response.json::<EmoteTable>().await?;
        debug!("Channel {} lists {} emote names", channel, table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpEmoteClient {
        HttpEmoteClient::new(HostSettings {
            asset_host: "https://assets.test/".to_string(),
            provision_host: "https://backend.test".to_string(),
            frame_extension: "webp".to_string(),
            user_agent: "emote-overlay-test".to_string(),
            ..HostSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        let emote = EmoteIdentity::new("60ae", crate::assets::Provider::new("7TV"));
        assert_eq!(client.metadata_url(&emote.id), "https://assets.test/60ae/info.json");
        assert_eq!(client.frame_url(&emote.id, 3), "https://assets.test/60ae/3.webp");
        assert_eq!(client.provision_url(&emote), "https://backend.test/emote/60ae/7TV");
        assert_eq!(client.channel_url("somechannel"), "https://backend.test/somechannel");
    }

    #[test]
    fn test_metadata_parsing() {
        let metadata: EmoteMetadata =
            serde_json::from_str(r#"{"frames":3,"frameDelay":[100,100,100],"width":64,"height":32}"#).unwrap();
        assert_eq!(metadata.frames, 3);
        assert_eq!(metadata.delays(), vec![Duration::from_millis(100); 3]);
        assert!(metadata.validate(&FetchLimits::default()).is_ok());

        let still: EmoteMetadata = serde_json::from_str(r#"{"frames":1,"width":28,"height":28}"#).unwrap();
        assert!(still.frame_delay.is_none());
        assert!(still.delays().is_empty());
    }

    #[test]
    fn test_zero_frames_rejected() {
        let metadata = EmoteMetadata { frames: 0, frame_delay: None, width: 10, height: 10 };
        assert!(matches!(
            metadata.validate(&FetchLimits::default()),
            Err(FetchError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn test_frame_count_over_limit_rejected() {
        let limits = FetchLimits { max_frames: 4, max_concurrent_frames: 2 };
        let at_limit = EmoteMetadata { frames: 4, frame_delay: None, width: 10, height: 10 };
        assert!(at_limit.validate(&limits).is_ok());

        let huge = EmoteMetadata { frames: u32::MAX, frame_delay: None, width: 10, height: 10 };
        assert!(matches!(huge.validate(&limits), Err(FetchError::InvalidMetadata { .. })));
    }

    #[test]
    fn test_limits_follow_host_settings() {
        let limits = FetchLimits::from(&HostSettings { max_frames: 64, max_concurrent_frames: 0, ..HostSettings::default() });
        assert_eq!(limits, FetchLimits { max_frames: 64, max_concurrent_frames: 1 });
        assert_eq!(FetchLimits::default().max_frames, 512);
    }
}
