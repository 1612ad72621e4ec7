use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const CONFIG_FILE: &str = "overlay.toml";

pub const DEFAULT_BRIGHTNESS: f32 = 4.0;
pub const MIN_BRIGHTNESS: f32 = 0.5;
pub const MAX_BRIGHTNESS: f32 = 20.0;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings file is invalid: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Settings could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// =============================================================================
// Overlay Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub asset_host: String,
    pub provision_host: String,
    pub frame_extension: String,
    pub user_agent: String,
    /// Metadata announcing more frames than this is rejected before any download.
    pub max_frames: u32,
    pub max_concurrent_frames: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            asset_host: "https://emotes.anakyu.io".to_string(),
            provision_host: "https://ecorp.anakyu.io".to_string(),
            frame_extension: "webp".to_string(),
            user_agent: format!("emote-overlay/{}", env!("CARGO_PKG_VERSION")),
            max_frames: 512,
            max_concurrent_frames: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub capacity: usize,
    pub display_secs: f32,
    pub shrink_secs: f32,
    pub spawn_min: [f32; 2],
    pub spawn_max: [f32; 2],
    pub offscreen: [f32; 2],
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            display_secs: 10.0,
            shrink_secs: 2.0,
            spawn_min: [-1.0, 0.1],
            spawn_max: [1.0, 1.35],
            offscreen: [-5.0, 0.5],
        }
    }
}

const DEFAULT_DISPLAY: Duration = Duration::from_secs(10);
const DEFAULT_SHRINK: Duration = Duration::from_secs(2);

impl PoolSettings {
    /// A negative, NaN or overflowing value falls back to the default.
    pub fn display_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.display_secs).unwrap_or(DEFAULT_DISPLAY)
    }

    pub fn shrink_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.shrink_secs).unwrap_or(DEFAULT_SHRINK)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub bounds_min: [f32; 2],
    pub bounds_max: [f32; 2],
    pub speed_divisor: f32,
    pub boundary_inset: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            bounds_min: [-1.4, 0.05],
            bounds_max: [1.4, 1.4],
            speed_divisor: 4.0,
            boundary_inset: 0.00001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub default_delay_ms: u32,
    pub placeholder_width: u32,
    pub placeholder_height: u32,
    pub base_scale: f32,
    pub tint: String,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            default_delay_ms: 50,
            placeholder_width: 128,
            placeholder_height: 128,
            base_scale: 0.15,
            tint: "#cccccc".to_string(),
        }
    }
}

impl AnimationSettings {
    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.default_delay_ms))
    }

    /// Tint as linear-ish RGB in `[0, 1]`. Falls back to white on a malformed value.
    pub fn tint_rgb(&self) -> [f32; 3] {
        parse_hex_color(&self.tint).unwrap_or([1.0, 1.0, 1.0])
    }
}

fn parse_hex_color(value: &str) -> Option<[f32; 3]> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok().map(|v| v as f32 / 255.0);
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub tag_occurrence_cap: usize,
    pub text_match_cap: usize,
    pub irc_host: String,
    pub irc_port: u16,
    pub reconnect_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            tag_occurrence_cap: 3,
            text_match_cap: 4,
            irc_host: "irc.chat.twitch.tv".to_string(),
            irc_port: 6667,
            reconnect_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub hosts: HostSettings,
    pub pool: PoolSettings,
    pub motion: MotionSettings,
    pub animation: AnimationSettings,
    pub chat: ChatSettings,
    pub tick_rate_hz: u32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            hosts: HostSettings::default(),
            pool: PoolSettings::default(),
            motion: MotionSettings::default(),
            animation: AnimationSettings::default(),
            chat: ChatSettings::default(),
            tick_rate_hz: 60,
        }
    }
}

impl OverlaySettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// Configuration file management
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "emote-overlay", "emote-overlay")
        .map(|proj| proj.config_dir().join(CONFIG_FILE))
}

pub fn load_settings_from(path: &Path) -> Result<OverlaySettings, SettingsError> {
    let data = fs::read_to_string(path)?;
    Ok(toml::from_str::<OverlaySettings>(&data)?)
}

pub fn save_settings_to(path: &Path, settings: &OverlaySettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(settings)?;
    fs::write(path, toml)?;
    Ok(())
}

/// Settings from the default location, if a readable file exists there.
pub fn load_settings() -> Option<OverlaySettings> {
    let path = default_settings_path()?;
    if !path.exists() {
        return None;
    }
    match load_settings_from(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!("Ignoring settings at {}: {}", path.display(), e);
            None
        }
    }
}

pub fn save_settings(settings: &OverlaySettings) -> Result<(), SettingsError> {
    match default_settings_path() {
        Some(path) => save_settings_to(&path, settings),
        None => Ok(()),
    }
}

// =============================================================================
// Stream Parameters
// =============================================================================

/// Inbound page configuration: which channel to follow and the scene brightness.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParams {
    pub channel: Option<String>,
    pub brightness: f32,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self { channel: None, brightness: DEFAULT_BRIGHTNESS }
    }
}

impl StreamParams {
    pub fn new(channel: Option<String>, brightness: Option<f32>) -> Self {
        Self {
            channel: channel.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            brightness: clamp_brightness(brightness),
        }
    }

    /// Read `?channel=...&brightness=...` from a page URL.
    pub fn from_url(url: &Url) -> Self {
        let mut channel = None;
        let mut brightness = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "channel" => channel = Some(value.into_owned()),
                "brightness" => brightness = value.parse::<f32>().ok(),
                _ => {}
            }
        }
        Self::new(channel, brightness)
    }

    /// CLI values take precedence over the ones found in the page URL.
    pub fn merge(self, overrides: StreamParams, brightness_overridden: bool) -> Self {
        Self {
            channel: overrides.channel.or(self.channel),
            brightness: if brightness_overridden { overrides.brightness } else { self.brightness },
        }
    }
}

pub fn clamp_brightness(value: Option<f32>) -> f32 {
    match value {
        Some(v) if v.is_finite() => v.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS),
        _ => DEFAULT_BRIGHTNESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_overlay_constants() {
        let settings = OverlaySettings::default();
        assert_eq!(settings.pool.capacity, 100);
        assert_eq!(settings.pool.display_duration(), Duration::from_secs(10));
        assert_eq!(settings.chat.tag_occurrence_cap, 3);
        assert_eq!(settings.chat.text_match_cap, 4);
        assert_eq!(settings.animation.default_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: OverlaySettings = toml::from_str("[pool]\ncapacity = 8\n").unwrap();
        assert_eq!(settings.pool.capacity, 8);
        assert_eq!(settings.pool.shrink_secs, 2.0);
        assert_eq!(settings.hosts, HostSettings::default());
    }

    #[test]
    fn test_unrepresentable_durations_fall_back() {
        let pool = PoolSettings { display_secs: f32::INFINITY, shrink_secs: f32::NAN, ..PoolSettings::default() };
        assert_eq!(pool.display_duration(), Duration::from_secs(10));
        assert_eq!(pool.shrink_duration(), Duration::from_secs(2));

        let pool = PoolSettings { display_secs: -1.0, shrink_secs: 0.0, ..PoolSettings::default() };
        assert_eq!(pool.display_duration(), Duration::from_secs(10));
        assert_eq!(pool.shrink_duration(), Duration::ZERO);

        let settings: OverlaySettings = toml::from_str("[pool]\ndisplay_secs = inf\nshrink_secs = nan\n").unwrap();
        assert_eq!(settings.pool.display_duration(), Duration::from_secs(10));
        assert_eq!(settings.pool.shrink_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_tint_parsing() {
        let mut animation = AnimationSettings::default();
        let [r, g, b] = animation.tint_rgb();
        assert!((r - 0.8).abs() < 1e-6 && (g - 0.8).abs() < 1e-6 && (b - 0.8).abs() < 1e-6);
        animation.tint = "nope".to_string();
        assert_eq!(animation.tint_rgb(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_brightness_clamp() {
        assert_eq!(clamp_brightness(None), 4.0);
        assert_eq!(clamp_brightness(Some(100.0)), 20.0);
        assert_eq!(clamp_brightness(Some(0.0)), 0.5);
        assert_eq!(clamp_brightness(Some(f32::NAN)), 4.0);
        assert_eq!(clamp_brightness(Some(7.5)), 7.5);
    }

    #[test]
    fn test_stream_params_from_url() {
        let url = Url::parse("https://overlay.test/?channel=somechannel&brightness=12").unwrap();
        let params = StreamParams::from_url(&url);
        assert_eq!(params.channel.as_deref(), Some("somechannel"));
        assert_eq!(params.brightness, 12.0);

        let url = Url::parse("https://overlay.test/?brightness=bright").unwrap();
        let params = StreamParams::from_url(&url);
        assert_eq!(params.channel, None);
        assert_eq!(params.brightness, DEFAULT_BRIGHTNESS);
    }

    #[test]
    fn test_cli_overrides_url() {
        let from_url = StreamParams::new(Some("a".into()), Some(2.0));
        let merged = from_url.clone().merge(StreamParams::new(Some("b".into()), None), false);
        assert_eq!(merged.channel.as_deref(), Some("b"));
        assert_eq!(merged.brightness, 2.0);

        let merged = from_url.merge(StreamParams::new(None, Some(9.0)), true);
        assert_eq!(merged.channel.as_deref(), Some("a"));
        assert_eq!(merged.brightness, 9.0);
    }
}
