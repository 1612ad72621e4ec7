pub mod settings;

// Re-export commonly used types
pub use settings::{
    AnimationSettings, ChatSettings, HostSettings, MotionSettings, OverlaySettings, PoolSettings,
    SettingsError, StreamParams, clamp_brightness, default_settings_path, load_settings,
    load_settings_from, save_settings, save_settings_to,
};
