use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

/// Process-level configuration, read from `config.toml`.
///
/// Everything the user edits through the host's property inspector lives in
/// [`crate::settings::GlobalSettings`] instead; this file only carries
/// defaults and timing knobs that are not exposed in the UI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player URL used when the host settings do not carry one.
    #[serde(default = "default_player_url")]
    pub default_url: String,
    /// Sent as `X-Plex-Client-Identifier` on every player request.
    #[serde(default = "default_client_identifier")]
    pub client_identifier: String,
    /// Server sessions whose player reports this product are accepted as ours.
    #[serde(default = "default_product_name")]
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
    #[serde(default = "default_hold_threshold_ms")]
    pub hold_threshold_ms: u64,
    #[serde(default = "default_seek_repeat_ms")]
    pub seek_repeat_ms: u64,
    #[serde(default = "default_seek_step_ms")]
    pub seek_step_ms: i64,
    #[serde(default = "default_overlay_dwell_ms")]
    pub overlay_dwell_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderConfig {
    /// Font used for all text.  When unset, the bundled font and a list of
    /// system fonts are tried in order.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_url: default_player_url(),
            client_identifier: default_client_identifier(),
            product_name: default_product_name(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            render_interval_ms: default_render_interval_ms(),
            hold_threshold_ms: default_hold_threshold_ms(),
            seek_repeat_ms: default_seek_repeat_ms(),
            seek_step_ms: default_seek_step_ms(),
            overlay_dwell_ms: default_overlay_dwell_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_player_url() -> String {
    "http://localhost:32500".to_string()
}

fn default_client_identifier() -> String {
    "com.rackemrack.ampdeck".to_string()
}

fn default_product_name() -> String {
    "Plexamp".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_render_interval_ms() -> u64 {
    200
}

fn default_hold_threshold_ms() -> u64 {
    400
}

fn default_seek_repeat_ms() -> u64 {
    200
}

fn default_seek_step_ms() -> i64 {
    10_000
}

fn default_overlay_dwell_ms() -> u64 {
    1500
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
