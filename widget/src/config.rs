use crate::fade::FADE_TIME;
use crate::paths::PathResolver;
use crate::validate_enum;
use anyhow::{Context, Result};
use common::{BackendKind, VideoSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Playback defaults; a theme may override most of these per element
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    /// "software" or "hardware"
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub start_delay_ms: u64,

    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,

    #[serde(default)]
    pub show_snapshot_no_video: bool,

    #[serde(default)]
    pub show_snapshot_delay: bool,

    #[serde(default)]
    pub show_snapshot_screensaver: bool,

    #[serde(default)]
    pub default_video: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            start_delay_ms: 0,
            fade_ms: default_fade_ms(),
            show_snapshot_no_video: false,
            show_snapshot_delay: false,
            show_snapshot_screensaver: false,
            default_video: String::new(),
        }
    }
}

fn default_backend() -> String {
    "software".to_string()
}
fn default_fade_ms() -> u64 {
    FADE_TIME.as_millis() as u64
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathSettings {
    /// Root for relative media paths
    #[serde(default)]
    pub media_root: Option<String>,

    /// Per-title media folder under the root
    #[serde(default)]
    pub title_folder: String,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("vidwidget");

        Ok(config_dir.join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        self.validate_log_level(&self.general.log_level)?;

        if BackendKind::from_name(&self.video.backend).is_none() {
            anyhow::bail!(
                "Invalid video backend: {} (expected software or hardware)",
                self.video.backend
            );
        }

        Ok(())
    }

    fn validate_log_level(&self, level: &str) -> Result<()> {
        validate_enum!(level, "trace", "debug", "info", "warn", "error")
    }

    /// Widget settings seeded from the `[video]` table
    pub fn to_settings(&self) -> VideoSettings {
        VideoSettings {
            start_delay: Duration::from_millis(self.video.start_delay_ms),
            show_snapshot_no_video: self.video.show_snapshot_no_video,
            show_snapshot_delay: self.video.show_snapshot_delay,
            show_snapshot_screensaver: self.video.show_snapshot_screensaver,
            default_video_path: self.video.default_video.clone(),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        BackendKind::from_name(&self.video.backend).unwrap_or_default()
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.video.fade_ms)
    }

    pub fn path_resolver(&self) -> PathResolver {
        let root = self
            .paths
            .media_root
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| PathBuf::from(shellexpand::tilde(r).into_owned()));
        PathResolver::new(root).with_title_folder(self.paths.title_folder.clone())
    }
}
