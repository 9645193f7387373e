//! Common types for the preview-video widget.
//!
//! This crate defines the plain data shared between the widget library
//! (`widget`) and the demo host (`vidpreview`): the widget configuration,
//! geometry requests, theme property masks and the error taxonomy.
//!
//! Everything here is serializable so the host can print status snapshots
//! and geometry results as JSON.
//!
//! # Examples
//!
//! ```
//! use common::{GeometryRequest, Vec2, VideoSettings};
//! use std::time::Duration;
//!
//! let settings = VideoSettings {
//!     start_delay: Duration::from_secs(2),
//!     show_snapshot_delay: true,
//!     ..Default::default()
//! };
//! assert!(settings.has_start_delay());
//!
//! let request = GeometryRequest::MaxSize(Vec2::new(320.0, 240.0));
//! assert!(request.is_max_size());
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, BitOr, Mul, Sub};
use std::time::Duration;
use thiserror::Error;

/// Error types for the video widget.
///
/// None of these are fatal: the widget degrades to the fallback image or to
/// drawing nothing, and only reports the error through its log and boolean
/// return values.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VideoError {
    #[error("Invalid video target: {0}")]
    InvalidTarget(String),

    #[error("Video backend failed to load {path}: {reason}")]
    BackendLoad { path: String, reason: String },

    #[error("Geometry cannot be resolved until the texture size is known")]
    GeometryUnderdetermined,

    #[error("Image error: {0}")]
    Image(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Two-component float vector used for positions, sizes and origins.
///
/// Serializes as a `[x, y]` pair, which is how themes write it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Component-wise product (used to denormalize theme values)
    pub fn scale_by(self, other: Vec2) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<Vec2> for [f32; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl From<(u32, u32)> for Vec2 {
    fn from((w, h): (u32, u32)) -> Self {
        Self::new(w as f32, h as f32)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// How the rendered size is derived from the native texture size.
///
/// Resize and max-size are mutually exclusive: setting one replaces the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum GeometryRequest {
    /// Render at native size
    #[default]
    None,
    /// Resize to this size. A zero axis is scaled to keep the aspect ratio;
    /// both axes non-zero may break it; both zero means native size.
    ResizeTo(Vec2),
    /// Largest size that fits in this box. Never breaks the aspect ratio.
    MaxSize(Vec2),
}

impl GeometryRequest {
    pub fn is_resize(&self) -> bool {
        matches!(self, Self::ResizeTo(_))
    }

    pub fn is_max_size(&self) -> bool {
        matches!(self, Self::MaxSize(_))
    }

    /// The requested box, if any
    pub fn target(&self) -> Option<Vec2> {
        match self {
            Self::None => None,
            Self::ResizeTo(v) | Self::MaxSize(v) => Some(*v),
        }
    }
}

/// Widget configuration, set once per theme application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Grace period before a newly selected video starts playing
    #[serde(default)]
    pub start_delay: Duration,

    /// Show the fallback image when there is no video
    #[serde(default)]
    pub show_snapshot_no_video: bool,

    /// Show the fallback image while the start delay is running
    #[serde(default)]
    pub show_snapshot_delay: bool,

    /// Show the fallback image while the host screensaver is active
    #[serde(default)]
    pub show_snapshot_screensaver: bool,

    /// Video used by `set_default_video`
    #[serde(default)]
    pub default_video_path: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            start_delay: Duration::ZERO,
            show_snapshot_no_video: false,
            show_snapshot_delay: false,
            show_snapshot_screensaver: false,
            default_video_path: String::new(),
        }
    }
}

impl VideoSettings {
    pub fn has_start_delay(&self) -> bool {
        !self.start_delay.is_zero()
    }
}

/// Selects which theme properties an `apply_theme` call may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyMask(u32);

impl PropertyMask {
    pub const NONE: Self = Self(0);
    pub const PATH: Self = Self(1 << 0);
    pub const POSITION: Self = Self(1 << 1);
    pub const SIZE: Self = Self(1 << 2);
    pub const ORIGIN: Self = Self(1 << 3);
    pub const DELAY: Self = Self(1 << 4);
    pub const Z_INDEX: Self = Self(1 << 5);
    pub const VISIBLE: Self = Self(1 << 6);
    pub const ALL: Self = Self(u32::MAX);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// True if every bit of `other` is set
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PropertyMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An input hint shown by the host's help bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpPrompt {
    pub button: String,
    pub action: String,
}

impl HelpPrompt {
    pub fn new(button: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            button: button.into(),
            action: action.into(),
        }
    }
}

/// Decoder flavour, chosen when the widget is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Generic software decode
    #[default]
    Software,
    /// VA-API hardware decode
    Hardware,
}

impl BackendKind {
    /// Parse backend name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "software" | "sw" | "cpu" => Some(Self::Software),
            "hardware" | "hw" | "vaapi" => Some(Self::Hardware),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Hardware => "hardware",
        }
    }
}

/// Coarse playback phase, without the state's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackPhase {
    Idle,
    StartPending,
    Playing,
}

/// Snapshot of the widget, for status output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub phase: PlaybackPhase,
    pub video_target: Option<String>,
    pub playing_target: Option<String>,
    pub size: Vec2,
    pub fade_in: f32,
    pub loops: u64,
}
