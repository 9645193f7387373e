//! Looping preview-video widget
//!
//! Plays a short clip inside a theme-driven menu, with a start delay to
//! avoid flicker during fast navigation and a static fallback image while
//! no clip is on screen. The host calls the lifecycle hooks on
//! [`VideoComponent`] and draws whatever [`RenderCommand`] it returns.

mod macros;

pub mod backend;
pub mod component;
pub mod config;
pub mod fade;
pub mod geometry;
pub mod image;
pub mod paths;
pub mod render;
pub mod stats;
pub mod texture;
pub mod theme;

pub use backend::{NullBackend, VideoBackend, create_backend};
pub use component::{PlaybackState, VideoComponent};
pub use config::Config;
pub use geometry::GeometryResolver;
pub use crate::image::{FallbackImage, StaticImage};
pub use paths::PathResolver;
pub use render::{ImageDraw, Rect, RenderCommand, Transform, VideoDraw};
pub use texture::{FrameData, TextureHandle, TextureSlot};
pub use theme::{ThemeData, ThemeElement};

#[cfg(feature = "video")]
pub use backend::GstBackend;
