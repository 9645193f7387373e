//! Render output of the widget
//!
//! The widget does not draw by itself. Each frame it returns a
//! [`RenderCommand`] describing exactly one layer, and the host turns that
//! into draw calls on its own renderer.

use crate::texture::TextureHandle;
use common::Vec2;
use std::path::PathBuf;

/// 2D affine transform restricted to translation and axis scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec2,
    pub scale: Vec2,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        scale: Vec2::new(1.0, 1.0),
    };

    pub fn from_translation(translation: Vec2) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// `self` applied after `child` (parent * child)
    pub fn then(&self, child: &Transform) -> Self {
        Self {
            translation: self.translation + child.translation.scale_by(self.scale),
            scale: self.scale.scale_by(child.scale),
        }
    }

    pub fn apply_point(&self, point: Vec2) -> Vec2 {
        self.translation + point.scale_by(self.scale)
    }

    pub fn apply_size(&self, size: Vec2) -> Vec2 {
        size.scale_by(self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Screen-space rectangle (top-left corner and size)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top_left: Vec2,
    pub size: Vec2,
}

impl Rect {
    /// Place a box of `size` anchored at the local origin by `origin`
    pub fn anchored(transform: &Transform, size: Vec2, origin: Vec2) -> Self {
        Self {
            top_left: transform.apply_point(Vec2::ZERO - size.scale_by(origin)),
            size: transform.apply_size(size),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.top_left + self.size * 0.5
    }
}

/// Draw the fallback image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDraw {
    pub path: PathBuf,
    pub rect: Rect,
    pub opacity: u8,
}

/// Draw the current video frame
#[derive(Debug, Clone)]
pub struct VideoDraw {
    pub texture: TextureHandle,
    pub rect: Rect,
    pub opacity: u8,
}

/// The single layer chosen for this frame
#[derive(Debug, Clone, Default)]
pub enum RenderCommand {
    #[default]
    Nothing,
    Fallback(ImageDraw),
    Video(VideoDraw),
}

impl RenderCommand {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::Fallback(_) => "fallback",
            Self::Video(_) => "video",
        }
    }
}

/// Scale an 8-bit opacity by a 0.0-1.0 factor
pub fn scale_opacity(opacity: u8, factor: f32) -> u8 {
    (opacity as f32 * factor.clamp(0.0, 1.0)).round() as u8
}
