//! Fallback image layer
//!
//! Shown in place of the video while no clip is playing. The widget mirrors
//! its origin, opacity and size request into the image so both layers line
//! up on screen.

use crate::geometry::GeometryResolver;
use crate::render::{ImageDraw, Rect, Transform};
use common::{Vec2, VideoError};
use std::path::{Path, PathBuf};

/// Image widget used as the video's fallback
pub trait FallbackImage {
    /// Load `path`; on error the previous image is cleared
    fn set_image(&mut self, path: &Path) -> Result<(), VideoError>;

    fn clear(&mut self);

    fn path(&self) -> Option<&Path>;

    fn has_image(&self) -> bool {
        self.path().is_some()
    }

    fn set_resize(&mut self, target: Vec2);

    fn set_max_size(&mut self, bounds: Vec2);

    fn set_origin(&mut self, origin: Vec2);

    fn set_opacity(&mut self, opacity: u8);

    /// Resolved on-screen size, zero until the image is known
    fn size(&self) -> Vec2;

    /// Draw command for this frame, `None` when there is nothing to show
    fn render(&self, transform: &Transform) -> Option<ImageDraw>;
}

/// Fallback image backed by a file on disk
///
/// Only the header is probed here; decoding the pixels is left to the host
/// renderer which receives the path in [`ImageDraw`].
#[derive(Debug, Clone)]
pub struct StaticImage {
    path: Option<PathBuf>,
    geometry: GeometryResolver,
    origin: Vec2,
    opacity: u8,
}

impl StaticImage {
    pub fn new() -> Self {
        Self {
            path: None,
            geometry: GeometryResolver::new(),
            origin: Vec2::ZERO,
            opacity: 255,
        }
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }
}

impl Default for StaticImage {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackImage for StaticImage {
    fn set_image(&mut self, path: &Path) -> Result<(), VideoError> {
        match ::image::image_dimensions(path) {
            Ok(dims) => {
                log::debug!(
                    "Fallback image {} is {}x{}",
                    path.display(),
                    dims.0,
                    dims.1
                );
                self.path = Some(path.to_path_buf());
                self.geometry.set_native(Some(Vec2::from(dims)));
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(VideoError::Image(format!("{}: {}", path.display(), e)))
            }
        }
    }

    fn clear(&mut self) {
        self.path = None;
        self.geometry.set_native(None);
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn set_resize(&mut self, target: Vec2) {
        self.geometry.set_resize(target);
    }

    fn set_max_size(&mut self, bounds: Vec2) {
        self.geometry.set_max_size(bounds);
    }

    fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    fn size(&self) -> Vec2 {
        if self.geometry.is_resolved() {
            self.geometry.size()
        } else {
            Vec2::ZERO
        }
    }

    fn render(&self, transform: &Transform) -> Option<ImageDraw> {
        let path = self.path.as_ref()?;
        if !self.geometry.is_resolved() || self.opacity == 0 {
            return None;
        }

        Some(ImageDraw {
            path: path.clone(),
            rect: Rect::anchored(transform, self.geometry.size(), self.origin),
            opacity: self.opacity,
        })
    }
}
