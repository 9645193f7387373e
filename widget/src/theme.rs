//! Theme loading and application
//!
//! A theme is a TOML file of views, each holding named elements:
//!
//! ```toml
//! [views.detailed.md_video]
//! type = "video"
//! pos = [0.05, 0.25]
//! max_size = [0.45, 0.5]
//! origin = [0.0, 0.0]
//! delay = 1.5
//! default = "~/media/intro.mp4"
//! show_snapshot_no_video = true
//! ```
//!
//! Position and size values are normalized to the parent size.

use crate::component::{DEFAULT_Z_INDEX, VideoComponent};
use anyhow::{Context, Result};
use common::{PropertyMask, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Element type this widget reads
pub const VIDEO_ELEMENT_TYPE: &str = "video";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThemeData {
    #[serde(default)]
    pub views: HashMap<String, HashMap<String, ThemeElement>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThemeElement {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub pos: Option<Vec2>,

    #[serde(default)]
    pub size: Option<Vec2>,

    #[serde(default)]
    pub max_size: Option<Vec2>,

    #[serde(default)]
    pub origin: Option<Vec2>,

    /// Default video path
    #[serde(default)]
    pub default: Option<String>,

    /// Start delay in seconds
    #[serde(default)]
    pub delay: Option<f32>,

    #[serde(default)]
    pub show_snapshot_no_video: Option<bool>,

    #[serde(default)]
    pub show_snapshot_delay: Option<bool>,

    #[serde(default)]
    pub show_snapshot_screensaver: Option<bool>,

    #[serde(default)]
    pub z_index: Option<f32>,

    #[serde(default)]
    pub visible: Option<bool>,
}

impl ThemeData {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme file: {}", path.display()))?;

        let theme = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse theme file: {}", path.display()))?;

        log::info!(
            "Loaded theme from {} ({} views)",
            path.display(),
            theme.views.len()
        );
        Ok(theme)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn element(&self, view: &str, element: &str) -> Option<&ThemeElement> {
        self.views.get(view)?.get(element)
    }
}

fn seconds_to_duration(seconds: f32) -> Duration {
    Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or(Duration::ZERO)
}

impl VideoComponent {
    /// Apply the `video` element `view`/`element` of `theme`.
    ///
    /// Only fields that are present and selected by `mask` change; everything
    /// else keeps its current value. Returns false when the element does not
    /// exist or is not a video element.
    pub fn apply_theme(
        &mut self,
        theme: &ThemeData,
        view: &str,
        element: &str,
        mask: PropertyMask,
    ) -> bool {
        let Some(elem) = theme.element(view, element) else {
            log::debug!("Theme has no element {}.{}", view, element);
            return false;
        };
        if elem.kind != VIDEO_ELEMENT_TYPE {
            log::warn!(
                "Theme element {}.{} has type {:?}, expected {:?}",
                view,
                element,
                elem.kind,
                VIDEO_ELEMENT_TYPE
            );
            return false;
        }

        let scale = self.parent_size();

        if mask.contains(PropertyMask::POSITION) {
            if let Some(pos) = elem.pos {
                let pos = pos.scale_by(scale);
                self.set_position(pos.x, pos.y);
            }
        }

        if mask.contains(PropertyMask::SIZE) {
            if let Some(size) = elem.size {
                let size = size.scale_by(scale);
                self.set_resize(size.x, size.y);
            } else if let Some(max_size) = elem.max_size {
                let max_size = max_size.scale_by(scale);
                self.set_max_size(max_size.x, max_size.y);
            }
        }

        let origin_selected = mask.contains(PropertyMask::ORIGIN)
            || mask.contains(PropertyMask::POSITION | PropertyMask::SIZE);
        if origin_selected {
            if let Some(origin) = elem.origin {
                self.set_origin(origin.x, origin.y);
            }
        }

        let mut settings = self.settings().clone();
        if mask.contains(PropertyMask::PATH) {
            if let Some(default) = &elem.default {
                settings.default_video_path = default.clone();
            }
        }
        if mask.contains(PropertyMask::DELAY) {
            if let Some(delay) = elem.delay {
                settings.start_delay = seconds_to_duration(delay);
            }
        }
        if let Some(show) = elem.show_snapshot_no_video {
            settings.show_snapshot_no_video = show;
        }
        if let Some(show) = elem.show_snapshot_delay {
            settings.show_snapshot_delay = show;
        }
        if let Some(show) = elem.show_snapshot_screensaver {
            settings.show_snapshot_screensaver = show;
        }
        self.set_settings(settings);

        if mask.contains(PropertyMask::Z_INDEX) {
            self.set_z_index(elem.z_index.unwrap_or(DEFAULT_Z_INDEX));
        }
        if mask.contains(PropertyMask::VISIBLE) {
            self.set_visible(elem.visible.unwrap_or(true));
        }

        log::debug!("Applied theme element {}.{}", view, element);
        true
    }
}
