//! Looping preview video widget
//!
//! [`VideoComponent`] owns the playback state machine:
//!
//! ```text
//!   Idle ──set_video/on_show──▶ StartPending ──delay elapsed──▶ Playing ─┐
//!    ▲                              │                              ▲     │ end of clip
//!    └──── on_hide / empty target ◀─┴──────────────────────────────┘◀────┘ (restart)
//! ```
//!
//! The host drives it with lifecycle hooks and a per-frame `update`/`render`
//! pair. Nothing here returns an error to the host: a clip that cannot be
//! loaded degrades to the fallback image, and a texture that disappears is
//! treated as not loaded yet.

use crate::backend::{VideoBackend, create_backend};
use crate::fade::{FADE_TIME, Fade, delay_fade_out};
use crate::geometry::GeometryResolver;
use crate::image::{FallbackImage, StaticImage};
use crate::paths::PathResolver;
use crate::render::{Rect, RenderCommand, Transform, VideoDraw, scale_opacity};
use crate::stats::{PlaybackStats, STATS_LOG_INTERVAL};
use crate::texture::TextureHandle;
use common::{
    BackendKind, GeometryRequest, HelpPrompt, PlaybackPhase, PlaybackStatus, Vec2, VideoError,
    VideoSettings,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Z-order used when a theme does not set one
pub const DEFAULT_Z_INDEX: f32 = 30.0;

/// Reference size normalized theme coordinates are multiplied by
pub const DEFAULT_PARENT_SIZE: Vec2 = Vec2::new(1280.0, 720.0);

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    /// No target, or a target waiting for the widget to become active
    Idle,
    /// Start delay running
    StartPending { elapsed: Duration },
    /// Backend loaded `target` and is decoding
    Playing { target: PathBuf },
}

impl PlaybackState {
    pub fn phase(&self) -> PlaybackPhase {
        match self {
            Self::Idle => PlaybackPhase::Idle,
            Self::StartPending { .. } => PlaybackPhase::StartPending,
            Self::Playing { .. } => PlaybackPhase::Playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::StartPending { .. })
    }
}

pub struct VideoComponent {
    backend: Box<dyn VideoBackend>,
    image: Box<dyn FallbackImage>,
    paths: PathResolver,
    settings: VideoSettings,

    state: PlaybackState,
    video_target: Option<PathBuf>,

    /// Target whose last load failed; not retried until `set_video` is called again
    failed_target: Option<PathBuf>,

    image_path: Option<PathBuf>,
    texture: Option<TextureHandle>,
    geometry: GeometryResolver,

    position: Vec2,
    origin: Vec2,
    parent_size: Vec2,
    opacity: u8,
    z_index: f32,
    visible: bool,

    fade_duration: Duration,
    video_fade: Fade,
    snapshot_fade: Fade,

    showing: bool,
    disabled: bool,
    screensaver_active: bool,
    screensaver_mode: bool,

    stats: PlaybackStats,
}

impl VideoComponent {
    /// Create a widget that plays through `backend`.
    ///
    /// The widget starts out showing; hosts that construct it off-screen
    /// call `on_hide` first.
    pub fn new(backend: Box<dyn VideoBackend>) -> Self {
        log::debug!("Creating video component ({} backend)", backend.name());
        Self {
            backend,
            image: Box::new(StaticImage::new()),
            paths: PathResolver::default(),
            settings: VideoSettings::default(),
            state: PlaybackState::Idle,
            video_target: None,
            failed_target: None,
            image_path: None,
            texture: None,
            geometry: GeometryResolver::new(),
            position: Vec2::ZERO,
            origin: Vec2::ZERO,
            parent_size: DEFAULT_PARENT_SIZE,
            opacity: 255,
            z_index: DEFAULT_Z_INDEX,
            visible: true,
            fade_duration: FADE_TIME,
            video_fade: Fade::completed(FADE_TIME),
            snapshot_fade: Fade::completed(FADE_TIME),
            showing: true,
            disabled: false,
            screensaver_active: false,
            screensaver_mode: false,
            stats: PlaybackStats::new(),
        }
    }

    pub fn with_backend_kind(kind: BackendKind) -> Self {
        Self::new(create_backend(kind))
    }

    pub fn with_fallback(mut self, image: Box<dyn FallbackImage>) -> Self {
        self.image = image;
        self.image.set_origin(self.origin);
        self.image.set_opacity(self.opacity);
        self
    }

    pub fn with_path_resolver(mut self, paths: PathResolver) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_settings(mut self, settings: VideoSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self.video_fade = Fade::completed(duration);
        self.snapshot_fade = Fade::completed(duration);
        self
    }

    /// Select the clip to play.
    ///
    /// Returns false for an empty path, which stops playback and clears the
    /// target, and for a file that does not exist, which is kept as the
    /// target so the fallback image shows. Selecting the clip that is already
    /// pending or playing is a no-op.
    pub fn set_video(&mut self, path: &str) -> bool {
        if path.is_empty() {
            if self.video_target.is_some() {
                log::debug!("Video target cleared");
            }
            self.stop_video();
            self.video_target = None;
            self.failed_target = None;
            return false;
        }

        let target = self.paths.resolve(path);
        if !target.is_file() {
            log::warn!("Video file not found: {}", target.display());
            self.stop_video();
            self.failed_target = Some(target.clone());
            self.video_target = Some(target);
            return false;
        }

        if self.video_target.as_ref() == Some(&target)
            && (self.state.is_playing() || self.state.is_pending())
        {
            return true;
        }

        log::debug!("Video target set to {}", target.display());
        self.stop_video();
        self.failed_target = None;
        self.video_target = Some(target);
        self.arm();
        true
    }

    /// Play the configured default video
    pub fn set_default_video(&mut self) -> bool {
        let path = self.settings.default_video_path.clone();
        self.set_video(&path)
    }

    /// Set the fallback image; an empty path removes it
    pub fn set_image(&mut self, path: &str) {
        let resolved = (!path.is_empty()).then(|| self.paths.resolve(path));
        if resolved == self.image_path {
            return;
        }

        match resolved {
            None => {
                self.image.clear();
                self.image_path = None;
            }
            Some(resolved) => match self.image.set_image(&resolved) {
                Ok(()) => {
                    self.image_path = Some(resolved);
                    self.snapshot_fade.reset();
                }
                Err(e) => {
                    log::warn!("Failed to load fallback image: {}", e);
                    self.image_path = None;
                }
            },
        }
    }

    /// Mark this widget as the screensaver's own video (no start delay)
    pub fn set_screensaver_mode(&mut self, enabled: bool) {
        self.screensaver_mode = enabled;
    }

    pub fn set_settings(&mut self, settings: VideoSettings) {
        self.settings = settings;
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    /// Anchor point, normalized to the widget's size
    pub fn set_origin(&mut self, x: f32, y: f32) {
        self.origin = Vec2::new(x, y);
        self.image.set_origin(self.origin);
    }

    /// Resize to `width`x`height`; a zero axis keeps the aspect ratio
    pub fn set_resize(&mut self, width: f32, height: f32) {
        let target = Vec2::new(width, height);
        self.geometry.set_resize(target);
        self.image.set_resize(target);
    }

    /// Fit inside `width`x`height`, keeping the aspect ratio
    pub fn set_max_size(&mut self, width: f32, height: f32) {
        let bounds = Vec2::new(width, height);
        self.geometry.set_max_size(bounds);
        self.image.set_max_size(bounds);
    }

    /// The widget's box changed; the current request is re-issued with the
    /// new size so both layers follow it
    pub fn on_size_changed(&mut self, width: f32, height: f32) {
        match self.geometry.request() {
            GeometryRequest::MaxSize(_) => self.set_max_size(width, height),
            _ => self.set_resize(width, height),
        }
    }

    /// Size normalized theme values are relative to
    pub fn set_parent_size(&mut self, size: Vec2) {
        self.parent_size = size;
    }

    pub fn set_z_index(&mut self, z_index: f32) {
        self.z_index = z_index;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Applies to the video and the fallback image
    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
        self.image.set_opacity(opacity);
    }

    /// Center of the rendered box in parent coordinates
    pub fn get_center(&self) -> Vec2 {
        self.geometry.center(self.position, self.origin)
    }

    /// Advance timers by `delta`. Nothing moves while the widget is hidden,
    /// obscured or replaced by the screensaver.
    pub fn update(&mut self, delta: Duration) {
        self.snapshot_fade.advance(delta);

        if !self.is_active() {
            return;
        }

        let start_now = match &mut self.state {
            PlaybackState::StartPending { elapsed } => {
                *elapsed += delta;
                *elapsed >= self.settings.start_delay
            }
            _ => false,
        };
        if start_now {
            self.start_playback();
            return;
        }

        if self.state.is_playing() {
            if let Some(e) = self.backend.take_error() {
                self.playback_failed(e);
                return;
            }

            #[cfg(feature = "profiling")]
            let frame_start = std::time::Instant::now();

            self.video_fade.advance(delta);
            self.stats.advance(delta);
            self.handle_looping();
            self.pull_frame();
            self.stats.maybe_log_stats(STATS_LOG_INTERVAL);

            #[cfg(feature = "profiling")]
            log::trace!("Video update took {:?}", frame_start.elapsed());
        }
    }

    /// Choose the layer to draw this frame
    pub fn render(&self, parent: &Transform) -> RenderCommand {
        if !self.showing || self.disabled || !self.visible {
            return RenderCommand::Nothing;
        }

        let transform = parent.then(&Transform::from_translation(self.position));

        if self.screensaver_active {
            return if self.settings.show_snapshot_screensaver {
                self.render_fallback(&transform, 1.0)
            } else {
                RenderCommand::Nothing
            };
        }

        match &self.state {
            PlaybackState::Playing { .. } => match self.video_draw(&transform) {
                Some(draw) => RenderCommand::Video(draw),
                None => self.render_fallback(&transform, 1.0),
            },
            PlaybackState::StartPending { elapsed } => {
                if self.settings.show_snapshot_delay {
                    let remaining = self.settings.start_delay.saturating_sub(*elapsed);
                    self.render_fallback(&transform, delay_fade_out(remaining, self.fade_duration))
                } else {
                    RenderCommand::Nothing
                }
            }
            PlaybackState::Idle => {
                if self.video_target.is_some() || self.settings.show_snapshot_no_video {
                    self.render_fallback(&transform, 1.0)
                } else {
                    RenderCommand::Nothing
                }
            }
        }
    }

    pub fn on_show(&mut self) {
        self.showing = true;
        if !self.state.is_playing() {
            self.arm();
        }
    }

    pub fn on_hide(&mut self) {
        self.showing = false;
        self.stop_video();
    }

    pub fn on_screensaver_activate(&mut self) {
        self.screensaver_active = true;
        self.stop_video();
    }

    pub fn on_screensaver_deactivate(&mut self) {
        self.screensaver_active = false;
        if !self.state.is_playing() {
            self.arm();
        }
    }

    /// `false` while a modal overlay covers the widget. The countdown and
    /// decoding pause and continue where they left off once back on top.
    pub fn top_window(&mut self, is_top: bool) {
        if self.disabled == !is_top {
            return;
        }
        self.disabled = !is_top;
        log::debug!(
            "Video component {}",
            if is_top { "resumed" } else { "paused" }
        );

        if self.state.is_playing() {
            self.backend.set_paused(!is_top);
        } else if is_top && self.state == PlaybackState::Idle {
            self.arm();
        }
    }

    pub fn help_prompts(&self) -> Vec<HelpPrompt> {
        vec![HelpPrompt::new("a", "select")]
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state.phase()
    }

    pub fn video_target(&self) -> Option<&Path> {
        self.video_target.as_deref()
    }

    /// Clip the backend has loaded, `None` unless playing
    pub fn playing_target(&self) -> Option<&Path> {
        match &self.state {
            PlaybackState::Playing { target } => Some(target),
            _ => None,
        }
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    /// Resolved video size (last known while the texture is unavailable)
    pub fn size(&self) -> Vec2 {
        self.geometry.size()
    }

    pub fn geometry(&self) -> &GeometryResolver {
        &self.geometry
    }

    pub fn settings(&self) -> &VideoSettings {
        &self.settings
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn parent_size(&self) -> Vec2 {
        self.parent_size
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn z_index(&self) -> f32 {
        self.z_index
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_screensaver_mode(&self) -> bool {
        self.screensaver_mode
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current video fade-in multiplier
    pub fn fade_in(&self) -> f32 {
        self.video_fade.progress()
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            phase: self.phase(),
            video_target: self.video_target.as_ref().map(|p| p.display().to_string()),
            playing_target: self.playing_target().map(|p| p.display().to_string()),
            size: self.size(),
            fade_in: self.fade_in(),
            loops: self.stats.loops(),
        }
    }

    fn is_active(&self) -> bool {
        self.showing && !self.disabled && !self.screensaver_active
    }

    fn uses_start_delay(&self) -> bool {
        self.settings.has_start_delay() && !self.screensaver_mode
    }

    /// Enter StartPending, or start right away when there is no delay
    fn arm(&mut self) {
        let Some(target) = &self.video_target else {
            self.state = PlaybackState::Idle;
            return;
        };

        if !self.is_active() || self.failed_target.as_ref() == Some(target) {
            self.state = PlaybackState::Idle;
            return;
        }

        if self.uses_start_delay() {
            log::debug!(
                "Video start delayed by {}ms",
                self.settings.start_delay.as_millis()
            );
            self.state = PlaybackState::StartPending {
                elapsed: Duration::ZERO,
            };
        } else {
            self.start_playback();
        }
    }

    fn start_playback(&mut self) {
        let Some(target) = self.video_target.clone() else {
            self.state = PlaybackState::Idle;
            return;
        };

        match self.backend.load(&target) {
            Ok(()) => {
                log::info!(
                    "Playing {} ({} backend)",
                    target.display(),
                    self.backend.name()
                );
                self.video_fade = Fade::new(self.fade_duration);
                self.stats.reset();
                self.state = PlaybackState::Playing { target };
            }
            Err(e) => self.playback_failed(e),
        }
    }

    /// Give up on the current target until `set_video` is called again
    fn playback_failed(&mut self, error: VideoError) {
        log::warn!("Video unavailable, showing fallback image: {}", error);
        self.backend.stop();
        self.texture = None;
        self.geometry.set_native(None);
        self.failed_target = self.video_target.clone();
        self.state = PlaybackState::Idle;
    }

    /// Stop decoding and release the texture; the target is kept
    fn stop_video(&mut self) {
        if self.state.is_playing() {
            log::debug!("Stopping video playback");
            self.backend.stop();
        }
        self.texture = None;
        self.geometry.set_native(None);
        self.state = PlaybackState::Idle;
    }

    fn handle_looping(&mut self) {
        if !self.backend.is_at_end() {
            return;
        }

        match self.backend.restart() {
            Ok(()) => {
                self.stats.record_loop();
                log::trace!("Video looped ({} loops)", self.stats.loops());
            }
            Err(e) => log::warn!("Failed to restart video: {}", e),
        }
    }

    fn pull_frame(&mut self) {
        if let Some(texture) = self.backend.decode_next_frame() {
            if texture.take_new_frame() {
                self.stats.record_frame();
            }
            self.texture = Some(texture);
        }

        let native = self
            .texture
            .as_ref()
            .and_then(|t| t.dimensions())
            .map(Vec2::from);
        if native.is_none() && self.texture.as_ref().is_some_and(|t| !t.is_valid()) {
            log::debug!("Video texture invalidated, waiting for a new one");
            self.texture = None;
        }
        self.geometry.set_native(native);
    }

    fn video_draw(&self, transform: &Transform) -> Option<VideoDraw> {
        let texture = self.texture.as_ref()?;
        texture.dimensions()?;
        if !self.geometry.is_resolved() {
            return None;
        }

        Some(VideoDraw {
            texture: texture.clone(),
            rect: Rect::anchored(transform, self.geometry.size(), self.origin),
            opacity: scale_opacity(self.opacity, self.video_fade.progress()),
        })
    }

    fn render_fallback(&self, transform: &Transform, factor: f32) -> RenderCommand {
        match self.image.render(transform) {
            Some(mut draw) => {
                draw.opacity = scale_opacity(draw.opacity, factor * self.snapshot_fade.progress());
                RenderCommand::Fallback(draw)
            }
            None => RenderCommand::Nothing,
        }
    }
}

impl Drop for VideoComponent {
    fn drop(&mut self) {
        self.stop_video();
    }
}
