/// Integration tests for the playback state machine
/// These drive a VideoComponent through a scripted backend and check the
/// state, targets and render output after each host call
use common::{GeometryRequest, PlaybackPhase, Vec2, VideoError, VideoSettings};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;
use widget::{
    FallbackImage, FrameData, ImageDraw, PathResolver, Rect, RenderCommand, TextureHandle,
    TextureSlot, Transform, VideoBackend, VideoComponent,
};

#[derive(Default)]
struct Script {
    loads: Vec<PathBuf>,
    stops: usize,
    restarts: usize,
    paused: Option<bool>,
    fail_loads: bool,
    at_end: bool,
    frame_size: Option<(u32, u32)>,
    slot: Option<TextureSlot>,
    /// Failure surfaced after a successful load
    error: Option<VideoError>,
}

struct ScriptedBackend(Rc<RefCell<Script>>);

fn frame(width: u32, height: u32) -> FrameData {
    FrameData {
        width,
        height,
        pixels: vec![0u8; (width * height * 4) as usize],
    }
}

impl VideoBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load(&mut self, path: &Path) -> Result<(), VideoError> {
        let mut script = self.0.borrow_mut();
        script.loads.push(path.to_path_buf());
        if script.fail_loads {
            return Err(VideoError::BackendLoad {
                path: path.display().to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        let slot = TextureSlot::new();
        if let Some((w, h)) = script.frame_size {
            slot.publish(frame(w, h));
        }
        script.slot = Some(slot);
        Ok(())
    }

    fn is_at_end(&mut self) -> bool {
        self.0.borrow().at_end
    }

    fn restart(&mut self) -> Result<(), VideoError> {
        let mut script = self.0.borrow_mut();
        script.restarts += 1;
        script.at_end = false;
        Ok(())
    }

    fn stop(&mut self) {
        let mut script = self.0.borrow_mut();
        script.stops += 1;
        script.slot = None;
    }

    fn set_paused(&mut self, paused: bool) {
        self.0.borrow_mut().paused = Some(paused);
    }

    fn take_error(&mut self) -> Option<VideoError> {
        self.0.borrow_mut().error.take()
    }

    fn decode_next_frame(&mut self) -> Option<TextureHandle> {
        self.0.borrow().slot.as_ref()?.current()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.0.borrow().slot.as_ref()?.dimensions()
    }
}

/// Fallback image with a fixed size that accepts any path
struct FixedImage {
    path: Option<PathBuf>,
    size: Vec2,
    origin: Vec2,
    opacity: u8,
}

impl FixedImage {
    fn new(size: Vec2) -> Self {
        Self {
            path: None,
            size,
            origin: Vec2::ZERO,
            opacity: 255,
        }
    }
}

impl FallbackImage for FixedImage {
    fn set_image(&mut self, path: &Path) -> Result<(), VideoError> {
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn clear(&mut self) {
        self.path = None;
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn set_resize(&mut self, _target: Vec2) {}

    fn set_max_size(&mut self, _bounds: Vec2) {}

    fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn render(&self, transform: &Transform) -> Option<ImageDraw> {
        Some(ImageDraw {
            path: self.path.clone()?,
            rect: Rect::anchored(transform, self.size, self.origin),
            opacity: self.opacity,
        })
    }
}

/// Media root holding placeholder clips; relative targets resolve into it
fn media_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in ["a.mp4", "b.mp4", "broken.mp4", "corrupt.mp4", "intro.mp4"] {
        std::fs::write(dir.path().join(name), b"placeholder").unwrap();
    }
    dir
}

fn clip(media: &TempDir, name: &str) -> PathBuf {
    media.path().join(name)
}

fn setup(settings: VideoSettings) -> (VideoComponent, Rc<RefCell<Script>>, TempDir) {
    let media = media_root();
    let script = Rc::new(RefCell::new(Script {
        frame_size: Some((320, 180)),
        ..Script::default()
    }));
    let mut video = VideoComponent::new(Box::new(ScriptedBackend(Rc::clone(&script))))
        .with_fallback(Box::new(FixedImage::new(Vec2::new(100.0, 100.0))))
        .with_path_resolver(PathResolver::new(Some(media.path().to_path_buf())))
        .with_settings(settings);
    video.set_image("/snapshots/a.png");
    (video, script, media)
}

/// Texture the scripted decoder currently publishes into
fn current_texture(script: &Rc<RefCell<Script>>) -> TextureHandle {
    script.borrow().slot.as_ref().unwrap().current().unwrap()
}

fn delayed(ms: u64) -> VideoSettings {
    VideoSettings {
        start_delay: Duration::from_millis(ms),
        show_snapshot_no_video: true,
        show_snapshot_delay: true,
        ..VideoSettings::default()
    }
}

fn render(video: &VideoComponent) -> RenderCommand {
    video.render(&Transform::IDENTITY)
}

#[test]
fn test_set_video_is_idempotent_while_playing() {
    let (mut video, script, media) = setup(VideoSettings::default());

    assert!(video.set_video("a.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert_eq!(video.playing_target(), Some(clip(&media, "a.mp4").as_path()));

    assert!(video.set_video("a.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert_eq!(video.playing_target(), Some(clip(&media, "a.mp4").as_path()));
    assert_eq!(script.borrow().loads.len(), 1);
    assert_eq!(script.borrow().stops, 0);
}

#[test]
fn test_set_video_is_idempotent_while_pending() {
    let (mut video, _script, _media) = setup(delayed(2000));

    video.set_video("a.mp4");
    video.update(Duration::from_millis(1500));
    video.set_video("a.mp4");

    // Countdown was not restarted
    video.update(Duration::from_millis(500));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_start_delay_boundary() {
    let (mut video, script, media) = setup(delayed(2000));

    assert!(video.set_video("a.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::StartPending);
    assert!(video.playing_target().is_none());

    video.update(Duration::from_millis(1999));
    assert_eq!(video.phase(), PlaybackPhase::StartPending);
    assert!(script.borrow().loads.is_empty());

    video.update(Duration::from_millis(2));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert_eq!(video.playing_target(), Some(clip(&media, "a.mp4").as_path()));
    assert_eq!(script.borrow().loads, vec![clip(&media, "a.mp4")]);
}

#[test]
fn test_changing_target_restarts_delay() {
    let (mut video, script, media) = setup(delayed(1000));

    video.set_video("a.mp4");
    video.update(Duration::from_millis(1000));
    assert_eq!(video.phase(), PlaybackPhase::Playing);

    video.set_video("b.mp4");
    assert_eq!(video.phase(), PlaybackPhase::StartPending);
    assert!(video.playing_target().is_none());
    assert_eq!(script.borrow().stops, 1);

    video.update(Duration::from_millis(1000));
    assert_eq!(video.playing_target(), Some(clip(&media, "b.mp4").as_path()));
}

#[test]
fn test_hide_stops_playback_and_renders_nothing() {
    let (mut video, script, media) = setup(VideoSettings {
        show_snapshot_no_video: true,
        ..VideoSettings::default()
    });

    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));
    assert!(render(&video).is_video());

    let texture = current_texture(&script);
    video.on_hide();

    assert_eq!(video.phase(), PlaybackPhase::Idle);
    assert!(video.playing_target().is_none());
    assert_eq!(video.video_target(), Some(clip(&media, "a.mp4").as_path()));
    assert!(render(&video).is_nothing());
    assert_eq!(script.borrow().stops, 1);

    // Backend and widget released their clones
    assert_eq!(texture.holders(), 1);
}

#[test]
fn test_show_rearms_countdown() {
    let (mut video, _script, _media) = setup(delayed(1000));

    video.set_video("a.mp4");
    video.update(Duration::from_millis(1000));
    video.on_hide();
    video.update(Duration::from_secs(5));
    assert_eq!(video.phase(), PlaybackPhase::Idle);

    video.on_show();
    assert_eq!(
        video.state(),
        &widget::PlaybackState::StartPending {
            elapsed: Duration::ZERO
        }
    );
    video.update(Duration::from_millis(1000));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_natural_end_loops() {
    let (mut video, script, media) = setup(VideoSettings::default());

    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));

    script.borrow_mut().at_end = true;
    video.update(Duration::from_millis(16));

    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert_eq!(video.playing_target(), Some(clip(&media, "a.mp4").as_path()));
    assert_eq!(script.borrow().restarts, 1);
    assert_eq!(script.borrow().loads.len(), 1);
    assert_eq!(video.status().loops, 1);
}

#[test]
fn test_loop_does_not_reapply_delay() {
    let (mut video, script, _media) = setup(delayed(500));

    video.set_video("a.mp4");
    video.update(Duration::from_millis(500));
    assert_eq!(video.phase(), PlaybackPhase::Playing);

    script.borrow_mut().at_end = true;
    video.update(Duration::from_millis(16));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_max_size_after_resize() {
    let (mut video, _script, _media) = setup(VideoSettings::default());

    video.set_resize(200.0, 200.0);
    video.set_max_size(160.0, 160.0);
    assert_eq!(
        video.geometry().request(),
        GeometryRequest::MaxSize(Vec2::new(160.0, 160.0))
    );

    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));

    // 320x180 fitted into 160x160
    let size = video.size();
    assert!(size.x <= 160.0 && size.y <= 160.0);
    assert!((size.x / size.y - 320.0 / 180.0).abs() < 1e-4);
    assert_eq!(size, Vec2::new(160.0, 90.0));
}

#[test]
fn test_resize_deferred_until_frame_known() {
    let (mut video, _script, _media) = setup(VideoSettings::default());

    video.set_resize(640.0, 0.0);
    assert!(!video.geometry().is_resolved());

    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));
    assert_eq!(video.size(), Vec2::new(640.0, 360.0));
}

#[test]
fn test_video_render_rect_and_fade() {
    let (mut video, _script, _media) = setup(VideoSettings::default());

    video.set_resize(640.0, 0.0);
    video.set_position(100.0, 100.0);
    video.set_origin(0.5, 0.5);
    video.set_video("a.mp4");
    video.update(Duration::from_millis(100));

    let RenderCommand::Video(draw) = render(&video) else {
        panic!("expected video");
    };
    assert_eq!(draw.rect.top_left, Vec2::new(-220.0, -80.0));
    assert_eq!(draw.rect.size, Vec2::new(640.0, 360.0));
    assert!(draw.opacity < 255);

    video.update(Duration::from_secs(1));
    let RenderCommand::Video(draw) = render(&video) else {
        panic!("expected video");
    };
    assert_eq!(draw.opacity, 255);
    assert_eq!(video.get_center(), Vec2::new(100.0, 100.0));
}

#[test]
fn test_fade_in_is_monotonic() {
    let (mut video, _script, _media) = setup(VideoSettings::default());
    video.set_video("a.mp4");

    let mut last = 0.0;
    for _ in 0..20 {
        video.update(Duration::from_millis(16));
        let fade = video.fade_in();
        assert!(fade >= last);
        assert!(fade <= 1.0);
        last = fade;
    }
    assert_eq!(last, 1.0);
}

#[test]
fn test_top_window_pauses_and_resumes_countdown() {
    let (mut video, _script, _media) = setup(delayed(2000));

    video.set_video("a.mp4");
    video.update(Duration::from_millis(1500));

    video.top_window(false);
    assert!(render(&video).is_nothing());
    video.update(Duration::from_secs(10));
    assert_eq!(
        video.state(),
        &widget::PlaybackState::StartPending {
            elapsed: Duration::from_millis(1500)
        }
    );

    video.top_window(true);
    video.update(Duration::from_millis(499));
    assert_eq!(video.phase(), PlaybackPhase::StartPending);
    video.update(Duration::from_millis(1));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_top_window_pauses_playing_backend() {
    let (mut video, script, media) = setup(VideoSettings::default());

    video.set_video("a.mp4");
    video.top_window(false);
    assert_eq!(script.borrow().paused, Some(true));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert_eq!(video.video_target(), Some(clip(&media, "a.mp4").as_path()));

    video.top_window(true);
    assert_eq!(script.borrow().paused, Some(false));
    assert_eq!(script.borrow().loads.len(), 1);
}

#[test]
fn test_load_failure_shows_fallback() {
    let (mut video, script, _media) = setup(VideoSettings::default());
    script.borrow_mut().fail_loads = true;

    assert!(video.set_video("broken.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Idle);
    assert!(video.playing_target().is_none());
    assert!(render(&video).is_fallback());

    // No automatic retry
    video.update(Duration::from_secs(1));
    video.on_hide();
    video.on_show();
    assert_eq!(script.borrow().loads.len(), 1);

    // An explicit set_video retries
    script.borrow_mut().fail_loads = false;
    assert!(video.set_video("broken.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert_eq!(script.borrow().loads.len(), 2);
}

#[test]
fn test_screensaver_mode_skips_delay() {
    let (mut video, _script, _media) = setup(delayed(2000));

    video.set_screensaver_mode(true);
    video.set_video("a.mp4");
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_screensaver_activation() {
    let (mut video, script, _media) = setup(VideoSettings {
        show_snapshot_screensaver: true,
        ..VideoSettings::default()
    });

    video.set_video("a.mp4");
    video.on_screensaver_activate();
    assert_eq!(video.phase(), PlaybackPhase::Idle);
    assert_eq!(script.borrow().stops, 1);
    assert!(render(&video).is_fallback());

    video.update(Duration::from_secs(1));
    assert_eq!(video.phase(), PlaybackPhase::Idle);

    video.on_screensaver_deactivate();
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_screensaver_without_snapshot_renders_nothing() {
    let (mut video, _script, _media) = setup(VideoSettings::default());

    video.set_video("a.mp4");
    video.on_screensaver_activate();
    assert!(render(&video).is_nothing());
}

#[test]
fn test_fallback_during_delay() {
    let (mut video, _script, _media) = setup(delayed(1000));
    video.set_video("a.mp4");
    assert!(render(&video).is_fallback());

    let (mut video, _script, _media) = setup(VideoSettings {
        start_delay: Duration::from_secs(1),
        ..VideoSettings::default()
    });
    video.set_video("a.mp4");
    assert!(render(&video).is_nothing());
}

#[test]
fn test_fallback_without_video() {
    let (video, _script, _media) = setup(VideoSettings {
        show_snapshot_no_video: true,
        ..VideoSettings::default()
    });
    assert!(render(&video).is_fallback());

    let (video, _script, _media) = setup(VideoSettings::default());
    assert!(render(&video).is_nothing());
}

#[test]
fn test_fallback_before_first_frame() {
    let (mut video, script, _media) = setup(VideoSettings::default());
    script.borrow_mut().frame_size = None;

    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert!(render(&video).is_fallback());

    script.borrow().slot.as_ref().unwrap().publish(frame(64, 64));
    video.update(Duration::from_millis(16));
    assert!(render(&video).is_video());
}

#[test]
fn test_invalidated_texture_recovers_on_next_frame() {
    let (mut video, script, _media) = setup(VideoSettings::default());

    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));
    assert!(render(&video).is_video());

    let stale = current_texture(&script);
    stale.invalidate();
    assert!(render(&video).is_fallback());

    video.update(Duration::from_millis(16));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert!(render(&video).is_fallback());

    // Decoder keeps publishing into the renewed texture
    script.borrow().slot.as_ref().unwrap().publish(frame(320, 180));
    video.update(Duration::from_millis(16));
    let RenderCommand::Video(draw) = render(&video) else {
        panic!("expected video");
    };
    assert!(!draw.texture.same_texture(&stale));
    assert_eq!(video.size(), Vec2::new(320.0, 180.0));
}

#[test]
fn test_missing_file_rejected_and_shows_fallback() {
    let (mut video, script, media) = setup(VideoSettings::default());

    assert!(!video.set_video("missing.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Idle);
    assert_eq!(video.video_target(), Some(clip(&media, "missing.mp4").as_path()));
    assert!(script.borrow().loads.is_empty());
    assert!(render(&video).is_fallback());

    video.on_hide();
    video.on_show();
    assert!(script.borrow().loads.is_empty());

    std::fs::write(clip(&media, "missing.mp4"), b"placeholder").unwrap();
    assert!(video.set_video("missing.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_decode_failure_after_load_returns_to_idle() {
    let (mut video, script, media) = setup(VideoSettings::default());
    script.borrow_mut().frame_size = None;

    assert!(video.set_video("corrupt.mp4"));
    video.update(Duration::from_millis(16));
    assert_eq!(video.phase(), PlaybackPhase::Playing);

    script.borrow_mut().error = Some(VideoError::BackendLoad {
        path: clip(&media, "corrupt.mp4").display().to_string(),
        reason: "no suitable decoder".to_string(),
    });
    video.update(Duration::from_millis(16));

    assert_eq!(video.phase(), PlaybackPhase::Idle);
    assert!(video.playing_target().is_none());
    assert_eq!(video.video_target(), Some(clip(&media, "corrupt.mp4").as_path()));
    assert_eq!(script.borrow().stops, 1);
    assert!(render(&video).is_fallback());

    // Not retried until the host selects the clip again
    video.update(Duration::from_secs(1));
    video.on_hide();
    video.on_show();
    assert_eq!(script.borrow().loads.len(), 1);

    assert!(video.set_video("corrupt.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Playing);
    assert_eq!(script.borrow().loads.len(), 2);
}

#[test]
fn test_size_change_refits_video() {
    let (mut video, _script, _media) = setup(VideoSettings::default());

    video.set_max_size(160.0, 160.0);
    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));
    assert_eq!(video.size(), Vec2::new(160.0, 90.0));

    video.on_size_changed(640.0, 640.0);
    assert_eq!(video.size(), Vec2::new(640.0, 360.0));
    assert_eq!(
        video.geometry().request(),
        GeometryRequest::MaxSize(Vec2::new(640.0, 640.0))
    );
}

#[test]
fn test_empty_target_rejected() {
    let (mut video, script, _media) = setup(VideoSettings::default());

    video.set_video("a.mp4");
    assert!(!video.set_video(""));
    assert_eq!(video.phase(), PlaybackPhase::Idle);
    assert!(video.video_target().is_none());
    assert_eq!(script.borrow().stops, 1);
}

#[test]
fn test_default_video() {
    let (mut video, _script, media) = setup(VideoSettings {
        default_video_path: "intro.mp4".to_string(),
        ..VideoSettings::default()
    });

    assert!(video.set_default_video());
    assert_eq!(video.playing_target(), Some(clip(&media, "intro.mp4").as_path()));

    let (mut video, _script, media) = setup(VideoSettings::default());
    assert!(!video.set_default_video());
}

#[test]
fn test_set_video_while_hidden_waits_for_show() {
    let (mut video, script, _media) = setup(VideoSettings::default());

    video.on_hide();
    assert!(video.set_video("a.mp4"));
    assert_eq!(video.phase(), PlaybackPhase::Idle);
    assert!(script.borrow().loads.is_empty());

    video.on_show();
    assert_eq!(video.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_opacity_applies_to_both_layers() {
    let (mut video, _script, _media) = setup(VideoSettings {
        show_snapshot_no_video: true,
        ..VideoSettings::default()
    });
    video.update(Duration::from_secs(1));
    video.set_opacity(128);

    let RenderCommand::Fallback(draw) = render(&video) else {
        panic!("expected fallback");
    };
    assert_eq!(draw.opacity, 128);

    video.set_video("a.mp4");
    video.update(Duration::from_secs(1));
    let RenderCommand::Video(draw) = render(&video) else {
        panic!("expected video");
    };
    assert_eq!(draw.opacity, 128);
}

#[test]
fn test_drop_releases_texture() {
    let (mut video, script, _media) = setup(VideoSettings::default());
    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));

    let texture = current_texture(&script);
    assert!(texture.holders() >= 3);

    drop(video);
    assert_eq!(script.borrow().stops, 1);
    assert_eq!(texture.holders(), 1);
}

#[test]
fn test_status_snapshot() {
    let (mut video, _script, media) = setup(VideoSettings::default());
    video.set_video("a.mp4");
    video.update(Duration::from_millis(16));

    let status = video.status();
    assert_eq!(status.phase, PlaybackPhase::Playing);
    let expected = clip(&media, "a.mp4").display().to_string();
    assert_eq!(status.video_target.as_deref(), Some(expected.as_str()));
    assert_eq!(status.playing_target.as_deref(), Some(expected.as_str()));
    assert_eq!(status.size, Vec2::new(320.0, 180.0));
}
