//! GStreamer playback backend
//!
//! Decoding runs on GStreamer's streaming thread. Frames are delivered to an
//! `AppSink` callback which publishes them into a shared [`TextureSlot`];
//! the widget only polls the slot and the pipeline bus. Errors posted on the
//! bus after `load` returned tear the pipeline down and are handed to the
//! widget through `take_error`.

use super::VideoBackend;
use crate::texture::{FrameData, TextureHandle, TextureSlot};
use common::{BackendKind, VideoError};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Initialize GStreamer once; later calls return the first outcome
fn initialize_gstreamer() -> Result<(), VideoError> {
    static GSTREAMER_INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

    GSTREAMER_INITIALIZED
        .get_or_init(|| {
            gst::init().map_err(|e| e.to_string())?;
            log::info!("GStreamer initialized");
            Ok(())
        })
        .clone()
        .map_err(|e| VideoError::Unsupported(format!("GStreamer initialization failed: {}", e)))
}

fn load_error(path: &Path, reason: impl Display) -> VideoError {
    VideoError::BackendLoad {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Quote a path for use inside a `gst-launch` style description
fn escape_location(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

/// Pipeline description for the requested decoder flavour
///
/// - Software: `decodebin` picks any available decoder, `videoconvert` to BGRA
/// - Hardware: VA-API `vah264dec` + `vapostproc` colour conversion (H.264 in MP4)
fn pipeline_description(kind: BackendKind, path: &Path) -> String {
    let location = escape_location(path);
    match kind {
        BackendKind::Software => format!(
            "filesrc location=\"{}\" ! decodebin ! videoconvert ! video/x-raw,format=BGRA ! appsink name=sink",
            location
        ),
        BackendKind::Hardware => format!(
            "filesrc location=\"{}\" ! qtdemux ! h264parse ! vah264dec ! vapostproc ! video/x-raw,format=BGRA ! appsink name=sink",
            location
        ),
    }
}

/// Configure AppSink for low-latency delivery
///
/// - `sync=true`: frames paced by their timestamps
/// - `max-buffers=1` and `drop=true`: only the newest frame is kept
fn configure_app_sink(app_sink: &gst_app::AppSink) {
    app_sink.set_property("emit-signals", true);
    app_sink.set_property("sync", true);
    app_sink.set_property("max-buffers", 1u32);
    app_sink.set_property("drop", true);
}

/// Publish every decoded sample into `slot`
fn setup_frame_callback(
    app_sink: &gst_app::AppSink,
    slot: TextureSlot,
    frames_dropped: Arc<AtomicU64>,
) {
    app_sink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                let caps = sample.caps().ok_or(gst::FlowError::Error)?;
                let info =
                    gst_video::VideoInfo::from_caps(caps).map_err(|_| gst::FlowError::Error)?;

                let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;

                let dropped = slot.publish(FrameData {
                    width: info.width(),
                    height: info.height(),
                    pixels: map.as_slice().to_vec(),
                });
                if dropped {
                    frames_dropped.fetch_add(1, Ordering::Relaxed);
                    log::trace!("Video frame dropped (previous frame not consumed in time)");
                }

                Ok(gst::FlowSuccess::Ok)
            })
            .build(),
    );
}

/// GStreamer-backed [`VideoBackend`]
pub struct GstBackend {
    kind: BackendKind,
    pipeline: Option<gst::Pipeline>,
    slot: Option<TextureSlot>,
    path: Option<PathBuf>,
    at_end: bool,
    error: Option<VideoError>,
    frames_dropped: Arc<AtomicU64>,
}

impl GstBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            pipeline: None,
            slot: None,
            path: None,
            at_end: false,
            error: None,
            frames_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Drain the pipeline bus. An error message ends playback and is kept
    /// for `take_error`.
    fn poll_bus(&mut self) {
        let Some(bus) = self.pipeline.as_ref().and_then(|p| p.bus()) else {
            return;
        };

        let mut failure = None;
        while let Some(msg) = bus.pop() {
            match msg.view() {
                gst::MessageView::Eos(_) => {
                    log::debug!("Video reached EOS");
                    self.at_end = true;
                }
                gst::MessageView::Error(err) => {
                    log::error!(
                        "GStreamer error: {} (debug: {:?})",
                        err.error(),
                        err.debug()
                    );
                    failure.get_or_insert_with(|| err.error().to_string());
                }
                gst::MessageView::Warning(warn) => {
                    log::warn!("GStreamer warning: {}", warn.error());
                }
                _ => {}
            }
        }

        if let Some(reason) = failure {
            let path = self.path.clone().unwrap_or_default();
            self.stop();
            self.error = Some(load_error(&path, reason));
        }
    }
}

impl VideoBackend for GstBackend {
    fn name(&self) -> &'static str {
        match self.kind {
            BackendKind::Software => "gstreamer-software",
            BackendKind::Hardware => "gstreamer-vaapi",
        }
    }

    fn load(&mut self, path: &Path) -> Result<(), VideoError> {
        self.stop();
        self.error = None;

        if !path.is_file() {
            return Err(VideoError::InvalidTarget(format!(
                "{} (file not found)",
                path.display()
            )));
        }

        initialize_gstreamer()?;

        log::info!("Loading video: {}", path.display());
        let description = pipeline_description(self.kind, path);
        log::debug!("GStreamer pipeline: {}", description);

        let pipeline = gst::parse::launch(&description)
            .map_err(|e| load_error(path, e))?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| load_error(path, "pipeline is not a gst::Pipeline"))?;

        let app_sink = pipeline
            .by_name("sink")
            .ok_or_else(|| load_error(path, "failed to get appsink from pipeline"))?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| load_error(path, "sink is not an AppSink"))?;

        configure_app_sink(&app_sink);

        let slot = TextureSlot::new();
        setup_frame_callback(&app_sink, slot.clone(), Arc::clone(&self.frames_dropped));

        if let Err(e) = pipeline.set_state(gst::State::Playing) {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(load_error(path, e));
        }

        self.pipeline = Some(pipeline);
        self.slot = Some(slot);
        self.path = Some(path.to_path_buf());
        self.at_end = false;
        Ok(())
    }

    fn is_at_end(&mut self) -> bool {
        self.poll_bus();
        self.at_end
    }

    fn take_error(&mut self) -> Option<VideoError> {
        self.poll_bus();
        self.error.take()
    }

    fn restart(&mut self) -> Result<(), VideoError> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(());
        };

        pipeline
            .seek_simple(
                gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
                gst::ClockTime::ZERO,
            )
            .map_err(|e| {
                let path = self.path.as_deref().unwrap_or_else(|| Path::new(""));
                load_error(path, format!("seek to start failed: {}", e))
            })?;

        self.at_end = false;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            log::debug!("Stopping video pipeline");
            let _ = pipeline.set_state(gst::State::Null);

            let dropped = self.frames_dropped.swap(0, Ordering::Relaxed);
            if dropped > 0 {
                log::debug!("{} frames dropped during playback", dropped);
            }
        }
        self.slot = None;
        self.path = None;
        self.at_end = false;
    }

    fn set_paused(&mut self, paused: bool) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        let state = if paused {
            gst::State::Paused
        } else {
            gst::State::Playing
        };
        if let Err(e) = pipeline.set_state(state) {
            log::warn!("Failed to set pipeline state to {:?}: {}", state, e);
        }
    }

    fn decode_next_frame(&mut self) -> Option<TextureHandle> {
        let texture = self.slot.as_ref()?.current()?;
        texture.dimensions()?;
        Some(texture)
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.slot.as_ref()?.dimensions()
    }
}

impl Drop for GstBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_description_software() {
        let desc = pipeline_description(BackendKind::Software, Path::new("/videos/clip.mp4"));
        assert!(desc.starts_with("filesrc location=\"/videos/clip.mp4\""));
        assert!(desc.contains("decodebin"));
        assert!(desc.contains("appsink name=sink"));
    }

    #[test]
    fn test_pipeline_description_hardware() {
        let desc = pipeline_description(BackendKind::Hardware, Path::new("/videos/clip.mp4"));
        assert!(desc.contains("vah264dec"));
        assert!(desc.contains("vapostproc"));
        assert!(desc.contains("format=BGRA"));
    }

    #[test]
    fn test_escape_location() {
        assert_eq!(
            escape_location(Path::new("/tmp/say \"hi\".mp4")),
            "/tmp/say \\\"hi\\\".mp4"
        );
    }

    #[test]
    fn test_load_missing_file_fails() {
        let mut backend = GstBackend::new(BackendKind::Software);
        let err = backend
            .load(Path::new("/nonexistent/definitely/missing.mp4"))
            .unwrap_err();
        assert!(matches!(err, VideoError::InvalidTarget(_)));
        assert!(backend.decode_next_frame().is_none());
        assert!(backend.take_error().is_none());
        assert_eq!(backend.name(), "gstreamer-software");
    }
}
