//! Video decode backends
//!
//! The widget drives playback through the [`VideoBackend`] trait and never
//! talks to a decoder directly. The concrete backend is picked once, when the
//! widget is constructed:
//!
//! - `gst`: GStreamer playback, software (`decodebin`) or VA-API hardware
//!   decode depending on [`BackendKind`]. Requires the `video` feature.
//! - [`NullBackend`]: used when video support is not compiled in. Every load
//!   fails, so the widget shows its fallback image.
//!
//! Backends are polled: the widget asks `take_error`, `is_at_end` and
//! `decode_next_frame` once per frame, and a backend that is still opening a
//! file simply reports no frame yet.

#[cfg(feature = "video")]
mod gst;

#[cfg(feature = "video")]
pub use gst::GstBackend;

use crate::texture::TextureHandle;
use common::{BackendKind, VideoError};
use std::path::Path;

/// Playback operations the widget needs from a decoder
pub trait VideoBackend {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Open `path` and start decoding from the beginning
    fn load(&mut self, path: &Path) -> Result<(), VideoError>;

    /// True once the stream reached its end (polled every frame)
    fn is_at_end(&mut self) -> bool;

    /// Seek back to offset zero of the loaded clip
    fn restart(&mut self) -> Result<(), VideoError>;

    /// Stop decoding and release the texture
    fn stop(&mut self);

    /// Hold or resume decoding without unloading the clip
    fn set_paused(&mut self, _paused: bool) {}

    /// Failure reported after `load` returned, e.g. a decoder that could not
    /// be initialised. Polled every frame while playing; taking it clears it.
    fn take_error(&mut self) -> Option<VideoError> {
        None
    }

    /// Advance decoding and return the texture holding the latest frame,
    /// or `None` while no frame has been produced
    fn decode_next_frame(&mut self) -> Option<TextureHandle>;

    /// Native pixel size once known
    fn dimensions(&self) -> Option<(u32, u32)>;
}

/// Create the backend for `kind`
pub fn create_backend(kind: BackendKind) -> Box<dyn VideoBackend> {
    #[cfg(feature = "video")]
    {
        log::info!("Using GStreamer {} video backend", kind.name());
        Box::new(GstBackend::new(kind))
    }

    #[cfg(not(feature = "video"))]
    {
        log::info!(
            "Video support not compiled (build with --features video); {} backend unavailable",
            kind.name()
        );
        Box::new(NullBackend::new(kind))
    }
}

/// Backend used when video support is not compiled in
#[derive(Debug)]
pub struct NullBackend {
    kind: BackendKind,
}

impl NullBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

impl VideoBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn load(&mut self, path: &Path) -> Result<(), VideoError> {
        Err(VideoError::BackendLoad {
            path: path.display().to_string(),
            reason: "video support not compiled in".to_string(),
        })
    }

    fn is_at_end(&mut self) -> bool {
        false
    }

    fn restart(&mut self) -> Result<(), VideoError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn decode_next_frame(&mut self) -> Option<TextureHandle> {
        None
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }
}
