//! Shared decoded-frame texture
//!
//! A [`TextureHandle`] is a cheap clone of an `Arc`. The backend publishes
//! frames into it (possibly from a decoder thread), a texture cache may hold
//! its own clone, and the widget drops its clone on stop/hide. The cache can
//! invalidate the texture at any time; an invalid texture reads as "not yet
//! available" rather than an error, and the backend's [`TextureSlot`] hands
//! out a fresh one on the next frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One decoded frame (BGRA, tightly packed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
struct TextureResource {
    /// Latest frame published by the decoder
    frame: Mutex<Option<FrameData>>,

    /// Set when a frame is published, cleared when the renderer consumes it
    new_frame_available: AtomicBool,

    /// Cleared by the owning cache when the memory is reclaimed
    valid: AtomicBool,
}

/// Reference-counted handle to decoded-frame texture memory
#[derive(Debug, Clone)]
pub struct TextureHandle {
    inner: Arc<TextureResource>,
}

impl TextureHandle {
    /// Create an empty, valid texture
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TextureResource {
                frame: Mutex::new(None),
                new_frame_available: AtomicBool::new(false),
                valid: AtomicBool::new(true),
            }),
        }
    }

    /// Store a new frame and flag it as available.
    ///
    /// Returns true if the previous frame was never consumed (dropped).
    pub fn publish(&self, frame: FrameData) -> bool {
        let mut dropped = false;
        if let Ok(mut slot) = self.inner.frame.lock() {
            dropped = self.inner.new_frame_available.load(Ordering::Relaxed);
            *slot = Some(frame);
            self.inner.new_frame_available.store(true, Ordering::Release);
        }
        dropped
    }

    /// Check and clear the new-frame flag
    pub fn take_new_frame(&self) -> bool {
        self.inner.new_frame_available.swap(false, Ordering::Acquire)
    }

    /// Native size of the current frame, `None` if invalid or empty
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if !self.is_valid() {
            return None;
        }
        let slot = self.inner.frame.lock().ok()?;
        slot.as_ref()
            .filter(|f| f.width > 0 && f.height > 0)
            .map(|f| (f.width, f.height))
    }

    /// Copy of the current frame, `None` if invalid or empty
    pub fn frame(&self) -> Option<FrameData> {
        if !self.is_valid() {
            return None;
        }
        self.inner.frame.lock().ok()?.clone()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// Called by the owning cache when it reclaims the memory
    pub fn invalidate(&self) {
        self.inner.valid.store(false, Ordering::Release);
        if let Ok(mut slot) = self.inner.frame.lock() {
            *slot = None;
        }
    }

    /// Whether two handles refer to the same texture
    pub fn same_texture(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles (widget, cache, backend)
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Texture a decoder publishes into, shared with the decoder thread.
///
/// Once the cache invalidates the current texture, the next `current` call
/// swaps in a fresh one so later frames show up again.
#[derive(Debug, Clone, Default)]
pub struct TextureSlot {
    current: Arc<Mutex<TextureHandle>>,
}

impl TextureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish into the current texture; true if a frame was dropped
    pub fn publish(&self, frame: FrameData) -> bool {
        match self.current.lock() {
            Ok(texture) => texture.publish(frame),
            Err(_) => false,
        }
    }

    /// Texture holding the latest frame, renewed if it was invalidated
    pub fn current(&self) -> Option<TextureHandle> {
        let mut texture = self.current.lock().ok()?;
        if !texture.is_valid() {
            log::debug!("Texture invalidated, allocating a new one");
            *texture = TextureHandle::new();
        }
        Some(texture.clone())
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.current.lock().ok()?.dimensions()
    }
}
