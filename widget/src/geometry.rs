use common::{GeometryRequest, Vec2, VideoError};

/// Compute the rendered size for a texture of `native` size.
///
/// A `ResizeTo` with both axes set does not depend on the texture, so it
/// resolves even before the native size is known. Everything else needs the
/// native size and reports `GeometryUnderdetermined` until it is available.
pub fn resolve(request: GeometryRequest, native: Option<Vec2>) -> Result<Vec2, VideoError> {
    if let GeometryRequest::ResizeTo(target) = request {
        if target.x > 0.0 && target.y > 0.0 {
            return Ok(target);
        }
    }

    let native = match native {
        Some(n) if n.x > 0.0 && n.y > 0.0 => n,
        _ => return Err(VideoError::GeometryUnderdetermined),
    };

    Ok(match request {
        GeometryRequest::None => native,
        GeometryRequest::ResizeTo(target) => resize_to(target, native),
        GeometryRequest::MaxSize(bounds) => fit_within(bounds, native),
    })
}

/// Resize, keeping the aspect ratio on a zero axis
fn resize_to(target: Vec2, native: Vec2) -> Vec2 {
    match (target.x > 0.0, target.y > 0.0) {
        (true, true) => target,
        (true, false) => Vec2::new(target.x, native.y * target.x / native.x),
        (false, true) => Vec2::new(native.x * target.y / native.y, target.y),
        (false, false) => native,
    }
}

/// Largest uniform scale that fits inside `bounds`; a zero bound is unconstrained
fn fit_within(bounds: Vec2, native: Vec2) -> Vec2 {
    let scale_x = if bounds.x > 0.0 {
        bounds.x / native.x
    } else {
        f32::INFINITY
    };
    let scale_y = if bounds.y > 0.0 {
        bounds.y / native.y
    } else {
        f32::INFINITY
    };

    let scale = scale_x.min(scale_y);
    if scale.is_infinite() {
        return native;
    }

    // Snap the constrained axis to the bound so float error never overshoots it
    if scale_x <= scale_y {
        Vec2::new(bounds.x, clamp_to_bound(native.y * scale, bounds.y))
    } else {
        Vec2::new(clamp_to_bound(native.x * scale, bounds.x), bounds.y)
    }
}

fn clamp_to_bound(value: f32, bound: f32) -> f32 {
    if bound > 0.0 { value.min(bound) } else { value }
}

/// Holds the size request and the last resolved size for one drawable.
///
/// Recomputation is lazy: it happens when the request or the native size
/// changes, and the last good size is kept while the native size is unknown.
#[derive(Debug, Clone, Default)]
pub struct GeometryResolver {
    request: GeometryRequest,
    native: Option<Vec2>,
    size: Vec2,
    resolved: bool,
}

impl GeometryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resize request, replacing any max-size request
    pub fn set_resize(&mut self, target: Vec2) {
        self.request = GeometryRequest::ResizeTo(target);
        self.recompute();
    }

    /// Store a max-size request, replacing any resize request
    pub fn set_max_size(&mut self, bounds: Vec2) {
        self.request = GeometryRequest::MaxSize(bounds);
        self.recompute();
    }

    pub fn clear_request(&mut self) {
        self.request = GeometryRequest::None;
        self.recompute();
    }

    /// Report the texture's native size. `None` means the texture is gone or
    /// not loaded yet. Returns true if the resolved size changed.
    pub fn set_native(&mut self, native: Option<Vec2>) -> bool {
        if self.native == native {
            return false;
        }
        self.native = native;
        let before = self.size;
        self.recompute();
        before != self.size
    }

    pub fn recompute(&mut self) {
        match resolve(self.request, self.native) {
            Ok(size) => {
                if size != self.size {
                    log::debug!(
                        "Geometry resolved to {:.1}x{:.1} ({:?})",
                        size.x,
                        size.y,
                        self.request
                    );
                }
                self.size = size;
                self.resolved = true;
            }
            Err(_) => {
                // Deferred until the native size is known
                self.resolved = false;
            }
        }
    }

    pub fn request(&self) -> GeometryRequest {
        self.request
    }

    pub fn native(&self) -> Option<Vec2> {
        self.native
    }

    /// Last resolved size (zero before anything could be resolved)
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Whether `size` reflects the current request and native size
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Top-left corner of the box anchored at `position` by `origin`
    pub fn top_left(&self, position: Vec2, origin: Vec2) -> Vec2 {
        position - self.size.scale_by(origin)
    }

    /// Center of the box anchored at `position` by `origin`
    pub fn center(&self, position: Vec2, origin: Vec2) -> Vec2 {
        self.top_left(position, origin) + self.size * 0.5
    }
}
