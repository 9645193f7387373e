use std::time::Duration;

/// Default fade length for video and fallback image
pub const FADE_TIME: Duration = Duration::from_millis(200);

/// Opacity ramp from 0.0 to 1.0, driven by frame deltas.
///
/// Progress only moves forward until `reset` is called.
#[derive(Debug, Clone)]
pub struct Fade {
    duration: Duration,
    elapsed: Duration,
}

impl Fade {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// A fade that is already at full opacity
    pub fn completed(duration: Duration) -> Self {
        Self {
            elapsed: duration,
            ..Self::new(duration)
        }
    }

    /// Restart from zero opacity
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn advance(&mut self, delta: Duration) {
        self.elapsed = (self.elapsed + delta).min(self.duration);
    }

    /// Current opacity multiplier, linear in elapsed time
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() || self.elapsed >= self.duration {
            1.0
        } else {
            self.elapsed.as_secs_f32() / self.duration.as_secs_f32()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::new(FADE_TIME)
    }
}

/// Opacity factor for the fallback image while a start delay runs out.
///
/// Full opacity until the last `fade` of the delay, then linear down to zero
/// as playback is about to begin.
pub fn delay_fade_out(remaining: Duration, fade: Duration) -> f32 {
    if fade.is_zero() || remaining >= fade {
        1.0
    } else {
        remaining.as_secs_f32() / fade.as_secs_f32()
    }
}
