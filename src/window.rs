//! The collaborators a frame loop needs: a window and a frame timer.
//!
//! Neither is created by this crate. Any windowing library can implement
//! [`Window`]; [`FrameClock`] measures wall time and [`FixedTimestep`]
//! replays a fixed step for deterministic runs.

use std::time::{Duration, Instant};

/// The window a [`Renderer`](crate::render::Renderer) draws into.
pub trait Window {
    /// Current framebuffer size in pixels, `[width, height]`.
    fn size(&self) -> [u32; 2];

    /// Whether the user asked to close the window.
    fn should_close(&self) -> bool;

    /// Process pending input and window events.
    fn poll_events(&mut self);

    /// Present the frame just drawn.
    fn swap_buffers(&mut self);
}

/// Frame timing snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous tick.
    pub delta: f32,
    /// Seconds since the timer started: the sum of every `delta` so far.
    pub elapsed: f32,
    /// Zero-based frame counter.
    pub frame_index: u64,
}

/// Produces one [`FrameTime`] per frame.
pub trait FrameTimer {
    /// Advance to the next frame.
    fn tick(&mut self) -> FrameTime;
}

/// Wall-clock frame timer.
///
/// Each delta is clamped, so a stall (a debugger pause, a minimized
/// window) cannot make the animation jump, and a tight loop never reports
/// zero.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: Duration,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// A clock clamping deltas to `[0.1 ms, 250 ms]`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// A clock with custom delta clamps. The bounds are swapped if given
    /// in the wrong order.
    #[must_use]
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        let (dt_min, dt_max) = if dt_min <= dt_max {
            (dt_min, dt_max)
        } else {
            (dt_max, dt_min)
        };
        Self {
            last: Instant::now(),
            elapsed: Duration::ZERO,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restart the delta measurement from now. Elapsed time is kept.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer for FrameClock {
    fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let mut delta = now.saturating_duration_since(self.last);
        if delta < self.dt_min {
            delta = self.dt_min;
        } else if delta > self.dt_max {
            delta = self.dt_max;
        }
        self.last = now;
        self.elapsed += delta;

        let time = FrameTime {
            delta: delta.as_secs_f32(),
            elapsed: self.elapsed.as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

/// A timer that advances by the same step every tick.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    elapsed: f64,
    frame_index: u64,
}

impl FixedTimestep {
    /// Advance `step` seconds per tick.
    #[must_use]
    pub fn new(step: f32) -> Self {
        Self {
            step,
            elapsed: 0.0,
            frame_index: 0,
        }
    }

    /// A 60 Hz timestep.
    #[must_use]
    pub fn sixty_hz() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl FrameTimer for FixedTimestep {
    fn tick(&mut self) -> FrameTime {
        self.elapsed += f64::from(self.step);
        #[expect(clippy::cast_possible_truncation)]
        let elapsed = self.elapsed as f32;
        let time = FrameTime {
            delta: self.step,
            elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulates() {
        let mut timer = FixedTimestep::new(0.5);
        let first = timer.tick();
        let second = timer.tick();
        assert_eq!(
            first,
            FrameTime {
                delta: 0.5,
                elapsed: 0.5,
                frame_index: 0
            }
        );
        assert_eq!(second.elapsed, 1.0);
        assert_eq!(second.frame_index, 1);
    }

    #[test]
    fn frame_clock_clamps_long_stalls() {
        let mut clock = FrameClock::with_clamps(Duration::ZERO, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        let time = clock.tick();
        assert!(time.delta <= 0.001);
        assert_eq!(time.elapsed, time.delta);
    }

    #[test]
    fn reversed_clamps_are_reordered() {
        let mut clock =
            FrameClock::with_clamps(Duration::from_millis(10), Duration::from_millis(1));
        let time = clock.tick();
        assert!(time.delta >= 0.0009 && time.delta <= 0.0101);
    }

    #[test]
    fn frame_clock_never_reports_less_than_the_minimum() {
        let mut clock = FrameClock::new();
        let first = clock.tick();
        let second = clock.tick();
        assert!(first.delta >= 0.0001);
        assert!(second.delta >= 0.0001);
        assert!(second.elapsed >= first.elapsed + second.delta * 0.99);
        assert_eq!(second.frame_index, 1);
    }
}
