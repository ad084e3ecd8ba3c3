use std::time::{Duration, Instant};

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Restarts the clock; called whenever a new pattern goes live.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp; used for still exports.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.time, 0)
    }
}

/// Paces redraws to an optional FPS cap.
#[derive(Debug, Clone)]
pub(crate) struct FrameScheduler {
    interval: Option<Duration>,
    next_frame: Instant,
}

impl FrameScheduler {
    pub fn new(target_fps: Option<f32>, now: Instant) -> Self {
        let interval = target_fps
            .filter(|fps| *fps > 0.0 && fps.is_finite())
            .and_then(|fps| Duration::try_from_secs_f64(1.0 / f64::from(fps)).ok());
        Self {
            interval,
            next_frame: now,
        }
    }

    /// Whether a frame may be drawn at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.interval.is_none() || now >= self.next_frame
    }

    /// Records a drawn frame. Falls back to `now` when the loop has lagged a whole interval.
    pub fn mark_presented(&mut self, now: Instant) {
        if let Some(interval) = self.interval {
            let scheduled = self.next_frame + interval;
            self.next_frame = if scheduled <= now { now + interval } else { scheduled };
        }
    }

    /// Deadline for the next frame, `None` when uncapped.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.interval.map(|_| self.next_frame)
    }
}

/// Fires periodic automatic resets.
#[derive(Debug, Clone)]
pub(crate) struct ResetTimer {
    interval: Option<Duration>,
    last_reset: Instant,
}

impl ResetTimer {
    pub fn new(interval: Option<Duration>, now: Instant) -> Self {
        Self {
            interval: interval.filter(|d| !d.is_zero()),
            last_reset: now,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.interval
            .is_some_and(|interval| now.saturating_duration_since(self.last_reset) >= interval)
    }

    /// Restarts the countdown; called for both manual and automatic resets.
    pub fn restart(&mut self, now: Instant) {
        self.last_reset = now;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.interval.map(|interval| self.last_reset + interval)
    }
}
