//! Frame counters for the render loop

use std::time::{Duration, Instant};

use super::program::FrameOutcome;

/// Counts rendered and skipped frames and keeps a frame rate averaged over
/// the last report window.
#[derive(Debug)]
pub struct FrameStats {
    rendered: u64,
    skipped: u64,
    /// Start of the current window; set by the first rendered frame.
    window_start: Option<Instant>,
    window_frames: u32,
    fps: f32,
    report_interval: Duration,
}

impl FrameStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rendered: 0,
            skipped: 0,
            window_start: None,
            window_frames: 0,
            fps: 0.0,
            report_interval: Duration::from_secs(5),
        }
    }

    /// Count one loop iteration that finished at `now`.
    ///
    /// The frame rate is refreshed, and logged at `debug`, each time a
    /// report window closes.
    pub fn record(&mut self, outcome: FrameOutcome, now: Instant) {
        match outcome {
            FrameOutcome::Rendered => self.rendered += 1,
            FrameOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
            FrameOutcome::Closing => return,
        }

        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.window_frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= self.report_interval {
            self.fps = self.window_frames as f32 / elapsed.as_secs_f32();
            self.window_start = Some(now);
            self.window_frames = 0;
            log::debug!("{}", self.summary());
        }
    }

    /// Frames drawn and presented.
    #[must_use]
    pub fn rendered_frames(&self) -> u64 {
        self.rendered
    }

    /// Iterations skipped because the framebuffer had no area.
    #[must_use]
    pub fn skipped_frames(&self) -> u64 {
        self.skipped
    }

    /// Frame rate over the last closed window; zero until one has closed.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "FPS: {:.1} | rendered: {} | skipped: {}",
            self.fps, self.rendered, self.skipped
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
