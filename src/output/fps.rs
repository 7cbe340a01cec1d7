//! Frame pacing by sleeping off the remainder of the frame budget.

use std::time::{Duration, Instant};

/// Sleep-based limiter toward a target frame rate. A target of zero (or
/// below) disables pacing entirely, leaving presentation to vsync.
#[derive(Debug)]
pub struct FpsPacer {
    target_fps: f64,
    frame_start: Instant,
    frames: u64,
}

impl FpsPacer {
    pub fn new(target_fps: f64) -> Self {
        Self {
            target_fps,
            frame_start: Instant::now(),
            frames: 0,
        }
    }

    pub fn set_target(&mut self, target_fps: f64) {
        self.target_fps = target_fps;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Sleeps away whatever is left of this frame's budget, then starts the
    /// next frame's measurement.
    pub fn sleep_to_target(&mut self) {
        if let Some(remaining) = self.remaining_budget(Instant::now()) {
            std::thread::sleep(remaining);
        }
        self.frames += 1;
        self.frame_start = Instant::now();
    }

    fn remaining_budget(&self, now: Instant) -> Option<Duration> {
        if self.target_fps <= 0.0 {
            return None;
        }
        let budget = Duration::from_secs_f64(1.0 / self.target_fps);
        budget.checked_sub(now.duration_since(self.frame_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_target_never_sleeps() {
        let pacer = FpsPacer::new(0.0);
        assert_eq!(pacer.remaining_budget(Instant::now()), None);
    }

    #[test]
    fn fast_frame_leaves_budget() {
        let pacer = FpsPacer::new(50.0);
        let remaining = pacer
            .remaining_budget(pacer.frame_start + Duration::from_millis(5))
            .expect("budget left");
        assert!(remaining > Duration::from_millis(10));
        assert!(remaining <= Duration::from_millis(15));
    }

    #[test]
    fn slow_frame_has_no_budget_left() {
        let pacer = FpsPacer::new(50.0);
        assert_eq!(
            pacer.remaining_budget(pacer.frame_start + Duration::from_millis(30)),
            None
        );
    }

    #[test]
    fn frame_counter_advances() {
        let mut pacer = FpsPacer::new(0.0);
        pacer.sleep_to_target();
        pacer.sleep_to_target();
        assert_eq!(pacer.frames(), 2);
    }
}
