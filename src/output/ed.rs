//! Timing state machine for the eDimensional shutter-glasses control code.
//!
//! The glasses read a binary on/off pattern from a thin strip of the display.
//! A transition restarts the code timer; the pattern must stay on screen for
//! the whole code window or the hardware reads a torn code. Only after the
//! code finished may the stereo flag flip again, and only on a frame
//! boundary.

use std::time::{Duration, Instant};

/// How long one control code stays visible.
pub const CODE_DISPLAY_SECONDS: f64 = 0.5;

/// What the renderer should do with the control strip this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdFrame {
    /// Draw the strip with the interlace-on or interlace-off program.
    DrawCode { active: bool },
    /// The code window elapsed; hide the strip.
    HideStrip,
}

/// Shutter-glasses signalling state. All methods take the current time so
/// the protocol is testable without real sleeps.
#[derive(Debug)]
pub struct EdController {
    active: bool,
    stereo: bool,
    code_finished: bool,
    code_started: Instant,
}

impl EdController {
    pub fn new(now: Instant) -> Self {
        Self {
            active: false,
            stereo: false,
            // A finished code lets the first frame start a transition.
            code_finished: true,
            code_started: now - duration_of(CODE_DISPLAY_SECONDS),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_code_finished(&self) -> bool {
        self.code_finished
    }

    /// Called once per stereo frame. Starts the activation code when the
    /// previous code finished; mid-code the request is deferred.
    pub fn request_activate(&mut self, now: Instant) {
        if !self.code_finished {
            return;
        }
        if !self.stereo {
            if !self.active {
                self.code_started = now;
                self.active = true;
                self.code_finished = false;
            }
            self.stereo = true;
        }
    }

    /// Called once per monoscopic frame; the deactivation mirror image.
    pub fn request_deactivate(&mut self, now: Instant) {
        if !self.code_finished {
            return;
        }
        if self.stereo {
            if self.active {
                self.code_started = now;
                self.active = false;
                self.code_finished = false;
            }
            self.stereo = false;
        }
    }

    /// Forces the deactivation code immediately, for the exit drain.
    pub fn force_deactivate(&mut self, now: Instant) {
        self.code_started = now;
        self.active = false;
        self.code_finished = false;
        self.stereo = false;
    }

    /// Resolves the strip action for this frame and latches the
    /// code-finished flag once the display window elapsed.
    pub fn frame(&mut self, now: Instant) -> EdFrame {
        if now.duration_since(self.code_started).as_secs_f64() > CODE_DISPLAY_SECONDS {
            self.code_finished = true;
            return EdFrame::HideStrip;
        }
        EdFrame::DrawCode {
            active: self.active,
        }
    }
}

fn duration_of(seconds: f64) -> Duration {
    Duration::from_secs_f64(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(now: Instant, seconds: f64) -> Instant {
        now + duration_of(seconds)
    }

    #[test]
    fn activation_starts_a_code_and_blocks_until_finished() {
        let start = Instant::now();
        let mut ed = EdController::new(start);

        ed.request_activate(start);
        assert!(ed.is_active());
        assert!(!ed.is_code_finished());

        // Mid-code frames keep drawing the activation pattern.
        assert_eq!(
            ed.frame(advance(start, 0.2)),
            EdFrame::DrawCode { active: true }
        );
        assert_eq!(
            ed.frame(advance(start, 0.49)),
            EdFrame::DrawCode { active: true }
        );

        // Past the window the strip hides and the latch opens.
        assert_eq!(ed.frame(advance(start, 0.51)), EdFrame::HideStrip);
        assert!(ed.is_code_finished());
    }

    #[test]
    fn state_never_changes_mid_code() {
        let start = Instant::now();
        let mut ed = EdController::new(start);
        ed.request_activate(start);

        // A deactivation request while the activation code is on screen is
        // dropped; the flag stays until the next frame boundary after the
        // code finished.
        ed.request_deactivate(advance(start, 0.1));
        assert!(ed.is_active());
        assert_eq!(
            ed.frame(advance(start, 0.3)),
            EdFrame::DrawCode { active: true }
        );

        assert_eq!(ed.frame(advance(start, 0.6)), EdFrame::HideStrip);
        ed.request_deactivate(advance(start, 0.6));
        assert!(!ed.is_active());
        assert_eq!(
            ed.frame(advance(start, 0.7)),
            EdFrame::DrawCode { active: false }
        );
    }

    #[test]
    fn repeated_stereo_frames_do_not_restart_the_timer() {
        let start = Instant::now();
        let mut ed = EdController::new(start);
        ed.request_activate(start);
        let _ = ed.frame(advance(start, 0.6));

        // Still in stereo; no new code should begin.
        ed.request_activate(advance(start, 0.7));
        assert!(ed.is_code_finished());
        assert_eq!(ed.frame(advance(start, 0.8)), EdFrame::HideStrip);
    }

    #[test]
    fn forced_deactivation_restarts_the_code_window() {
        let start = Instant::now();
        let mut ed = EdController::new(start);
        ed.request_activate(start);
        let _ = ed.frame(advance(start, 0.6));

        let exit = advance(start, 1.0);
        ed.force_deactivate(exit);
        assert!(!ed.is_active());
        assert_eq!(
            ed.frame(advance(exit, 0.2)),
            EdFrame::DrawCode { active: false }
        );
        assert_eq!(ed.frame(advance(exit, 0.6)), EdFrame::HideStrip);
    }
}
