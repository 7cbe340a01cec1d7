//! Platform seam: the backend trait owning native window handles, the tagged
//! event variants it produces, and a headless implementation for tests and
//! embedded use.

use crate::geometry::RectI;
use crate::window::WindowError;
use crate::window::attributes::WindowAttributes;
use crate::window::events::MouseButton;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPart {
    Master,
    Slave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    Stop,
    PlayPause,
    PrevTrack,
    NextTrack,
}

/// Decoration frame thickness reported by the platform, used to translate
/// outer window rectangles into client rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameMetrics {
    pub frame_x: i32,
    pub frame_y: i32,
    pub caption_y: i32,
}

/// Opaque native handle of an embedding parent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentHandle(pub u64);

/// Raw platform window message, already lifted out of the platform's own
/// encoding into a tagged variant.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// Input focus left the master window.
    FocusLost,
    FocusGained,
    /// Maximize request or a titlebar double-click.
    SysMaximize,
    /// Screensaver or monitor power-save wants to start.
    SysScreensaver,
    CloseRequested,
    /// Master window moved; coordinates are the new client origin.
    Moved { x: i32, y: i32 },
    /// Master client area resized.
    Resized { width: i32, height: i32 },
    /// Interactive move/size in progress; carries the outer frame rectangle.
    SizingFrame { rect: RectI },
    FilesDropped(Vec<PathBuf>),
    KeyDown(u8),
    KeyUp(u8),
    /// Global media hotkey. Only press transitions exist.
    MediaKey(MediaKey),
    MouseButton {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    /// Wheel tick; coordinates are desktop-relative, unlike button events.
    Wheel { x: i32, y: i32, up: bool },
    /// Cursor moved over the master sub-window (client coordinates).
    MouseMoved { x: i32, y: i32 },
    /// The display configuration changed.
    DisplayChanged,
}

/// Owner of the native window pair. Every method is called from the
/// window-owning thread only; implementations never need internal locking
/// for their handles.
pub trait PlatformBackend: Send {
    /// Creates the master window, its GL drawable sub-window and, when
    /// requested, the slave window. A top-line slave (`slave_top_line` in
    /// `attributes`) is placed by the backend itself: a strip of the signal
    /// height along the top edge of the hosting monitor. Geometry updates
    /// never reposition it. Failure classification follows the order of
    /// operations: class registration, master creation, slave creation.
    fn create_windows(
        &mut self,
        attributes: &WindowAttributes,
        placement: RectI,
        parent: Option<ParentHandle>,
    ) -> Result<(), WindowError>;

    /// Blocks for up to `timeout` waiting for platform messages, then
    /// returns everything pending. An empty vector means the wait elapsed.
    fn wait_events(&mut self, timeout: Duration) -> Vec<PlatformEvent>;

    fn set_visible(&mut self, part: WindowPart, visible: bool);

    fn set_rect(&mut self, part: WindowPart, rect: RectI);

    /// Counted platform show/hide; must run on the window-owning thread.
    fn set_cursor_visible(&mut self, visible: bool);

    /// Captures mouse input so release events arrive even outside the window.
    fn capture_input(&mut self, captured: bool);

    fn set_input_focus(&mut self);

    fn set_media_keys_registered(&mut self, registered: bool);

    fn frame_metrics(&self) -> FrameMetrics;

    /// Releases every native handle. No other method is called afterwards.
    fn destroy(&mut self);
}

/// Injected failure points for the headless backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadlessFailure {
    #[default]
    None,
    ClassRegistration,
    MasterCreation,
    SlaveCreation,
}

/// Recorded state of a [`HeadlessBackend`], shared with the test that owns
/// the scenario.
#[derive(Debug, Default)]
pub struct HeadlessState {
    pub created: bool,
    pub destroyed: bool,
    pub master_visible: bool,
    pub slave_visible: bool,
    pub cursor_counter: i32,
    pub media_keys_registered: bool,
    pub rects: Vec<(WindowPart, RectI)>,
    pub capture_log: Vec<bool>,
    pub focus_requests: u32,
}

/// Backend without any native windows. Events are scripted ahead of time;
/// every call is recorded. Fills the role the platform port plays in
/// production, the way null backends do elsewhere in this crate.
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
    scripted: Arc<Mutex<VecDeque<PlatformEvent>>>,
    failure: HeadlessFailure,
    frame: FrameMetrics,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            scripted: Arc::default(),
            failure: HeadlessFailure::None,
            frame: FrameMetrics {
                frame_x: 8,
                frame_y: 8,
                caption_y: 23,
            },
        }
    }

    pub fn with_failure(mut self, failure: HeadlessFailure) -> Self {
        self.failure = failure;
        self
    }

    /// Shared view of the recorded state, kept by the test.
    pub fn state_handle(&self) -> Arc<Mutex<HeadlessState>> {
        self.state.clone()
    }

    /// Handle for feeding events after the backend moved to the window thread.
    pub fn event_feed(&self) -> Arc<Mutex<VecDeque<PlatformEvent>>> {
        self.scripted.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl PlatformBackend for HeadlessBackend {
    fn create_windows(
        &mut self,
        attributes: &WindowAttributes,
        _placement: RectI,
        _parent: Option<ParentHandle>,
    ) -> Result<(), WindowError> {
        match self.failure {
            HeadlessFailure::ClassRegistration => {
                return Err(WindowError::ClassRegistration(
                    "scripted registration failure".into(),
                ));
            }
            HeadlessFailure::MasterCreation => {
                return Err(WindowError::MasterCreation(
                    "scripted master failure".into(),
                ));
            }
            HeadlessFailure::SlaveCreation if attributes.has_slave => {
                return Err(WindowError::SlaveCreation("scripted slave failure".into()));
            }
            _ => {}
        }
        self.state().created = true;
        Ok(())
    }

    fn wait_events(&mut self, timeout: Duration) -> Vec<PlatformEvent> {
        let drained: Vec<PlatformEvent> = {
            let mut scripted = self.scripted.lock().unwrap_or_else(|err| err.into_inner());
            scripted.drain(..).collect()
        };
        if drained.is_empty() && !timeout.is_zero() {
            // Nothing pending; model the platform wait without spinning.
            std::thread::sleep(timeout.min(Duration::from_millis(1)));
        }
        drained
    }

    fn set_visible(&mut self, part: WindowPart, visible: bool) {
        let mut state = self.state();
        match part {
            WindowPart::Master => state.master_visible = visible,
            WindowPart::Slave => state.slave_visible = visible,
        }
    }

    fn set_rect(&mut self, part: WindowPart, rect: RectI) {
        self.state().rects.push((part, rect));
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.state().cursor_counter += if visible { 1 } else { -1 };
    }

    fn capture_input(&mut self, captured: bool) {
        self.state().capture_log.push(captured);
    }

    fn set_input_focus(&mut self) {
        self.state().focus_requests += 1;
    }

    fn set_media_keys_registered(&mut self, registered: bool) {
        self.state().media_keys_registered = registered;
    }

    fn frame_metrics(&self) -> FrameMetrics {
        self.frame
    }

    fn destroy(&mut self) {
        let mut state = self.state();
        state.destroyed = true;
        state.master_visible = false;
        state.slave_visible = false;
    }
}
