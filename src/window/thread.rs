//! The window-owning thread: creation handshake, platform message loop and
//! teardown ordering.
//!
//! Platform window creation must happen on a stable thread that owns the
//! message queue, while GL context creation must happen on the thread that
//! renders. The two-phase gate below sequences those threads: the caller
//! blocks until the windows exist, creates the GL context itself, then
//! releases the window thread to show the windows and start servicing
//! messages.

use crate::geometry::PointD;
use crate::monitor::{MonitorRegistry, StaticMonitorRegistry};
use crate::window::WindowError;
use crate::window::attributes::WindowAttributes;
use crate::window::dispatch::{DispatchAction, DispatchInput, handle_platform_event};
use crate::window::events::{EventQueue, KeyMap, WindowEvent};
use crate::window::placement::SharedPlacement;
use crate::window::platform::{ParentHandle, PlatformBackend, WindowPart};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// How long one pass of the message loop waits for a control signal before
/// polling the platform for pending messages.
const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Startup handshake state. `WindowReady` means the platform windows exist
/// and the caller may create the GL context; `GlReady` releases the window
/// thread to show the windows.
#[derive(Debug)]
enum StartupState {
    Idle,
    WindowReady,
    Failed(WindowError),
    GlReady,
}

pub struct StartupGate {
    state: Mutex<StartupState>,
    cond: Condvar,
}

impl Default for StartupGate {
    fn default() -> Self {
        Self {
            state: Mutex::new(StartupState::Idle),
            cond: Condvar::new(),
        }
    }
}

impl StartupGate {
    pub fn signal_window_ready(&self, result: Result<(), WindowError>) {
        let mut state = self.lock();
        *state = match result {
            Ok(()) => StartupState::WindowReady,
            Err(err) => StartupState::Failed(err),
        };
        self.cond.notify_all();
    }

    /// Blocks the caller until the window thread reports success or failure.
    pub fn wait_window_ready(&self) -> Result<(), WindowError> {
        let mut state = self.lock();
        loop {
            match &*state {
                StartupState::Idle => {
                    state = self
                        .cond
                        .wait(state)
                        .unwrap_or_else(|err| err.into_inner());
                }
                StartupState::Failed(err) => return Err(err.clone()),
                StartupState::WindowReady | StartupState::GlReady => return Ok(()),
            }
        }
    }

    pub fn signal_gl_ready(&self) {
        let mut state = self.lock();
        *state = StartupState::GlReady;
        self.cond.notify_all();
    }

    /// Blocks the window thread until the caller created the GL context.
    pub fn wait_gl_ready(&self) {
        let mut state = self.lock();
        while !matches!(&*state, StartupState::GlReady) {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(|err| err.into_inner());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StartupState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Level-triggered signals delivered to the window-owning thread. Cursor
/// visibility is its own pair of signals because the platform call is a
/// counted show/hide that must run on the window-owning thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadSignal {
    Quit,
    CursorShow,
    CursorHide,
    /// Placement changed on the render thread; push it to the platform.
    UpdateGeometry,
    ShowSlave(bool),
}

/// One-shot "thread exited" event the owner waits on before teardown,
/// guaranteeing no platform call runs after destruction begins.
#[derive(Default)]
pub struct ExitEvent {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl ExitEvent {
    pub fn signal(&self) {
        *self.fired.lock().unwrap_or_else(|err| err.into_inner()) = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut fired = self.fired.lock().unwrap_or_else(|err| err.into_inner());
        while !*fired {
            fired = self.cond.wait(fired).unwrap_or_else(|err| err.into_inner());
        }
    }
}

/// Cursor position and key state mutated by the window thread, read by the
/// consumer while processing drained messages.
#[derive(Debug, Default)]
pub struct InputState {
    pub keys: KeyMap,
    pub last_mouse: PointD,
}

/// State shared between the window-owning thread and the render thread.
pub struct WindowShared {
    pub attributes: WindowAttributes,
    pub placement: SharedPlacement,
    pub queue: EventQueue,
    pub input: Mutex<InputState>,
    pub monitors: Mutex<StaticMonitorRegistry>,
    pub parent: Option<ParentHandle>,
}

impl WindowShared {
    pub fn with_input<R>(&self, op: impl FnOnce(&mut InputState) -> R) -> R {
        op(&mut self.input.lock().unwrap_or_else(|err| err.into_inner()))
    }
}

/// Entry point of the window-owning thread.
pub fn run_window_thread(
    mut backend: Box<dyn PlatformBackend>,
    shared: Arc<WindowShared>,
    gate: Arc<StartupGate>,
    signals: Receiver<ThreadSignal>,
    exited: Arc<ExitEvent>,
) {
    let placement = shared.placement.current_rect();
    if let Err(err) = backend.create_windows(&shared.attributes, placement, shared.parent) {
        log::error!("[window] platform window creation failed: {err}");
        gate.signal_window_ready(Err(err));
        exited.signal();
        return;
    }
    gate.signal_window_ready(Ok(()));
    gate.wait_gl_ready();

    // GL context is up; show the windows and report the initial geometry.
    show_initial(&mut backend, &shared);
    shared.queue.append(WindowEvent::Resize);
    log::info!("[window] message loop started");

    let mut media_keys_registered = false;
    loop {
        match signals.recv_timeout(WAIT_SLICE) {
            Ok(ThreadSignal::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(ThreadSignal::CursorShow) => backend.set_cursor_visible(true),
            Ok(ThreadSignal::CursorHide) => backend.set_cursor_visible(false),
            Ok(ThreadSignal::UpdateGeometry) => {
                super::apply_geometry(&shared, backend.as_mut());
            }
            Ok(ThreadSignal::ShowSlave(visible)) => {
                if shared.attributes.has_slave {
                    backend.set_visible(WindowPart::Slave, visible);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                pump_platform(&mut backend, &shared);
                // Rarely changes; polled here because registration must
                // happen on the window-owning thread.
                let want = shared.attributes.global_media_keys;
                if want != media_keys_registered {
                    media_keys_registered = want;
                    backend.set_media_keys_registered(want);
                }
            }
        }
    }

    if media_keys_registered {
        backend.set_media_keys_registered(false);
    }
    backend.destroy();
    log::info!("[window] message loop stopped");
    // Nothing may run after this signal; the owner is free to tear down.
    exited.signal();
}

fn show_initial(backend: &mut Box<dyn PlatformBackend>, shared: &Arc<WindowShared>) {
    let attributes = &shared.attributes;
    let monitor_count = shared
        .monitors
        .lock()
        .unwrap_or_else(|err| err.into_inner())
        .monitors()
        .len();
    if attributes.has_slave
        && !attributes.slave_hidden
        && (!attributes.is_slave_independent() || monitor_count > 1)
    {
        backend.set_visible(WindowPart::Slave, true);
    }
    if !attributes.hide_on_start {
        backend.set_visible(WindowPart::Master, true);
    }
}

fn pump_platform(backend: &mut Box<dyn PlatformBackend>, shared: &Arc<WindowShared>) {
    // Drain everything pending; a single poll per slice would back up the
    // platform queue.
    let events = backend.wait_events(Duration::ZERO);
    if events.is_empty() {
        return;
    }
    let input = DispatchInput {
        attributes: &shared.attributes,
        frame: backend.frame_metrics(),
        has_parent: shared.parent.is_some(),
    };
    for event in events {
        let actions = shared.placement.with(|placement| {
            shared.with_input(|state| {
                handle_platform_event(
                    &input,
                    placement,
                    &mut state.keys,
                    &mut state.last_mouse,
                    event.clone(),
                )
            })
        });
        for action in actions {
            apply_action(backend, shared, action);
        }
    }
}

fn apply_action(
    backend: &mut Box<dyn PlatformBackend>,
    shared: &Arc<WindowShared>,
    action: DispatchAction,
) {
    match action {
        DispatchAction::Enqueue(event) => shared.queue.append(event),
        DispatchAction::EnterFullscreen => {
            super::apply_fullscreen_placement(shared, true);
            super::apply_geometry(shared, backend.as_mut());
        }
        DispatchAction::SuppressSleep => {
            log::debug!("[window] suppressed display sleep request");
        }
        DispatchAction::SetInputFocus => backend.set_input_focus(),
        DispatchAction::CaptureInput => backend.capture_input(true),
        DispatchAction::ReleaseCapture => backend.capture_input(false),
        DispatchAction::MonitorsChanged => {
            // Enumeration itself is the embedder's duty; flag it for the
            // consumer so it can rebuild the registry.
            shared.queue.append(WindowEvent::NewMonitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn gate_orders_window_then_gl() {
        let gate = Arc::new(StartupGate::default());
        let gate_in = gate.clone();

        let worker = thread::spawn(move || {
            gate_in.signal_window_ready(Ok(()));
            gate_in.wait_gl_ready();
        });

        gate.wait_window_ready().expect("window ready");
        gate.signal_gl_ready();
        worker.join().expect("worker join");
    }

    #[test]
    fn gate_propagates_creation_failure() {
        let gate = StartupGate::default();
        gate.signal_window_ready(Err(WindowError::MasterCreation("boom".into())));
        let err = gate.wait_window_ready().expect_err("must fail");
        assert!(matches!(err, WindowError::MasterCreation(_)));
    }

    #[test]
    fn exit_event_releases_waiter() {
        let event = Arc::new(ExitEvent::default());
        let event_in = event.clone();
        let signaller = thread::spawn(move || event_in.signal());
        event.wait();
        signaller.join().expect("join");
    }
}
