//! Native window subsystem: a dedicated window-owning thread services the
//! platform message queue while the caller's thread renders.

pub mod attributes;
pub mod dispatch;
pub mod events;
pub mod placement;
pub mod platform;
pub mod thread;
#[cfg(feature = "backend-winit")]
pub mod winit_backend;

use crate::geometry::RectI;
use crate::monitor::{MonitorRegistry, StaticMonitorRegistry};
use attributes::WindowAttributes;
use events::{EventQueue, WindowEvent};
use placement::{SharedPlacement, TiledConfig};
use platform::{ParentHandle, PlatformBackend, WindowPart};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use thread::{ExitEvent, StartupGate, ThreadSignal, WindowShared};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window class registration failed: {0}")]
    ClassRegistration(String),
    #[error("master window creation failed: {0}")]
    MasterCreation(String),
    #[error("slave window creation failed: {0}")]
    SlaveCreation(String),
    #[error("gl context creation failed: {0}")]
    GlContext(String),
    #[error("window was already created")]
    AlreadyCreated,
    #[error("window is not created")]
    NotCreated,
}

/// Cross-platform window owning a master/slave pair. Creation spawns the
/// window-owning thread; rendering stays on the caller's thread.
pub struct Window {
    shared: Arc<WindowShared>,
    gate: Arc<StartupGate>,
    exited: Arc<ExitEvent>,
    signals: Option<Sender<ThreadSignal>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Window {
    pub fn new(
        attributes: WindowAttributes,
        placement: RectI,
        monitors: StaticMonitorRegistry,
        parent: Option<ParentHandle>,
    ) -> Self {
        let shared_placement = SharedPlacement::new(placement);
        // Seed the hosting monitor so the first drain does not report a
        // monitor change for windows that start off the primary.
        shared_placement.with(|state| {
            state.monitor_id = monitors
                .monitor_at(placement.center())
                .map(|mon| mon.id)
                .unwrap_or_default();
        });
        let shared = Arc::new(WindowShared {
            attributes,
            placement: shared_placement,
            queue: EventQueue::default(),
            input: Mutex::default(),
            monitors: Mutex::new(monitors),
            parent,
        });
        Self {
            shared,
            gate: Arc::new(StartupGate::default()),
            exited: Arc::new(ExitEvent::default()),
            signals: None,
            thread: None,
        }
    }

    /// Creates the platform windows on a dedicated thread, then invokes
    /// `create_gl` on the calling thread once the windows exist. GL contexts
    /// are thread-affine, so the context must be built by the thread that
    /// will render. If window creation fails, `create_gl` never runs.
    pub fn create<F>(
        &mut self,
        backend: Box<dyn PlatformBackend>,
        create_gl: F,
    ) -> Result<(), WindowError>
    where
        F: FnOnce() -> Result<(), WindowError>,
    {
        if self.thread.is_some() {
            return Err(WindowError::AlreadyCreated);
        }

        let (tx, rx) = mpsc::channel();
        let shared = self.shared.clone();
        let gate = self.gate.clone();
        let exited = self.exited.clone();
        let handle = std::thread::Builder::new()
            .name("window-msg".into())
            .spawn(move || thread::run_window_thread(backend, shared, gate, rx, exited))
            .map_err(|err| WindowError::MasterCreation(err.to_string()))?;

        self.thread = Some(handle);
        self.signals = Some(tx);

        if let Err(err) = self.gate.wait_window_ready() {
            self.join_thread();
            return Err(err);
        }

        let gl_result = create_gl();
        // The window thread blocks on this gate either way; release it
        // before reporting a GL failure so teardown can proceed.
        self.gate.signal_gl_ready();
        if let Err(err) = gl_result {
            self.close();
            return Err(err);
        }
        Ok(())
    }

    pub fn attributes(&self) -> &WindowAttributes {
        &self.shared.attributes
    }

    pub fn placement(&self) -> RectI {
        self.shared.placement.current_rect()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.shared.placement.is_fullscreen()
    }

    pub fn shared(&self) -> &Arc<WindowShared> {
        &self.shared
    }

    pub fn monitors_snapshot(&self) -> Vec<crate::monitor::Monitor> {
        self.shared
            .monitors
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .monitors()
            .to_vec()
    }

    pub fn replace_monitors(&self, monitors: Vec<crate::monitor::Monitor>) {
        self.shared
            .monitors
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .replace(monitors);
    }

    /// Switches fullscreen state. Placement and tiling update immediately;
    /// the platform geometry is applied by the window-owning thread.
    pub fn set_fullscreen(&self, fullscreen: bool) {
        apply_fullscreen_placement(&self.shared, fullscreen);
        self.send(ThreadSignal::UpdateGeometry);
    }

    /// Moves the restored window without resizing it. Used to relocate onto
    /// a supported monitor.
    pub fn set_placement(&self, rect: RectI) {
        self.shared.placement.with(|state| state.normal = rect);
        self.shared.queue.append(WindowEvent::Resize);
        self.send(ThreadSignal::UpdateGeometry);
    }

    pub fn show_cursor(&self) {
        self.send(ThreadSignal::CursorShow);
    }

    pub fn hide_cursor(&self) {
        self.send(ThreadSignal::CursorHide);
    }

    pub fn set_slave_visible(&self, visible: bool) {
        self.send(ThreadSignal::ShowSlave(visible));
    }

    /// Requests an application-level exit through the regular drain.
    pub fn request_exit(&self) {
        self.shared.queue.append(WindowEvent::Exit);
    }

    /// Runs `op` with the live key map. The producer thread may update keys
    /// concurrently; the lock scope is the closure.
    pub fn with_keys<R>(&self, op: impl FnOnce(&mut events::KeyMap) -> R) -> R {
        self.shared.with_input(|input| op(&mut input.keys))
    }

    /// Drains every pending message into `out`, exactly once per frame.
    /// Also performs the per-frame derived checks: detecting that the
    /// window center crossed onto another monitor.
    pub fn process_events(&self, out: &mut Vec<WindowEvent>) {
        self.detect_monitor_change();
        self.shared.queue.pop_all(out);
    }

    fn detect_monitor_change(&self) {
        let monitors = self
            .shared
            .monitors
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        if monitors.monitors().len() < 2 {
            return;
        }
        let changed = self.shared.placement.with(|state| {
            if state.is_fullscreen {
                return false;
            }
            match monitors.monitor_at(state.normal.center()) {
                Some(monitor) if monitor.id != state.monitor_id => {
                    state.monitor_id = monitor.id;
                    true
                }
                _ => false,
            }
        });
        if changed {
            self.shared.queue.append(WindowEvent::NewMonitor);
        }
    }

    /// Sends the quit signal and waits for the window thread to release all
    /// platform handles. Shared state stays valid until this returns.
    pub fn close(&mut self) {
        if let Some(signals) = self.signals.take() {
            let _ = signals.send(ThreadSignal::Quit);
            self.exited.wait();
        }
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.signals = None;
    }

    fn send(&self, signal: ThreadSignal) {
        if let Some(signals) = &self.signals {
            let _ = signals.send(signal);
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.close();
    }
}

/// Derives the slave window rectangle: independent slaves occupy the first
/// monitor other than the master's; tiled or single-monitor setups shadow
/// the master rectangle.
pub(crate) fn slave_rect(shared: &WindowShared, master: RectI) -> RectI {
    if !shared.attributes.is_slave_independent() {
        return master;
    }
    let monitors = shared
        .monitors
        .lock()
        .unwrap_or_else(|err| err.into_inner());
    let master_id = monitors
        .monitor_at(master.center())
        .map(|mon| mon.id)
        .unwrap_or_default();
    monitors
        .monitors()
        .iter()
        .find(|mon| mon.id != master_id)
        .map(|mon| mon.virtual_rect)
        .unwrap_or(master)
}

/// Updates placement, tiling and queued messages for a fullscreen switch.
/// Pure state transition; platform geometry is applied separately by the
/// window-owning thread.
pub(crate) fn apply_fullscreen_placement(shared: &Arc<WindowShared>, fullscreen: bool) {
    let master_full = {
        let monitors = shared
            .monitors
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let center = shared.placement.with(|state| state.normal.center());
        monitors
            .monitor_at(center)
            .map(|mon| mon.virtual_rect)
            .unwrap_or_else(|| shared.placement.current_rect())
    };
    let slave_rect = slave_rect(shared, master_full);

    shared.placement.with(|state| {
        state.is_fullscreen = fullscreen;
        if fullscreen {
            state.fullscreen = master_full;
            state.tiled = if shared.attributes.is_slave_independent() {
                TiledConfig::select(master_full, slave_rect)
            } else {
                TiledConfig::Separate
            };
        } else {
            state.tiled = TiledConfig::Separate;
        }
    });
    shared.queue.append(WindowEvent::Resize);
    shared.queue.append(WindowEvent::FullscreenSwitch);
    log::debug!("[window] fullscreen -> {fullscreen}");
}

/// Rectangle of the combined surface when master and slave tile into one
/// window: twice the master extent along the tiling axis.
pub(crate) fn tiled_surface_rect(tiled: TiledConfig, master: RectI) -> RectI {
    let mut rect = master;
    match tiled {
        TiledConfig::MasterSlaveX => rect.right += master.width(),
        TiledConfig::SlaveMasterX => rect.left -= master.width(),
        TiledConfig::MasterSlaveY => rect.bottom += master.height(),
        TiledConfig::SlaveMasterY => rect.top -= master.height(),
        TiledConfig::Separate => {}
    }
    rect
}

/// Applies the current placement to the platform windows. Runs on the
/// window-owning thread in response to `UpdateGeometry`.
pub(crate) fn apply_geometry(shared: &Arc<WindowShared>, backend: &mut dyn PlatformBackend) {
    let state = shared.placement.snapshot();
    if state.is_fullscreen && state.tiled != TiledConfig::Separate {
        // Master grows over both tiles; the separate slave window hides.
        backend.set_visible(WindowPart::Slave, false);
        backend.set_rect(
            WindowPart::Master,
            tiled_surface_rect(state.tiled, state.fullscreen),
        );
        return;
    }
    backend.set_rect(WindowPart::Master, state.current_rect());
    // Hidden slaves (the top-line signal strip) keep the rect the backend
    // derived at creation; only visible companion slaves track the master.
    if shared.attributes.has_slave && !shared.attributes.slave_hidden {
        backend.set_rect(WindowPart::Slave, slave_rect(shared, state.current_rect()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointI;
    use crate::monitor::Monitor;

    fn dual_monitors() -> StaticMonitorRegistry {
        StaticMonitorRegistry::new(vec![
            Monitor::new(0, RectI::from_size(0, 0, 1920, 1080), "DEL4099"),
            Monitor::new(1, RectI::from_size(1920, 0, 1920, 1080), "ZMT1900"),
        ])
    }

    #[test]
    fn fullscreen_picks_monitor_under_window_center() {
        let window = Window::new(
            WindowAttributes::default(),
            RectI::from_size(2000, 100, 800, 600),
            dual_monitors(),
            None,
        );
        apply_fullscreen_placement(&window.shared, true);

        let state = window.shared.placement.snapshot();
        assert!(state.is_fullscreen);
        assert_eq!(state.fullscreen, RectI::from_size(1920, 0, 1920, 1080));

        let mut drained = Vec::new();
        window.shared.queue.pop_all(&mut drained);
        assert!(drained.contains(&WindowEvent::Resize));
        assert!(drained.contains(&WindowEvent::FullscreenSwitch));
    }

    #[test]
    fn fullscreen_with_independent_slave_tiles_adjacent_monitors() {
        let attributes = WindowAttributes {
            has_slave: true,
            ..WindowAttributes::default()
        };
        let window = Window::new(
            attributes,
            RectI::from_size(100, 100, 800, 600),
            dual_monitors(),
            None,
        );
        apply_fullscreen_placement(&window.shared, true);

        let state = window.shared.placement.snapshot();
        // Slave occupies monitor 1, adjoining the master's right edge.
        assert_eq!(state.tiled, TiledConfig::MasterSlaveX);
    }

    #[test]
    fn leaving_fullscreen_restores_separate_layout() {
        let attributes = WindowAttributes {
            has_slave: true,
            ..WindowAttributes::default()
        };
        let window = Window::new(
            attributes,
            RectI::from_size(100, 100, 800, 600),
            dual_monitors(),
            None,
        );
        apply_fullscreen_placement(&window.shared, true);
        apply_fullscreen_placement(&window.shared, false);

        let state = window.shared.placement.snapshot();
        assert!(!state.is_fullscreen);
        assert_eq!(state.tiled, TiledConfig::Separate);
        assert_eq!(state.normal, RectI::from_size(100, 100, 800, 600));
    }

    #[test]
    fn tiled_surface_doubles_along_tiling_axis() {
        let master = RectI::from_size(0, 0, 1920, 1080);
        assert_eq!(
            tiled_surface_rect(TiledConfig::MasterSlaveX, master),
            RectI::from_size(0, 0, 3840, 1080)
        );
        assert_eq!(
            tiled_surface_rect(TiledConfig::SlaveMasterY, master),
            RectI::new(0, -1080, 1920, 1080)
        );
        assert_eq!(tiled_surface_rect(TiledConfig::Separate, master), master);
    }

    #[test]
    fn window_starting_on_secondary_monitor_reports_no_change() {
        let window = Window::new(
            WindowAttributes::default(),
            RectI::from_size(2100, 100, 800, 600),
            dual_monitors(),
            None,
        );

        let mut drained = Vec::new();
        window.process_events(&mut drained);
        assert!(!drained.contains(&WindowEvent::NewMonitor));
        assert_eq!(
            window.shared.placement.with(|state| state.monitor_id),
            1
        );
    }

    #[test]
    fn monitor_change_is_detected_once() {
        let window = Window::new(
            WindowAttributes::default(),
            RectI::from_size(100, 100, 800, 600),
            dual_monitors(),
            None,
        );
        // Window starts on monitor 0.
        assert_eq!(
            window
                .shared
                .placement
                .with(|state| state.normal.center()),
            PointI::new(500, 400)
        );

        let mut drained = Vec::new();
        window.process_events(&mut drained);
        assert!(!drained.contains(&WindowEvent::NewMonitor));

        // Move the window onto monitor 1.
        window
            .shared
            .placement
            .with(|state| state.normal = RectI::from_size(2100, 100, 800, 600));
        window.process_events(&mut drained);
        assert!(drained.contains(&WindowEvent::NewMonitor));

        // No repeat while the window stays put.
        window.process_events(&mut drained);
        assert!(!drained.contains(&WindowEvent::NewMonitor));
    }
}
