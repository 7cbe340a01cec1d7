//! Interlaced stereo output: splits a left/right draw pair across the pixel
//! grid of an interlaced display, or drives the eDimensional shutter-glasses
//! control code.

pub mod device;
pub mod ed;
pub mod fps;
pub mod parity;
pub mod program;

use crate::geometry::RectI;
use crate::monitor::{Monitor, MonitorRegistry, is_interlaced_monitor};
use crate::settings::{BoolParam, Settings};
use crate::window::events::{WindowEvent, keys};
use crate::window::platform::{ParentHandle, PlatformBackend, WindowPart};
use crate::window::{Window, WindowError, attributes::WindowAttributes};
use device::{DeviceInfo, DeviceKind, device_list};
use ed::{EdController, EdFrame};
use fps::FpsPacer;
use program::{GlBackend, ProgramId, QuadPass, shaders};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

const SETTING_DEVICE_ID: &str = "deviceId";
const SETTING_WINDOW_POS: &str = "windowPos";
const SETTING_BIND_MONITOR: &str = "bindMonitor";
const SETTING_VSYNC: &str = "vsync";
const SETTING_REVERSE: &str = "reverse";

/// Offset applied when relocating the window onto a target monitor.
const RELOCATE_OFFSET: i32 = 256;
/// Height in pixels of the ED control strip at the top of the slave window.
const ED_STRIP_HEIGHT: i32 = 10;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("gl context initialization failed: {0}")]
    GlContext(String),
    #[error("failed to init shader program: {0}")]
    ShaderInit(String),
    #[error("failed to init frame buffer ({0})")]
    Offscreen(String),
    #[error("renderer is not created")]
    NotCreated,
    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Which view the host draws when the callback fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Shared count of live renderer instances. A second instance in the same
/// process makes everyone release GPU memory between frames.
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    active: Arc<AtomicUsize>,
}

impl InstanceRegistry {
    pub fn register(&self) -> InstanceTicket {
        let previous = self.active.fetch_add(1, Ordering::SeqCst);
        InstanceTicket {
            active: self.active.clone(),
            shares_process: previous > 0,
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Registration held for the renderer's lifetime.
pub struct InstanceTicket {
    active: Arc<AtomicUsize>,
    shares_process: bool,
}

impl InstanceTicket {
    /// True when another instance was already registered at creation time.
    pub fn shares_process(&self) -> bool {
        self.shares_process
    }
}

impl Drop for InstanceTicket {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Deferred parameter-change notification, drained on the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamChange {
    VSync(bool),
    BindToMonitor(bool),
}

struct ProgramPair {
    normal: ProgramId,
    reversed: ProgramId,
}

struct ProgramSet {
    row: ProgramPair,
    col: ProgramPair,
    chess: ProgramPair,
    ed_on: ProgramId,
    ed_off: ProgramId,
}

impl ProgramSet {
    fn for_device(&self, device: DeviceKind) -> &ProgramPair {
        match device {
            DeviceKind::Row | DeviceKind::RowEd => &self.row,
            DeviceKind::Col => &self.col,
            DeviceKind::Chess => &self.chess,
        }
    }
}

/// Boolean options exposed to the host UI.
pub struct OutputParams {
    pub vsync: BoolParam,
    pub reverse: BoolParam,
    pub bind_to_monitor: BoolParam,
}

/// The interlaced output renderer. Owns the window pair, the GL seam and the
/// per-frame compositing state machine.
pub struct StereoOutput {
    window: Window,
    settings: Settings,
    gl: Box<dyn GlBackend>,
    programs: Option<ProgramSet>,
    pub params: OutputParams,
    pending_changes: Arc<Mutex<Vec<ParamChange>>>,
    devices: Vec<DeviceInfo>,
    device: DeviceKind,
    monitor: Option<Monitor>,
    monitor_reversed: bool,
    stereo_source: bool,
    ed: EdController,
    ed_rect: RectI,
    vp_size_y: i32,
    fps: FpsPacer,
    save_placement: bool,
    compress_mem: bool,
    broken: bool,
    _ticket: InstanceTicket,
}

impl StereoOutput {
    /// Restores persisted options, picks the startup monitor and placement,
    /// and prepares the window pair. Nothing platform-visible happens until
    /// [`create`](Self::create).
    pub fn new(
        settings: Settings,
        monitors: Vec<Monitor>,
        gl: Box<dyn GlBackend>,
        registry: &InstanceRegistry,
        parent: Option<ParentHandle>,
    ) -> Self {
        let ticket = registry.register();
        let compress_mem = ticket.shares_process();

        let devices = device_list(&monitors);
        let mut monitor_reversed = false;
        let interlaced = crate::monitor::find_interlaced_monitor(&monitors)
            .map(|(mon, reversed)| {
                monitor_reversed = reversed;
                mon.clone()
            });

        let mut params = OutputParams {
            vsync: BoolParam::new("VSync", settings.get_bool(SETTING_VSYNC, true)),
            reverse: BoolParam::new("Reverse Order", settings.get_bool(SETTING_REVERSE, false)),
            bind_to_monitor: BoolParam::new(
                "Bind To Supported Monitor",
                settings.get_bool(SETTING_BIND_MONITOR, true),
            ),
        };
        let pending_changes: Arc<Mutex<Vec<ParamChange>>> = Arc::default();
        let vsync_sink = pending_changes.clone();
        params.vsync.observe(move |value| {
            push_change(&vsync_sink, ParamChange::VSync(value));
        });
        let bind_sink = pending_changes.clone();
        params.bind_to_monitor.observe(move |value| {
            push_change(&bind_sink, ParamChange::BindToMonitor(value));
        });

        let (placement, startup_monitor) = resolve_startup_placement(
            &settings,
            &monitors,
            interlaced.as_ref(),
            params.bind_to_monitor.value(),
        );

        let device = settings
            .get_opt::<String>(SETTING_DEVICE_ID)
            .and_then(|id| DeviceKind::from_id(&id))
            .unwrap_or_default();

        let attributes = WindowAttributes {
            has_slave: true,
            slave_top_line: true,
            slave_hidden: true,
            ..WindowAttributes::default()
        };
        let save_placement = parent.is_none();
        let ed_rect = RectI::from_size(0, 0, startup_monitor.virtual_rect.width(), ED_STRIP_HEIGHT);
        let window = Window::new(
            attributes,
            placement,
            crate::monitor::StaticMonitorRegistry::new(monitors),
            parent,
        );

        Self {
            window,
            settings,
            gl,
            programs: None,
            params,
            pending_changes,
            devices,
            device,
            monitor: Some(startup_monitor),
            monitor_reversed,
            stereo_source: false,
            ed: EdController::new(Instant::now()),
            ed_rect,
            vp_size_y: ED_STRIP_HEIGHT,
            fps: FpsPacer::new(0.0),
            save_placement,
            compress_mem,
            broken: false,
            _ticket: ticket,
        }
    }

    /// Creates the platform windows and the GL context through the startup
    /// handshake, then compiles every device program. Any failure closes the
    /// window again and surfaces a classified error.
    pub fn create(&mut self, backend: Box<dyn PlatformBackend>) -> Result<(), OutputError> {
        let gl = self.gl.as_mut();
        self.window.create(backend, || {
            gl.init_context()
                .map_err(|err| WindowError::GlContext(err.to_string()))
        })?;

        self.gl.set_vsync(self.params.vsync.value());
        match compile_programs(self.gl.as_mut()) {
            Ok(programs) => {
                self.programs = Some(programs);
            }
            Err(err) => {
                log::error!("[output] {err}");
                self.window.close();
                return Err(err);
            }
        }
        log::info!(
            "[output] created with device '{}' on monitor {:?}",
            self.device.id(),
            self.monitor.as_ref().map(|mon| mon.id)
        );
        Ok(())
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    pub fn set_device(&mut self, device: DeviceKind) {
        self.device = device;
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Whether the current frame source carries two distinct views.
    pub fn set_stereo_source(&mut self, stereo: bool) {
        self.stereo_source = stereo;
    }

    pub fn set_target_fps(&mut self, target: f64) {
        self.fps.set_target(target);
    }

    /// Drains pending window messages into `out` and applies the renderer's
    /// own reactions: viewport bookkeeping on resize, device hotkeys, and
    /// monitor reversal re-detection after a monitor change.
    pub fn process_events(&mut self, out: &mut Vec<WindowEvent>) {
        self.apply_pending_params();
        self.window.process_events(out);

        if out.contains(&WindowEvent::Exit)
            && self.device.drives_ed_signal()
            && self.ed.is_active()
            && self.programs.is_some()
        {
            self.drain_ed_deactivation();
        }

        for event in out.iter() {
            match event {
                WindowEvent::Resize => self.on_resize(),
                WindowEvent::NewMonitor => self.redetect_monitor_reversal(),
                _ => {}
            }
        }

        if let Some(device) = self.window.with_keys(|map| {
            if map.take(keys::F1) {
                Some(DeviceKind::Row)
            } else if map.take(keys::F2) {
                Some(DeviceKind::Col)
            } else if map.take(keys::F3) {
                Some(DeviceKind::Chess)
            } else if map.take(keys::F4) {
                Some(DeviceKind::RowEd)
            } else {
                None
            }
        }) {
            log::info!("[output] device hotkey -> '{}'", device.id());
            self.device = device;
        }
    }

    /// Renders one frame. The left view always lands in the visible
    /// framebuffer; the right view goes through the offscreen compositing
    /// pass unless the source is monoscopic or the pipeline is broken.
    pub fn render_frame(&mut self, draw: &mut dyn FnMut(Eye)) -> Result<(), OutputError> {
        if self.programs.is_none() {
            return Err(OutputError::NotCreated);
        }
        let now = Instant::now();
        let placement = self.window.placement();

        self.gl.make_current(WindowPart::Master);
        self.gl.resize_viewport(placement);
        draw(Eye::Left);

        if !self.stereo_source || self.broken {
            if self.compress_mem {
                self.gl.release_offscreen();
            }
            if self.device.drives_ed_signal() {
                self.ed.request_deactivate(now);
                self.draw_ed_codes(now);
            }
            self.fps.sleep_to_target();
            self.gl.swap(WindowPart::Master);
            return Ok(());
        }

        let offscreen = match self
            .gl
            .ensure_offscreen(placement.width(), placement.height())
        {
            Ok(info) => info,
            Err(err) => {
                log::error!("[output] {err}; falling back to monoscopic path");
                self.broken = true;
                return Err(err);
            }
        };

        let reverse = parity::is_pixel_reverse(
            self.device,
            placement,
            self.window.is_fullscreen(),
            self.monitor_reversed,
            self.params.reverse.value(),
        );

        // Shrink sampling to the used sub-region so texture padding never
        // aliases into the narrow interlace lines.
        let (dx, dy) = offscreen.used_extent();
        let tex_coords = [(dx, 0.0), (dx, dy), (0.0, 0.0), (0.0, dy)];

        self.gl.begin_offscreen();
        draw(Eye::Right);
        self.gl.end_offscreen();

        let programs = self.programs.as_ref().ok_or(OutputError::NotCreated)?;
        let pair = programs.for_device(self.device);
        self.gl.composite_quad(QuadPass {
            program: if reverse { pair.reversed } else { pair.normal },
            tex_coords,
        });

        if self.device.drives_ed_signal() {
            self.ed.request_activate(now);
            self.draw_ed_codes(now);
        }

        self.fps.sleep_to_target();
        self.gl.swap(WindowPart::Master);
        Ok(())
    }

    /// Persists options and placement, then tears the window down.
    pub fn close(&mut self) {
        if self.save_placement {
            self.window.set_fullscreen(false);
            self.settings
                .set(SETTING_WINDOW_POS, self.window.placement());
        }
        self.settings.set(SETTING_VSYNC, self.params.vsync.value());
        self.settings
            .set(SETTING_REVERSE, self.params.reverse.value());
        self.settings
            .set(SETTING_BIND_MONITOR, self.params.bind_to_monitor.value());
        self.settings.set(SETTING_DEVICE_ID, self.device.id());
        if let Err(err) = self.settings.flush() {
            log::warn!("[output] failed to persist settings: {err}");
        }
        self.window.close();
    }

    fn on_resize(&mut self) {
        let rect = self.window.placement();
        self.vp_size_y = rect.height();
        if self.window.is_fullscreen() {
            return;
        }
        let monitors = self.window.monitors_snapshot();
        let registry = crate::monitor::StaticMonitorRegistry::new(monitors);
        if let Some(mon) = registry.monitor_at(rect.center()) {
            let stale = self
                .monitor
                .as_ref()
                .is_none_or(|cached| !cached.virtual_rect.contains(rect.center()));
            if stale {
                self.monitor = Some(mon.clone());
            }
        }
        if let Some(mon) = &self.monitor {
            self.ed_rect = RectI::from_size(0, 0, mon.virtual_rect.width(), ED_STRIP_HEIGHT);
        }
        self.vp_size_y = ED_STRIP_HEIGHT;
    }

    fn redetect_monitor_reversal(&mut self) {
        let rect = self.window.placement();
        let monitors = self.window.monitors_snapshot();
        let registry = crate::monitor::StaticMonitorRegistry::new(monitors);
        self.monitor_reversed = registry
            .monitor_at(rect.center())
            .and_then(is_interlaced_monitor)
            .unwrap_or(false);
    }

    fn apply_pending_params(&mut self) {
        let changes: Vec<ParamChange> = {
            let mut pending = self
                .pending_changes
                .lock()
                .unwrap_or_else(|err| err.into_inner());
            pending.drain(..).collect()
        };
        for change in changes {
            match change {
                ParamChange::VSync(enabled) => {
                    if self.programs.is_some() {
                        self.gl.make_current(WindowPart::Master);
                        self.gl.set_vsync(enabled);
                    }
                }
                ParamChange::BindToMonitor(true) => self.bind_to_supported_monitor(),
                ParamChange::BindToMonitor(false) => {}
            }
        }
    }

    /// Relocates the restored window onto the first known interlaced panel,
    /// keeping its size. No-op in fullscreen or when already there.
    fn bind_to_supported_monitor(&mut self) {
        if self.window.is_fullscreen() {
            return;
        }
        let monitors = self.window.monitors_snapshot();
        let rect = self.window.placement();
        let registry = crate::monitor::StaticMonitorRegistry::new(monitors.clone());
        let current_interlaced = registry
            .monitor_at(rect.center())
            .and_then(is_interlaced_monitor);
        let Some((target, reversed)) = crate::monitor::find_interlaced_monitor(&monitors) else {
            return;
        };
        if current_interlaced.is_some() {
            self.monitor_reversed = current_interlaced.unwrap_or(false);
            return;
        }
        self.monitor_reversed = reversed;
        let relocated = RectI::from_size(
            target.virtual_rect.left + RELOCATE_OFFSET,
            target.virtual_rect.top + RELOCATE_OFFSET,
            rect.width(),
            rect.height(),
        );
        log::info!(
            "[output] binding window to interlaced monitor {} ({})",
            target.id,
            target.pnp_id
        );
        self.window.set_placement(relocated);
    }

    fn draw_ed_codes(&mut self, now: Instant) {
        let Some(programs) = &self.programs else {
            return;
        };
        match self.ed.frame(now) {
            EdFrame::HideStrip => {
                self.window.set_slave_visible(false);
            }
            EdFrame::DrawCode { active } => {
                let fullscreen = self.window.is_fullscreen();
                if !fullscreen {
                    self.window.set_slave_visible(true);
                    self.gl.make_current(WindowPart::Slave);
                    self.gl.resize_viewport(self.ed_rect);
                    self.gl.clear();
                }
                let program = if active {
                    programs.ed_on
                } else {
                    programs.ed_off
                };
                self.gl.draw_ed_strip(program, self.vp_size_y);
                if !fullscreen {
                    self.gl.swap(WindowPart::Slave);
                }
            }
        }
    }

    /// Exit path for active shutter glasses: keeps presenting the
    /// deactivation code until the full code window elapsed, so the
    /// hardware never latches a torn code at shutdown.
    fn drain_ed_deactivation(&mut self) {
        let start = Instant::now();
        self.ed.force_deactivate(start);
        log::info!("[output] draining shutter-glasses deactivation code");
        let fullscreen = self.window.is_fullscreen();
        loop {
            let now = Instant::now();
            self.gl.make_current(WindowPart::Master);
            // In fullscreen the code strip renders into the master back
            // buffer; it must be presented every iteration, the glasses
            // only read the front buffer.
            if fullscreen {
                self.gl.clear();
            }
            self.draw_ed_codes(now);
            if fullscreen {
                self.gl.swap(WindowPart::Master);
            }
            if self.ed.is_code_finished() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

fn push_change(sink: &Arc<Mutex<Vec<ParamChange>>>, change: ParamChange) {
    sink.lock()
        .unwrap_or_else(|err| err.into_inner())
        .push(change);
}

/// Startup placement: restore the stored rectangle when it is on-screen,
/// otherwise derive a fresh one on the preferred monitor. The preferred
/// monitor is the stored one unless bind-to-monitor redirects onto a known
/// interlaced panel.
fn resolve_startup_placement(
    settings: &Settings,
    monitors: &[Monitor],
    interlaced: Option<&Monitor>,
    bind_to_monitor: bool,
) -> (RectI, Monitor) {
    let fallback = Monitor::new(0, RectI::from_size(0, 0, 1920, 1080), "");
    let registry = crate::monitor::StaticMonitorRegistry::new(monitors.to_vec());

    let stored = settings.get_rect(SETTING_WINDOW_POS);
    let anchor = stored.unwrap_or_default();
    let mut target = registry
        .monitor_at(anchor.center())
        .cloned()
        .unwrap_or(fallback);
    if bind_to_monitor
        && let Some(interlaced) = interlaced
        && is_interlaced_monitor(&target).is_none()
    {
        target = interlaced.clone();
    }

    let rect = match stored {
        Some(rect) if target.virtual_rect.contains(rect.center()) => rect,
        Some(rect) => {
            log::warn!(
                "[output] stored window position {rect:?} is outside monitor {}",
                target.id
            );
            RectI::from_size(
                target.virtual_rect.left + RELOCATE_OFFSET,
                target.virtual_rect.top + RELOCATE_OFFSET,
                rect.width(),
                rect.height(),
            )
        }
        None => RectI::from_size(
            target.virtual_rect.left + RELOCATE_OFFSET,
            target.virtual_rect.top + RELOCATE_OFFSET,
            1024,
            512,
        ),
    };
    (rect, target)
}

fn compile_programs(gl: &mut dyn GlBackend) -> Result<ProgramSet, OutputError> {
    let row = ProgramPair {
        normal: gl.compile_program("Row Interlace", shaders::QUAD_VERTEX, &shaders::row())?,
        reversed: gl.compile_program(
            "Row Interlace Inversed",
            shaders::QUAD_VERTEX,
            &shaders::row_reversed(),
        )?,
    };
    let col = ProgramPair {
        normal: gl.compile_program("Column Interlace", shaders::QUAD_VERTEX, &shaders::column())?,
        reversed: gl.compile_program(
            "Column Interlace Inversed",
            shaders::QUAD_VERTEX,
            &shaders::column_reversed(),
        )?,
    };
    let chess = ProgramPair {
        normal: gl.compile_program("Chessboard", shaders::QUAD_VERTEX, &shaders::chessboard())?,
        reversed: gl.compile_program(
            "Chessboard Inversed",
            shaders::QUAD_VERTEX,
            &shaders::chessboard_reversed(),
        )?,
    };
    let ed_on = gl.compile_program("ED Interlace On", shaders::ED_VERTEX, shaders::ED_INTERLACE_ON)?;
    let ed_off = gl.compile_program("ED Interlace Off", shaders::ED_VERTEX, shaders::ED_OFF)?;
    Ok(ProgramSet {
        row,
        col,
        chess,
        ed_on,
        ed_off,
    })
}
