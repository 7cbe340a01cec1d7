//! Pure translation of platform events into queue messages and backend
//! actions. Keeping this free of platform calls makes the per-message rules
//! testable without a message pump.

use crate::geometry::PointD;
use crate::window::attributes::WindowAttributes;
use crate::window::events::{KeyMap, WindowEvent, keys};
use crate::window::placement::PlacementState;
use crate::window::platform::{FrameMetrics, MediaKey, PlatformEvent};

/// Cursor displacement (normalized units) below which motion is ignored.
const MOUSE_MOVE_THRESHOLD: f64 = 0.0008;

/// Side effects the window thread must apply after handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchAction {
    Enqueue(WindowEvent),
    /// The platform's maximize was intercepted; enter fullscreen instead.
    EnterFullscreen,
    /// A sleep/screensaver request was swallowed.
    SuppressSleep,
    SetInputFocus,
    CaptureInput,
    ReleaseCapture,
    /// Display configuration changed; the monitor list must be refreshed.
    MonitorsChanged,
}

/// Immutable context of a dispatch round.
#[derive(Debug, Clone, Copy)]
pub struct DispatchInput<'a> {
    pub attributes: &'a WindowAttributes,
    pub frame: FrameMetrics,
    /// An external native parent owns the placement; rect updates from the
    /// platform are ignored then.
    pub has_parent: bool,
}

pub fn handle_platform_event(
    input: &DispatchInput<'_>,
    placement: &mut PlacementState,
    key_map: &mut KeyMap,
    last_mouse: &mut PointD,
    event: PlatformEvent,
) -> Vec<DispatchAction> {
    let mut actions = Vec::new();
    match event {
        PlatformEvent::FocusLost => {
            // Focus switch would otherwise leave pressed keys stuck.
            key_map.reset();
        }
        PlatformEvent::FocusGained => {}
        PlatformEvent::SysMaximize => {
            actions.push(DispatchAction::EnterFullscreen);
        }
        PlatformEvent::SysScreensaver => {
            if input.attributes.block_sleep_display {
                actions.push(DispatchAction::SuppressSleep);
            }
        }
        PlatformEvent::CloseRequested => {
            // Destruction is the owning application's decision.
            actions.push(DispatchAction::Enqueue(WindowEvent::Close));
        }
        PlatformEvent::Moved { x, y } => {
            if !placement.is_fullscreen && !input.has_parent {
                let width = placement.normal.width();
                let height = placement.normal.height();
                placement.normal.left = x;
                placement.normal.top = y;
                placement.normal.right = x + width;
                placement.normal.bottom = y + height;
                actions.push(DispatchAction::Enqueue(WindowEvent::Resize));
            }
        }
        PlatformEvent::Resized { width, height } => {
            if !placement.is_fullscreen && !input.has_parent {
                placement.normal.right = placement.normal.left + width;
                placement.normal.bottom = placement.normal.top + height;
                actions.push(DispatchAction::Enqueue(WindowEvent::Resize));
            }
        }
        PlatformEvent::SizingFrame { rect } => {
            if !placement.is_fullscreen && !input.has_parent {
                // The platform reports the outer frame while sizing is in
                // progress; compensate for decoration thickness.
                let frame = input.frame;
                placement.normal.left = rect.left + frame.frame_x;
                placement.normal.right = rect.right - frame.frame_x;
                placement.normal.top = rect.top + frame.frame_y + frame.caption_y;
                placement.normal.bottom = rect.bottom - frame.frame_y;
                actions.push(DispatchAction::Enqueue(WindowEvent::Resize));
            }
        }
        PlatformEvent::FilesDropped(paths) => {
            if !paths.is_empty() {
                actions.push(DispatchAction::Enqueue(WindowEvent::DragDropIn(paths)));
            }
        }
        PlatformEvent::KeyDown(code) => {
            key_map.set(code, true);
        }
        PlatformEvent::KeyUp(code) => {
            key_map.set(code, false);
        }
        PlatformEvent::MediaKey(key) => {
            // Press only; hotkey consumers reset the flag themselves.
            key_map.set(media_key_code(key), true);
        }
        PlatformEvent::MouseButton {
            x,
            y,
            button,
            pressed,
        } => {
            let point = normalized_button_point(placement, x, y);
            if pressed {
                // Focus + capture so the matching release arrives even when
                // the cursor leaves the window.
                actions.push(DispatchAction::SetInputFocus);
                actions.push(DispatchAction::CaptureInput);
                actions.push(DispatchAction::Enqueue(WindowEvent::MouseDown {
                    point,
                    button,
                }));
            } else {
                actions.push(DispatchAction::ReleaseCapture);
                actions.push(DispatchAction::Enqueue(WindowEvent::MouseUp {
                    point,
                    button,
                }));
            }
        }
        PlatformEvent::Wheel { x, y, up } => {
            // Wheel coordinates arrive desktop-relative. A wheel tick is a
            // synthesized click pair; the delta magnitude is ignored.
            let rect = placement.current_rect();
            let point = normalize(
                x - rect.left,
                y - rect.top,
                rect.width(),
                rect.height(),
            );
            let button = if up {
                crate::window::events::MouseButton::WheelUp
            } else {
                crate::window::events::MouseButton::WheelDown
            };
            actions.push(DispatchAction::Enqueue(WindowEvent::MouseDown {
                point,
                button,
            }));
            actions.push(DispatchAction::Enqueue(WindowEvent::MouseUp {
                point,
                button,
            }));
        }
        PlatformEvent::MouseMoved { x, y } => {
            let rect = placement.current_rect();
            let point = normalize(x, y, rect.width(), rect.height());
            if point.is_inside_unit() {
                let moved = (point.x - last_mouse.x).abs() >= MOUSE_MOVE_THRESHOLD
                    || (point.y - last_mouse.y).abs() >= MOUSE_MOVE_THRESHOLD;
                if moved {
                    actions.push(DispatchAction::Enqueue(WindowEvent::MouseMove));
                }
            }
            *last_mouse = point;
        }
        PlatformEvent::DisplayChanged => {
            actions.push(DispatchAction::MonitorsChanged);
        }
    }
    actions
}

fn media_key_code(key: MediaKey) -> u8 {
    match key {
        MediaKey::Stop => keys::MEDIA_STOP,
        MediaKey::PlayPause => keys::MEDIA_PLAY_PAUSE,
        MediaKey::PrevTrack => keys::MEDIA_PREV_TRACK,
        MediaKey::NextTrack => keys::MEDIA_NEXT_TRACK,
    }
}

/// Button coordinates are client-relative to the combined tile surface;
/// shift them into the master tile before normalizing.
fn normalized_button_point(placement: &PlacementState, x: i32, y: i32) -> PointD {
    let rect = placement.current_rect();
    let (x, y) = placement.tiled.adjust_point(rect, x, y);
    normalize(x, y, rect.width(), rect.height())
}

fn normalize(x: i32, y: i32, width: i32, height: i32) -> PointD {
    PointD::new(
        f64::from(x) / f64::from(width.max(1)),
        f64::from(y) / f64::from(height.max(1)),
    )
}
