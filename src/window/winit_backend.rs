//! Translation layer from winit events to the platform-neutral event set.
//!
//! This does not own an event loop; winit restricts loop ownership to the
//! main thread, which conflicts with the dedicated window-owning thread.
//! Embedders that already run winit feed its events through the translator
//! and hand the results to a [`PlatformBackend`](super::platform::PlatformBackend)
//! event feed.

use crate::geometry::RectI;
use crate::monitor::Monitor;
use crate::window::events::{MouseButton, keys};
use crate::window::platform::PlatformEvent;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent as WinitWindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Stateful translator: tracks the cursor and window origin so wheel events
/// can be reported in desktop coordinates.
#[derive(Debug, Default)]
pub struct WinitEventTranslator {
    cursor: (i32, i32),
    origin: (i32, i32),
}

impl WinitEventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates one winit window event. Events without a counterpart in
    /// the platform-neutral set yield `None`.
    pub fn translate(&mut self, event: &WinitWindowEvent) -> Option<PlatformEvent> {
        match event {
            WinitWindowEvent::Focused(true) => Some(PlatformEvent::FocusGained),
            WinitWindowEvent::Focused(false) => Some(PlatformEvent::FocusLost),
            WinitWindowEvent::CloseRequested => Some(PlatformEvent::CloseRequested),
            WinitWindowEvent::Moved(position) => {
                self.origin = (position.x, position.y);
                Some(PlatformEvent::Moved {
                    x: position.x,
                    y: position.y,
                })
            }
            WinitWindowEvent::Resized(size) => Some(PlatformEvent::Resized {
                width: size.width as i32,
                height: size.height as i32,
            }),
            WinitWindowEvent::DroppedFile(path) => {
                Some(PlatformEvent::FilesDropped(vec![path.clone()]))
            }
            WinitWindowEvent::KeyboardInput { event, .. } => {
                let code = key_code(&event.physical_key)?;
                Some(match event.state {
                    ElementState::Pressed => PlatformEvent::KeyDown(code),
                    ElementState::Released => PlatformEvent::KeyUp(code),
                })
            }
            WinitWindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as i32, position.y as i32);
                Some(PlatformEvent::MouseMoved {
                    x: self.cursor.0,
                    y: self.cursor.1,
                })
            }
            WinitWindowEvent::MouseInput { state, button, .. } => {
                let button = mouse_button(*button)?;
                Some(PlatformEvent::MouseButton {
                    x: self.cursor.0,
                    y: self.cursor.1,
                    button,
                    pressed: matches!(state, ElementState::Pressed),
                })
            }
            WinitWindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => f64::from(*y),
                    MouseScrollDelta::PixelDelta(position) => position.y,
                };
                if amount == 0.0 {
                    return None;
                }
                Some(PlatformEvent::Wheel {
                    x: self.origin.0 + self.cursor.0,
                    y: self.origin.1 + self.cursor.1,
                    up: amount > 0.0,
                })
            }
            _ => None,
        }
    }
}

fn mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        winit::event::MouseButton::Back => Some(MouseButton::X1),
        winit::event::MouseButton::Forward => Some(MouseButton::X2),
        winit::event::MouseButton::Other(_) => None,
    }
}

fn key_code(key: &PhysicalKey) -> Option<u8> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    Some(match code {
        KeyCode::F1 => keys::F1,
        KeyCode::F2 => keys::F2,
        KeyCode::F3 => keys::F3,
        KeyCode::F4 => keys::F4,
        KeyCode::MediaTrackNext => keys::MEDIA_NEXT_TRACK,
        KeyCode::MediaTrackPrevious => keys::MEDIA_PREV_TRACK,
        KeyCode::MediaStop => keys::MEDIA_STOP,
        KeyCode::MediaPlayPause => keys::MEDIA_PLAY_PAUSE,
        KeyCode::Escape => 0x1B,
        KeyCode::Enter => 0x0D,
        KeyCode::Space => 0x20,
        KeyCode::ArrowLeft => 0x25,
        KeyCode::ArrowUp => 0x26,
        KeyCode::ArrowRight => 0x27,
        KeyCode::ArrowDown => 0x28,
        _ => return None,
    })
}

/// Converts an enumerated winit monitor into the crate's monitor record.
/// winit does not expose EDID PnP identifiers, so interlaced-panel detection
/// stays disabled for translated monitors unless the embedder fills it in.
pub fn monitor_from_handle(id: i32, handle: &winit::monitor::MonitorHandle) -> Monitor {
    let position = handle.position();
    let size = handle.size();
    Monitor::new(
        id,
        RectI::from_size(
            position.x,
            position.y,
            size.width as i32,
            size.height as i32,
        ),
        "",
    )
}
