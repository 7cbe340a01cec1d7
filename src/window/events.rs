//! Discrete window messages and the deduplicating queue draining them to the
//! render thread once per frame.

use crate::geometry::PointD;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
    WheelUp,
    WheelDown,
}

/// Key codes used by the fixed-size key map. The low range mirrors the usual
/// virtual-key layout; media keys sit in the extended range.
pub mod keys {
    pub const F1: u8 = 0x70;
    pub const F2: u8 = 0x71;
    pub const F3: u8 = 0x72;
    pub const F4: u8 = 0x73;
    pub const MEDIA_NEXT_TRACK: u8 = 0xB0;
    pub const MEDIA_PREV_TRACK: u8 = 0xB1;
    pub const MEDIA_STOP: u8 = 0xB2;
    pub const MEDIA_PLAY_PAUSE: u8 = 0xB3;
}

/// Pressed-state for every key code. The window-owning thread writes it from
/// platform events; the consumer reads it while handling drained messages and
/// may clear individual entries (one-shot hotkeys do this).
#[derive(Debug, Clone)]
pub struct KeyMap {
    pressed: [bool; 256],
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            pressed: [false; 256],
        }
    }
}

impl KeyMap {
    pub fn is_pressed(&self, code: u8) -> bool {
        self.pressed[code as usize]
    }

    pub fn set(&mut self, code: u8, pressed: bool) {
        self.pressed[code as usize] = pressed;
    }

    /// Takes the pressed flag, clearing it. Media hotkeys never produce a
    /// release transition, so consumers reset them after acting.
    pub fn take(&mut self, code: u8) -> bool {
        std::mem::take(&mut self.pressed[code as usize])
    }

    /// Clears the whole map. Called on focus loss so keys do not stay stuck
    /// after a focus switch.
    pub fn reset(&mut self) {
        self.pressed = [false; 256];
    }
}

/// One drained window message.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    Resize,
    Close,
    FullscreenSwitch,
    NewMonitor,
    MouseMove,
    MouseDown { point: PointD, button: MouseButton },
    MouseUp { point: PointD, button: MouseButton },
    DragDropIn(Vec<PathBuf>),
    /// Application-level exit request forwarded through the same drain.
    Exit,
}

impl WindowEvent {
    /// Kinds carried as at-most-once flags rather than queued entries.
    fn coalesced_slot(&self) -> Option<usize> {
        match self {
            WindowEvent::Resize => Some(0),
            WindowEvent::Close => Some(1),
            WindowEvent::FullscreenSwitch => Some(2),
            WindowEvent::NewMonitor => Some(3),
            WindowEvent::MouseMove => Some(4),
            WindowEvent::Exit => Some(5),
            _ => None,
        }
    }
}

const COALESCED_KINDS: usize = 6;

#[derive(Default)]
struct Pending {
    flags: [bool; COALESCED_KINDS],
    mouse: Vec<WindowEvent>,
}

/// Thread-safe message sink. The producer appends from the window-owning
/// thread; the consumer drains everything exactly once per render frame.
/// Coalesced kinds collapse to a single entry per frame regardless of how
/// many times they fire. Critical sections only copy and clear.
#[derive(Default)]
pub struct EventQueue {
    pending: Mutex<Pending>,
    // Dropped file paths get their own lock: a new drop replaces any list
    // the consumer has not picked up yet.
    dropped: Mutex<Option<Vec<PathBuf>>>,
}

impl EventQueue {
    pub fn append(&self, event: WindowEvent) {
        match event {
            WindowEvent::DragDropIn(paths) => {
                *lock(&self.dropped) = Some(paths);
            }
            event => {
                let mut pending = lock(&self.pending);
                if let Some(slot) = event.coalesced_slot() {
                    pending.flags[slot] = true;
                } else {
                    pending.mouse.push(event);
                }
            }
        }
    }

    /// Atomically swaps the pending set into `out` and clears the internal
    /// state. Flag-kind entries come first, in a stable order, then the
    /// mouse queue in arrival order, then any pending drop list.
    pub fn pop_all(&self, out: &mut Vec<WindowEvent>) {
        out.clear();
        {
            let mut pending = lock(&self.pending);
            for (slot, set) in std::mem::take(&mut pending.flags).into_iter().enumerate() {
                if !set {
                    continue;
                }
                out.push(match slot {
                    0 => WindowEvent::Resize,
                    1 => WindowEvent::Close,
                    2 => WindowEvent::FullscreenSwitch,
                    3 => WindowEvent::NewMonitor,
                    4 => WindowEvent::MouseMove,
                    _ => WindowEvent::Exit,
                });
            }
            out.append(&mut pending.mouse);
        }
        if let Some(paths) = lock(&self.dropped).take() {
            out.push(WindowEvent::DragDropIn(paths));
        }
    }

    pub fn is_empty(&self) -> bool {
        let pending = lock(&self.pending);
        pending.mouse.is_empty()
            && !pending.flags.iter().any(|flag| *flag)
            && lock(&self.dropped).is_none()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_events_coalesce_within_one_frame() {
        let queue = EventQueue::default();
        queue.append(WindowEvent::Resize);
        queue.append(WindowEvent::Resize);
        queue.append(WindowEvent::Resize);

        let mut drained = Vec::new();
        queue.pop_all(&mut drained);
        assert_eq!(drained, vec![WindowEvent::Resize]);

        // Drain cleared everything.
        queue.pop_all(&mut drained);
        assert!(drained.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn mouse_events_are_queued_in_order() {
        let queue = EventQueue::default();
        let down = WindowEvent::MouseDown {
            point: PointD::new(0.5, 0.5),
            button: MouseButton::Left,
        };
        let up = WindowEvent::MouseUp {
            point: PointD::new(0.5, 0.5),
            button: MouseButton::Left,
        };
        queue.append(down.clone());
        queue.append(up.clone());

        let mut drained = Vec::new();
        queue.pop_all(&mut drained);
        assert_eq!(drained, vec![down, up]);
    }

    #[test]
    fn later_drop_replaces_pending_file_list() {
        let queue = EventQueue::default();
        queue.append(WindowEvent::DragDropIn(vec![PathBuf::from("a.mkv")]));
        queue.append(WindowEvent::DragDropIn(vec![PathBuf::from("b.mkv")]));

        let mut drained = Vec::new();
        queue.pop_all(&mut drained);
        assert_eq!(
            drained,
            vec![WindowEvent::DragDropIn(vec![PathBuf::from("b.mkv")])]
        );
    }

    #[test]
    fn key_map_take_clears_the_entry() {
        let mut keys = KeyMap::default();
        keys.set(keys::F2, true);
        assert!(keys.take(keys::F2));
        assert!(!keys.is_pressed(keys::F2));
    }

    #[test]
    fn key_map_reset_releases_everything() {
        let mut keys = KeyMap::default();
        keys.set(0x41, true);
        keys.set(keys::MEDIA_PLAY_PAUSE, true);
        keys.reset();
        assert!(!keys.is_pressed(0x41));
        assert!(!keys.is_pressed(keys::MEDIA_PLAY_PAUSE));
    }
}
