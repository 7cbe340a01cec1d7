//! Window placement state shared between the window-owning thread and the
//! render thread, and the tiled master/slave layout rules.

use crate::geometry::{PointI, RectI};
use std::sync::{Arc, Mutex};

/// Relationship between the master and slave rectangles when both windows are
/// visible and adjacent. Determines the slave rectangle and how mouse
/// coordinates map back onto the master sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiledConfig {
    #[default]
    Separate,
    MasterSlaveX,
    SlaveMasterX,
    MasterSlaveY,
    SlaveMasterY,
}

impl TiledConfig {
    /// Selects the tiling relation from the two rectangles. Tiles require a
    /// shared edge: same top row and adjoining vertical edges for the X
    /// configurations, same left column and adjoining horizontal edges for
    /// the Y configurations. Anything else is `Separate`.
    pub fn select(master: RectI, slave: RectI) -> Self {
        if master.top == slave.top {
            if master.right == slave.left {
                return TiledConfig::MasterSlaveX;
            }
            if master.left == slave.right {
                return TiledConfig::SlaveMasterX;
            }
        } else if master.left == slave.left {
            if master.bottom == slave.top {
                return TiledConfig::MasterSlaveY;
            }
            if master.top == slave.bottom {
                return TiledConfig::SlaveMasterY;
            }
        }
        TiledConfig::Separate
    }

    /// Shifts a pixel position from the combined tile surface into master
    /// window coordinates. Only the slave-first configurations need it.
    pub fn adjust_point(self, master: RectI, x: i32, y: i32) -> (i32, i32) {
        match self {
            TiledConfig::SlaveMasterX => (x - master.width(), y),
            TiledConfig::SlaveMasterY => (x, y - master.height()),
            _ => (x, y),
        }
    }
}

/// Live placement: a normal (restored) rectangle and a fullscreen rectangle,
/// with a flag selecting which one is current. Mutated by the window-owning
/// thread, read by the render thread; always accessed through [`SharedPlacement`].
#[derive(Debug, Clone)]
pub struct PlacementState {
    pub normal: RectI,
    pub fullscreen: RectI,
    pub is_fullscreen: bool,
    pub tiled: TiledConfig,
    /// Id of the monitor currently hosting the window center.
    pub monitor_id: i32,
}

impl PlacementState {
    pub fn new(normal: RectI) -> Self {
        Self {
            normal,
            fullscreen: normal,
            is_fullscreen: false,
            tiled: TiledConfig::Separate,
            monitor_id: 0,
        }
    }

    /// The rectangle the GL drawable currently covers.
    pub fn current_rect(&self) -> RectI {
        if self.is_fullscreen {
            self.fullscreen
        } else {
            self.normal
        }
    }

    pub fn center(&self) -> PointI {
        self.current_rect().center()
    }
}

/// Mutex-guarded placement snapshot shared across both threads. The platform
/// source mutated this rectangle unsynchronized; every access here goes
/// through the lock.
#[derive(Clone)]
pub struct SharedPlacement {
    inner: Arc<Mutex<PlacementState>>,
}

impl SharedPlacement {
    pub fn new(normal: RectI) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlacementState::new(normal))),
        }
    }

    pub fn snapshot(&self) -> PlacementState {
        self.lock().clone()
    }

    pub fn current_rect(&self) -> RectI {
        self.lock().current_rect()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.lock().is_fullscreen
    }

    pub fn with<R>(&self, op: impl FnOnce(&mut PlacementState) -> R) -> R {
        op(&mut self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlacementState> {
        // A poisoned placement lock means a thread panicked mid-update;
        // the rectangle itself is still a consistent value.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master() -> RectI {
        RectI::from_size(0, 0, 1920, 1080)
    }

    #[test]
    fn adjoining_right_edge_selects_master_slave_x() {
        let slave = RectI::from_size(1920, 0, 1920, 1080);
        assert_eq!(TiledConfig::select(master(), slave), TiledConfig::MasterSlaveX);
    }

    #[test]
    fn adjoining_left_edge_selects_slave_master_x() {
        let slave = RectI::from_size(-1920, 0, 1920, 1080);
        assert_eq!(TiledConfig::select(master(), slave), TiledConfig::SlaveMasterX);
    }

    #[test]
    fn stacked_rectangles_select_y_configurations() {
        let below = RectI::from_size(0, 1080, 1920, 1080);
        let above = RectI::from_size(0, -1080, 1920, 1080);
        assert_eq!(TiledConfig::select(master(), below), TiledConfig::MasterSlaveY);
        assert_eq!(TiledConfig::select(master(), above), TiledConfig::SlaveMasterY);
    }

    #[test]
    fn no_shared_edge_keeps_windows_separate() {
        let detached = RectI::from_size(2000, 200, 1920, 1080);
        assert_eq!(TiledConfig::select(master(), detached), TiledConfig::Separate);
    }

    #[test]
    fn slave_first_tiles_shift_mouse_coordinates() {
        let rect = master();
        assert_eq!(
            TiledConfig::SlaveMasterX.adjust_point(rect, 2000, 500),
            (80, 500)
        );
        assert_eq!(
            TiledConfig::SlaveMasterY.adjust_point(rect, 500, 1200),
            (500, 120)
        );
        assert_eq!(
            TiledConfig::MasterSlaveX.adjust_point(rect, 500, 500),
            (500, 500)
        );
    }

    #[test]
    fn current_rect_follows_fullscreen_flag() {
        let shared = SharedPlacement::new(RectI::from_size(100, 100, 800, 600));
        shared.with(|state| {
            state.fullscreen = RectI::from_size(0, 0, 1920, 1080);
            state.is_fullscreen = true;
        });
        assert_eq!(shared.current_rect(), RectI::from_size(0, 0, 1920, 1080));
        shared.with(|state| state.is_fullscreen = false);
        assert_eq!(shared.current_rect(), RectI::from_size(100, 100, 800, 600));
    }
}
