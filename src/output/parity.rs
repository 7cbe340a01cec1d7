//! Pixel parity resolution: decides whether the left/right line assignment
//! must be swapped for the current device, window position and monitor.

use crate::geometry::RectI;
use crate::output::device::DeviceKind;

/// Folds the four independent reversal sources into the final flag by
/// successive XOR. Window-position oddness only matters in windowed mode
/// (fullscreen geometry is monitor-aligned) and only along the axes the
/// device actually interlaces.
pub fn is_pixel_reverse(
    device: DeviceKind,
    window: RectI,
    fullscreen: bool,
    monitor_reversed: bool,
    user_reverse: bool,
) -> bool {
    let mut reverse = false;
    if !fullscreen && window.bottom.rem_euclid(2) == 1 && device.uses_vertical_parity() {
        reverse = !reverse;
    }
    if !fullscreen && window.left.rem_euclid(2) == 1 && device.uses_horizontal_parity() {
        reverse = !reverse;
    }
    if monitor_reversed {
        reverse = !reverse;
    }
    if user_reverse {
        reverse = !reverse;
    }
    reverse
}
