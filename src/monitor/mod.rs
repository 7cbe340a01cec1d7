//! Physical display enumeration and the database of known interlaced panels.

use crate::geometry::{PointI, RectI};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One attached display as reported by the platform: a rectangle on the
/// virtual desktop, a stable integer id and the EDID plug-and-play identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub id: i32,
    pub virtual_rect: RectI,
    pub pnp_id: String,
}

impl Monitor {
    pub fn new(id: i32, virtual_rect: RectI, pnp_id: impl Into<String>) -> Self {
        Self {
            id,
            virtual_rect,
            pnp_id: pnp_id.into(),
        }
    }
}

/// Ordered list of attached monitors, queried by screen-point containment.
pub trait MonitorRegistry: Send {
    fn monitors(&self) -> &[Monitor];

    /// Resolves which monitor a desktop point falls on; falls back to the
    /// first monitor when the point is outside every virtual rectangle.
    fn monitor_at(&self, point: PointI) -> Option<&Monitor> {
        let list = self.monitors();
        list.iter()
            .find(|mon| mon.virtual_rect.contains(point))
            .or_else(|| list.first())
    }
}

/// Fixed snapshot of the display configuration. Production code refreshes it
/// on display-change events; tests construct it directly.
#[derive(Debug, Clone, Default)]
pub struct StaticMonitorRegistry {
    monitors: Vec<Monitor>,
}

impl StaticMonitorRegistry {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        Self { monitors }
    }

    pub fn replace(&mut self, monitors: Vec<Monitor>) {
        self.monitors = monitors;
    }
}

impl MonitorRegistry for StaticMonitorRegistry {
    fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }
}

/// Known interlaced-panel models mapped to their native row order.
/// The flag is true when the panel displays rows in reversed order.
static KNOWN_INTERLACED_MONITORS: Lazy<HashMap<&'static str, bool>> = Lazy::new(|| {
    HashMap::from([
        ("ZMT1900", false), // Zalman Trimon M190S
        ("ZMT2200", false), // Zalman Trimon M220W
        ("ENV2373", true),  // Envision
        ("HIT8002", false), // Hyundai W220S D-Sub
        ("HIT8D02", false), // Hyundai W220S DVID
        ("HIT7003", false), // Hyundai W240S D-Sub
        ("HIT7D03", false), // Hyundai W240S DVID
        ("ACI27C2", false), // ASUS VG27AH
    ])
});

/// Checks the monitor against the known-panel table. PnP identifiers are
/// always 7 characters; other lengths skip the table entirely.
pub fn is_interlaced_monitor(monitor: &Monitor) -> Option<bool> {
    if monitor.pnp_id.len() != 7 {
        return None;
    }
    KNOWN_INTERLACED_MONITORS
        .get(monitor.pnp_id.as_str())
        .copied()
}

/// Scans the attached monitor list for the first known interlaced panel and
/// returns it together with its row-reversal flag.
pub fn find_interlaced_monitor(monitors: &[Monitor]) -> Option<(&Monitor, bool)> {
    monitors
        .iter()
        .find_map(|mon| is_interlaced_monitor(mon).map(|reversed| (mon, reversed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mon(id: i32, left: i32, pnp: &str) -> Monitor {
        Monitor::new(id, RectI::from_size(left, 0, 1920, 1080), pnp)
    }

    #[test]
    fn zalman_panel_is_interlaced_and_not_reversed() {
        let monitor = mon(0, 0, "ZMT1900");
        assert_eq!(is_interlaced_monitor(&monitor), Some(false));
    }

    #[test]
    fn envision_panel_reports_reversed_rows() {
        let monitor = mon(0, 0, "ENV2373");
        assert_eq!(is_interlaced_monitor(&monitor), Some(true));
    }

    #[test]
    fn short_pnp_id_skips_the_table() {
        // 6 characters: length guard rejects before any lookup.
        let monitor = mon(0, 0, "ZMT190");
        assert_eq!(is_interlaced_monitor(&monitor), None);
    }

    #[test]
    fn scan_returns_first_supported_panel() {
        let monitors = vec![mon(0, 0, "DEL4099"), mon(1, 1920, "HIT8002")];
        let (found, reversed) = find_interlaced_monitor(&monitors).expect("panel in list");
        assert_eq!(found.id, 1);
        assert!(!reversed);
    }

    #[test]
    fn scan_without_supported_panel_returns_none() {
        let monitors = vec![mon(0, 0, "DEL4099")];
        assert!(find_interlaced_monitor(&monitors).is_none());
    }

    #[test]
    fn point_lookup_resolves_monitor_and_falls_back_to_first() {
        let registry = StaticMonitorRegistry::new(vec![mon(0, 0, "DEL4099"), mon(1, 1920, "ZMT1900")]);
        assert_eq!(registry.monitor_at(PointI::new(2000, 500)).unwrap().id, 1);
        assert_eq!(registry.monitor_at(PointI::new(-5000, 0)).unwrap().id, 0);
    }
}
