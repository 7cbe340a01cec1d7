//! Interlaced output device kinds and the selectable device list.

use crate::monitor::{Monitor, find_interlaced_monitor};
use serde::{Deserialize, Serialize};

/// Pixel-interlacing scheme of the attached stereo display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Row-interlaced panel (Zalman, Hyundai and similar).
    #[default]
    Row,
    /// Column-interlaced panel.
    Col,
    /// DLP TV chessboard pattern.
    Chess,
    /// Row-interlaced panel driven through the eDimensional shutter-glasses
    /// control-code protocol.
    RowEd,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 4] = [
        DeviceKind::Row,
        DeviceKind::Col,
        DeviceKind::Chess,
        DeviceKind::RowEd,
    ];

    /// Stable identifier used for persistence and device selection.
    pub fn id(self) -> &'static str {
        match self {
            DeviceKind::Row => "Row",
            DeviceKind::Col => "Col",
            DeviceKind::Chess => "Chess",
            DeviceKind::RowEd => "RowED",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "Row" => Some(DeviceKind::Row),
            "Col" => Some(DeviceKind::Col),
            "Chess" => Some(DeviceKind::Chess),
            "RowED" => Some(DeviceKind::RowEd),
            _ => None,
        }
    }

    /// Whether the window's vertical pixel offset flips row order.
    pub fn uses_vertical_parity(self) -> bool {
        matches!(self, DeviceKind::Row | DeviceKind::Chess | DeviceKind::RowEd)
    }

    /// Whether the window's horizontal pixel offset flips column order.
    pub fn uses_horizontal_parity(self) -> bool {
        matches!(self, DeviceKind::Col | DeviceKind::Chess)
    }

    pub fn drives_ed_signal(self) -> bool {
        matches!(self, DeviceKind::RowEd)
    }
}

/// How strongly a device matches the current display configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SupportPriority {
    None,
    High,
}

/// One selectable output device presented to the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    pub name: &'static str,
    pub desc: &'static str,
    pub priority: SupportPriority,
}

/// Builds the device list, raising the row-interlaced priority when a known
/// interlaced panel is attached.
pub fn device_list(monitors: &[Monitor]) -> Vec<DeviceInfo> {
    let row_priority = if find_interlaced_monitor(monitors).is_some() {
        SupportPriority::High
    } else {
        SupportPriority::None
    };
    vec![
        DeviceInfo {
            kind: DeviceKind::Row,
            name: "Row Interlaced",
            desc: "Row interlaced displays: Zalman, Hyundai,...",
            priority: row_priority,
        },
        DeviceInfo {
            kind: DeviceKind::Col,
            name: "Column Interlaced",
            desc: "Column interlaced displays",
            priority: SupportPriority::None,
        },
        DeviceInfo {
            kind: DeviceKind::Chess,
            name: "DLP TV (chessboard)",
            desc: "DLP TV (chessboard)",
            priority: SupportPriority::None,
        },
        DeviceInfo {
            kind: DeviceKind::RowEd,
            name: "Interlaced ED",
            desc: "EDimensional in interlaced mode",
            priority: SupportPriority::None,
        },
    ]
}
