use serde::{Deserialize, Serialize};

/// Integer rectangle in desktop coordinates. `right >= left` and
/// `bottom >= top` hold for every rectangle produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectI {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl RectI {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> PointI {
        PointI {
            x: self.left + self.width() / 2,
            y: self.top + self.height() / 2,
        }
    }

    pub fn contains(&self, point: PointI) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    pub fn is_valid(&self) -> bool {
        self.right >= self.left && self.bottom >= self.top
    }
}

impl Default for RectI {
    fn default() -> Self {
        Self::from_size(256, 256, 1024, 512)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointI {
    pub x: i32,
    pub y: i32,
}

impl PointI {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Position normalized to the 0..1 x 0..1 range of the owning sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointD {
    pub x: f64,
    pub y: f64,
}

impl PointD {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_inside_unit(&self) -> bool {
        self.x >= 0.0 && self.x <= 1.0 && self.y >= 0.0 && self.y <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_dimensions_and_center() {
        let rect = RectI::from_size(10, 20, 100, 50);
        assert_eq!(rect.right, 110);
        assert_eq!(rect.bottom, 70);
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 50);
        assert_eq!(rect.center(), PointI::new(60, 45));
    }

    #[test]
    fn rect_containment_is_half_open() {
        let rect = RectI::from_size(0, 0, 10, 10);
        assert!(rect.contains(PointI::new(0, 0)));
        assert!(rect.contains(PointI::new(9, 9)));
        assert!(!rect.contains(PointI::new(10, 0)));
        assert!(!rect.contains(PointI::new(0, 10)));
    }
}
