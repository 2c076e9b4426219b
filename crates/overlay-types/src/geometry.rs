use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Screen rectangle of a window or overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub origin: Point,
    pub size: Size,
}

impl Bounds {
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Top-right anchored placement of `overlay` inside `self`, inset by `margin`.
    pub fn anchor_top_right(&self, overlay: Size, margin: i32) -> Point {
        let right = self.origin.x + self.size.width as i32;
        Point::new(
            (right - overlay.width as i32 - margin).max(self.origin.x),
            self.origin.y + margin,
        )
    }
}

pub const DEFAULT_OVERLAY_POSITION: Point = Point::new(100, 100);
pub const DEFAULT_OVERLAY_SIZE: Size = Size::new(400, 600);
pub const TARGET_WINDOW_MARGIN: i32 = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_overlay_inside_target_window() {
        let target = Bounds::new(Point::new(0, 0), Size::new(1920, 1080));
        let point = target.anchor_top_right(DEFAULT_OVERLAY_SIZE, TARGET_WINDOW_MARGIN);
        assert_eq!(point, Point::new(1500, 20));
    }

    #[test]
    fn anchor_never_leaves_left_edge() {
        let target = Bounds::new(Point::new(50, 10), Size::new(200, 200));
        let point = target.anchor_top_right(DEFAULT_OVERLAY_SIZE, TARGET_WINDOW_MARGIN);
        assert_eq!(point, Point::new(50, 30));
    }
}
