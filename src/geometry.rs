use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world units, origin at the bottom-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Touching edges count. Used for camera culling.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() < other.x
            || self.top() < other.y
            || other.right() < self.x
            || other.top() < self.y)
    }

    /// Shared edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.top() && other.y < self.top()
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.top()
    }
}

/// Integer rectangle used by the pixel test. `right`/`top` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub top: i32,
}

impl PixelRect {
    pub fn new(left: i32, bottom: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            bottom,
            right: left.saturating_add(width as i32),
            top: bottom.saturating_add(height as i32),
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.top - self.bottom
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    pub fn intersection(&self, other: &PixelRect) -> Option<PixelRect> {
        let left = self.left.max(other.left);
        let bottom = self.bottom.max(other.bottom);
        let right = self.right.min(other.right);
        let top = self.top.min(other.top);
        if left < right && bottom < top {
            Some(PixelRect {
                left,
                bottom,
                right,
                top,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_pixel_rects_do_not_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(10, 10, 10, 10);
        assert_eq!(a.intersection(&b), None);
        let c = PixelRect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&c), Some(PixelRect::new(5, 5, 5, 5)));
    }

    #[test]
    fn world_rects_touching_edges_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(!a.overlaps(&Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(a.overlaps(&Rect::new(9.5, 0.0, 5.0, 5.0)));
        assert!(!a.intersects(&Rect::new(10.5, 0.0, 5.0, 5.0)));
        assert!(a.contains_point(10.0, 10.0));
        assert!(!a.contains_point(-0.1, 3.0));
    }
}
