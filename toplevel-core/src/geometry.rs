//! Rectangles and window gravity.

use std::cmp;

use dpi::{PhysicalPosition, PhysicalSize};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Friendly neighborhood axis-aligned rectangle, in root window coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }

    /// A rectangle of the given size at the origin.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Rect { x: 0, y: 0, width, height }
    }

    #[inline]
    pub fn origin(&self) -> PhysicalPosition<i32> {
        PhysicalPosition::new(self.x, self.y)
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<i32> {
        PhysicalSize::new(self.width, self.height)
    }

    /// Whether the point lies inside the half-open rectangle.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        x >= self.x as i64
            && x < self.x as i64 + self.width as i64
            && y >= self.y as i64
            && y < self.y as i64 + self.height as i64
    }

    pub fn overlapping_area(&self, other: &Self) -> i64 {
        let x_overlap = cmp::max(
            0,
            cmp::min(self.x as i64 + self.width as i64, other.x as i64 + other.width as i64)
                - cmp::max(self.x, other.x) as i64,
        );
        let y_overlap = cmp::max(
            0,
            cmp::min(self.y as i64 + self.height as i64, other.y as i64 + other.height as i64)
                - cmp::max(self.y, other.y) as i64,
        );
        x_overlap * y_overlap
    }

    /// The common part of both rectangles, `None` if they do not overlap.
    pub fn intersection(&self, other: &Self) -> Option<Rect> {
        let x = cmp::max(self.x, other.x);
        let y = cmp::max(self.y, other.y);
        let right = cmp::min(
            self.x.saturating_add(self.width),
            other.x.saturating_add(other.width),
        );
        let bottom = cmp::min(
            self.y.saturating_add(self.height),
            other.y.saturating_add(other.height),
        );

        if right > x && bottom > y {
            Some(Rect { x, y, width: right - x, height: bottom - y })
        } else {
            None
        }
    }

    /// The point in the middle of the rectangle.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

impl From<(PhysicalPosition<i32>, PhysicalSize<i32>)> for Rect {
    fn from((position, size): (PhysicalPosition<i32>, PhysicalSize<i32>)) -> Self {
        Rect::new(position.x, position.y, size.width, size.height)
    }
}

/// The reference point of a window that a requested position refers to.
///
/// The numeric values match the ICCCM `win_gravity` encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Gravity {
    #[default]
    NorthWest = 1,
    North = 2,
    NorthEast = 3,
    West = 4,
    Center = 5,
    East = 6,
    SouthWest = 7,
    South = 8,
    SouthEast = 9,
    /// The position refers to the client area itself, ignoring decorations.
    Static = 10,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_point_is_half_open() {
        let rect = Rect::new(10, 10, 100, 50);
        assert!(rect.contains_point(10, 10));
        assert!(rect.contains_point(109, 59));
        assert!(!rect.contains_point(110, 59));
        assert!(!rect.contains_point(9, 30));
    }

    #[test]
    fn overlap_and_intersection_agree() {
        let a = Rect::new(0, 0, 1920, 1080);
        let b = Rect::new(1800, 1000, 400, 400);
        assert_eq!(a.overlapping_area(&b), 120 * 80);
        assert_eq!(a.intersection(&b), Some(Rect::new(1800, 1000, 120, 80)));

        let c = Rect::new(1920, 0, 10, 10);
        assert_eq!(a.overlapping_area(&c), 0);
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn dpi_round_trip() {
        let rect = Rect::new(-5, 7, 30, 40);
        assert_eq!(Rect::from((rect.origin(), rect.size())), rect);
    }
}
