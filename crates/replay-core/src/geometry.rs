//! Integer pixel rectangles for laying out regions of an output canvas.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` canvas.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(self) -> u32 {
        self.y + self.height
    }

    /// Area of the rectangle.
    #[inline]
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Check if two rectangles overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Compute intersection with another rectangle.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x1 < x2 && y1 < y2 {
            Some(Self::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    /// Cell `index` of a `columns` x `rows` grid laid over `self`, in reading order.
    ///
    /// Cells have equal integer size; leftover pixels on the right and bottom
    /// edges are not covered.
    pub fn grid_cell(self, columns: u32, rows: u32, index: u32) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let cell_width = self.width / columns;
        let cell_height = self.height / rows;
        let column = index % columns;
        let row = index / columns;
        Self::new(
            self.x + column * cell_width,
            self.y + row * cell_height,
            cell_width,
            cell_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(10, 10, 100, 50);
        assert!(r.contains(50, 30));
        assert!(!r.contains(5, 30));
        assert!(!r.contains(110, 30));
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        let i = a.intersection(b).unwrap();
        assert_eq!(i, Rect::new(50, 50, 50, 50));

        let c = Rect::new(200, 200, 10, 10);
        assert!(a.intersection(c).is_none());
        assert!(!a.overlaps(c));
    }

    #[test]
    fn test_grid_cells_reading_order() {
        let canvas = Rect::full(640, 480);
        assert_eq!(canvas.grid_cell(2, 2, 0), Rect::new(0, 0, 320, 240));
        assert_eq!(canvas.grid_cell(2, 2, 1), Rect::new(320, 0, 320, 240));
        assert_eq!(canvas.grid_cell(2, 2, 2), Rect::new(0, 240, 320, 240));
        assert_eq!(canvas.grid_cell(2, 2, 3), Rect::new(320, 240, 320, 240));
    }

    #[test]
    fn test_grid_cells_do_not_overlap() {
        let canvas = Rect::full(101, 77);
        let cells: Vec<Rect> = (0..9).map(|i| canvas.grid_cell(3, 3, i)).collect();
        for (i, a) in cells.iter().enumerate() {
            assert!(canvas.intersection(*a) == Some(*a));
            for b in &cells[i + 1..] {
                assert!(!a.overlaps(*b));
            }
        }
    }
}
