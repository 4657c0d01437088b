//! Review mode interface.

use crate::composites::SlowMotion;
use crate::config::CompositeType;
use crate::subframe::Subframe;
use replay_core::{ImageDescriptor, Rect};

/// A review mode: lays subframes over the canvas and decides, per tick,
/// whether the canvas must be redrawn.
pub trait DelayComposite: Send {
    /// Human-readable mode name.
    fn name(&self) -> &str;

    fn composite_type(&self) -> CompositeType;

    /// Recompute subframe bounds and initial ages for a new canvas or history depth.
    fn update_subframes(&mut self, descriptor: &ImageDescriptor, total_frames: usize);

    /// Advance to display tick `tick`; `current_position` is the newest
    /// position of the delay buffer.
    fn tick(&mut self, tick: u64, current_position: i64);

    /// Whether the last tick requires the canvas to be redrawn.
    fn needs_refresh(&self) -> bool;

    fn subframes(&self) -> &[Subframe];

    fn subframes_mut(&mut self) -> &mut [Subframe];

    /// Age shown by subframe `index`, or `None` if it should be skipped.
    fn age(&mut self, index: usize, current_position: i64) -> Option<usize> {
        self.subframes_mut().get_mut(index)?.age(current_position)
    }

    fn as_slow_motion(&self) -> Option<&SlowMotion> {
        None
    }

    fn as_slow_motion_mut(&mut self) -> Option<&mut SlowMotion> {
        None
    }
}

/// Near-square grid of `count` tiles over the canvas, in reading order.
///
/// The grid has `ceil(sqrt(count))` columns and as many rows as needed.
pub fn grid_layout(descriptor: &ImageDescriptor, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }

    let columns = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(columns);
    let canvas = Rect::full(descriptor.width, descriptor.height);
    (0..count)
        .map(|i| canvas.grid_cell(columns as u32, rows as u32, i as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_core::PixelFormat;

    #[test]
    fn test_grid_layout_square() {
        let descriptor = ImageDescriptor::new(PixelFormat::Rgb24, 640, 480);
        let tiles = grid_layout(&descriptor, 4);
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[3], Rect::new(320, 240, 320, 240));
    }

    #[test]
    fn test_grid_layout_uneven() {
        let descriptor = ImageDescriptor::new(PixelFormat::Rgb24, 300, 200);
        let tiles = grid_layout(&descriptor, 5);
        // 3 columns, 2 rows
        assert_eq!(tiles[0], Rect::new(0, 0, 100, 100));
        assert_eq!(tiles[4], Rect::new(100, 100, 100, 100));
        assert!(grid_layout(&descriptor, 0).is_empty());
    }

    #[test]
    fn test_grid_layout_single_tile_is_full_canvas() {
        let descriptor = ImageDescriptor::new(PixelFormat::Gray8, 33, 17);
        assert_eq!(grid_layout(&descriptor, 1), vec![Rect::full(33, 17)]);
    }
}
