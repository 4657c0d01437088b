use crate::composite::{grid_layout, DelayComposite};
use crate::config::CompositeType;
use crate::subframe::{ConstantSubframe, Subframe};
use replay_core::ImageDescriptor;

/// Mosaic of past frames, redrawn only twice per history length.
///
/// Tiles are laid out in reading order with the oldest frame first, so the
/// motion reads left to right, top to bottom.
#[derive(Debug, Clone)]
pub struct FrozenMosaic {
    count: usize,
    start: usize,
    /// Configured spacing between tiles; 0 spreads tiles over the history.
    interval: usize,
    period: u64,
    needs_refresh: bool,
    subframes: Vec<Subframe>,
}

impl FrozenMosaic {
    pub fn new(count: usize, start: usize, interval: usize) -> Self {
        Self {
            count: count.max(1),
            start,
            interval,
            period: 1,
            needs_refresh: true,
            subframes: Vec::new(),
        }
    }

    /// Ticks between two redraws.
    pub fn period(&self) -> u64 {
        self.period
    }
}

impl Default for FrozenMosaic {
    fn default() -> Self {
        Self::new(9, 0, 0)
    }
}

impl DelayComposite for FrozenMosaic {
    fn name(&self) -> &str {
        "Frozen mosaic"
    }

    fn composite_type(&self) -> CompositeType {
        CompositeType::FrozenMosaic
    }

    fn update_subframes(&mut self, descriptor: &ImageDescriptor, total_frames: usize) {
        let interval = if self.interval > 0 {
            self.interval
        } else if self.count > 1 {
            total_frames.saturating_sub(self.start) / (self.count - 1)
        } else {
            0
        };

        let last = self.count - 1;
        self.subframes = grid_layout(descriptor, self.count)
            .into_iter()
            .enumerate()
            .map(|(i, bounds)| {
                let age = self.start + (last - i) * interval;
                Subframe::Constant(ConstantSubframe::new(bounds, age))
            })
            .collect();

        self.period = (total_frames as u64 / 2).max(1);
        self.needs_refresh = true;
    }

    fn tick(&mut self, tick: u64, _current_position: i64) {
        self.needs_refresh = tick % self.period == 0;
    }

    fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    fn subframes(&self) -> &[Subframe] {
        &self.subframes
    }

    fn subframes_mut(&mut self) -> &mut [Subframe] {
        &mut self.subframes
    }
}
