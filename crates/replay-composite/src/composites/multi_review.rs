use crate::composite::{grid_layout, DelayComposite};
use crate::config::CompositeType;
use crate::subframe::{ConstantSubframe, Subframe};
use replay_core::ImageDescriptor;

/// Instant replay wall: evenly time-spaced views of the history, all live.
#[derive(Debug, Clone)]
pub struct MultiReview {
    count: usize,
    subframes: Vec<Subframe>,
}

impl MultiReview {
    pub fn new(count: usize) -> Self {
        Self {
            count: count.max(1),
            subframes: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl Default for MultiReview {
    fn default() -> Self {
        Self::new(4)
    }
}

impl DelayComposite for MultiReview {
    fn name(&self) -> &str {
        "Multi review"
    }

    fn composite_type(&self) -> CompositeType {
        CompositeType::MultiReview
    }

    fn update_subframes(&mut self, descriptor: &ImageDescriptor, total_frames: usize) {
        let interval = if self.count > 1 {
            total_frames / (self.count - 1)
        } else {
            0
        };

        self.subframes = grid_layout(descriptor, self.count)
            .into_iter()
            .enumerate()
            .map(|(i, bounds)| Subframe::Constant(ConstantSubframe::new(bounds, i * interval)))
            .collect();
    }

    fn tick(&mut self, _tick: u64, _current_position: i64) {}

    fn needs_refresh(&self) -> bool {
        true
    }

    fn subframes(&self) -> &[Subframe] {
        &self.subframes
    }

    fn subframes_mut(&mut self) -> &mut [Subframe] {
        &mut self.subframes
    }
}
