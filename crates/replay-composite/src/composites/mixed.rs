use crate::composite::{grid_layout, DelayComposite};
use crate::config::CompositeType;
use crate::subframe::{cycle_duration, ConstantSubframe, Subframe, VariableSubframe};
use replay_core::ImageDescriptor;

const SLOW_MOTION_COUNT: usize = 2;

/// Fixed 2x2 preset: live frame, oldest frame, and two staggered slow motions.
///
/// This is a fixed layout rather than a template for composite descriptions.
#[derive(Debug, Clone)]
pub struct Mixed {
    refresh_rate: f32,
    shift: i64,
    anchored: bool,
    subframes: Vec<Subframe>,
}

impl Mixed {
    pub fn new(refresh_rate: f32) -> Self {
        Self {
            refresh_rate: refresh_rate.clamp(0.0, 1.0),
            shift: 0,
            anchored: false,
            subframes: Vec::new(),
        }
    }

    /// Offset in frames between the starts of the two slow motions.
    pub fn shift(&self) -> i64 {
        self.shift
    }
}

impl Default for Mixed {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl DelayComposite for Mixed {
    fn name(&self) -> &str {
        "Mixed"
    }

    fn composite_type(&self) -> CompositeType {
        CompositeType::Mixed
    }

    fn update_subframes(&mut self, descriptor: &ImageDescriptor, total_frames: usize) {
        let tiles = grid_layout(descriptor, 2 + SLOW_MOTION_COUNT);
        let cycle = cycle_duration(total_frames, self.refresh_rate);
        let spread = total_frames.saturating_sub(cycle) as f64;
        self.shift = (spread / (SLOW_MOTION_COUNT - 1) as f64).round() as i64;

        let mut subframes = vec![
            Subframe::Constant(ConstantSubframe::new(tiles[0], 0)),
            Subframe::Constant(ConstantSubframe::new(tiles[1], total_frames)),
        ];
        for (k, bounds) in tiles[2..].iter().enumerate() {
            subframes.push(Subframe::Variable(VariableSubframe::new(
                *bounds,
                self.refresh_rate,
                total_frames,
                k as i64 * self.shift,
                cycle,
            )));
        }

        self.subframes = subframes;
        self.anchored = false;
    }

    fn tick(&mut self, _tick: u64, current_position: i64) {
        if self.anchored || current_position < 0 {
            return;
        }

        // Stagger the slow motions from the first position actually seen.
        let shift = self.shift;
        for (k, subframe) in self
            .subframes
            .iter_mut()
            .filter_map(Subframe::as_variable_mut)
            .enumerate()
        {
            subframe.sync(current_position + k as i64 * shift);
        }
        self.anchored = true;
    }

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
