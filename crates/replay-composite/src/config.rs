//! Composite configuration produced by the settings dialog.

use crate::composite::DelayComposite;
use crate::composites::{Basic, FrozenMosaic, Mixed, MultiReview, SlowMotion};
use serde::{Deserialize, Serialize};

/// Review mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompositeType {
    #[default]
    Basic,
    SlowMotion,
    MultiReview,
    FrozenMosaic,
    Mixed,
}

impl CompositeType {
    pub fn all() -> &'static [CompositeType] {
        &[
            Self::Basic,
            Self::SlowMotion,
            Self::MultiReview,
            Self::FrozenMosaic,
            Self::Mixed,
        ]
    }
}

/// Parameters of the selected review mode.
///
/// `start` and `interval` only apply to the frozen mosaic; an interval of 0
/// spreads the tiles over the whole history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfiguration {
    pub composite_type: CompositeType,
    pub image_count: usize,
    pub start: usize,
    pub interval: usize,
    pub refresh_rate: f32,
}

impl Default for CompositeConfiguration {
    fn default() -> Self {
        Self {
            composite_type: CompositeType::Basic,
            image_count: 4,
            start: 0,
            interval: 0,
            refresh_rate: 0.5,
        }
    }
}

impl CompositeConfiguration {
    /// Same configuration with another review mode.
    pub fn with_type(mut self, composite_type: CompositeType) -> Self {
        self.composite_type = composite_type;
        self
    }

    /// Instantiate the configured composite. Subframes are laid out later by
    /// `update_subframes`.
    pub fn build(&self) -> Box<dyn DelayComposite> {
        match self.composite_type {
            CompositeType::Basic => Box::new(Basic),
            CompositeType::SlowMotion => Box::new(SlowMotion::new(self.refresh_rate)),
            CompositeType::MultiReview => Box::new(MultiReview::new(self.image_count)),
            CompositeType::FrozenMosaic => Box::new(FrozenMosaic::new(
                self.image_count,
                self.start,
                self.interval,
            )),
            CompositeType::Mixed => Box::new(Mixed::new(self.refresh_rate)),
        }
    }
}
