//! Built-in review modes.

mod basic;
mod frozen_mosaic;
mod mixed;
mod multi_review;
mod slow_motion;

pub use basic::Basic;
pub use frozen_mosaic::FrozenMosaic;
pub use mixed::Mixed;
pub use multi_review::MultiReview;
pub use slow_motion::SlowMotion;
