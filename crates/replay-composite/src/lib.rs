//! Replay Composite - multi-view review modes
//!
//! Assembles one output frame from several time-shifted frames of the
//! delay buffer.
//!
//! Architecture:
//! - `Subframe`: a region of the output canvas plus the age it shows
//! - `DelayComposite`: a review mode owning a set of subframes and deciding
//!   when the canvas must be redrawn
//! - `Compositer`: owns the canvas, drives the tick loop and blits frames
//!   pulled from the `Delayer` into each subframe

pub mod blit;
pub mod composite;
pub mod composites;
pub mod compositer;
pub mod config;
pub mod subframe;

pub use composite::{grid_layout, DelayComposite};
pub use composites::{Basic, FrozenMosaic, Mixed, MultiReview, SlowMotion};
pub use compositer::{CompositedFrame, Compositer};
pub use config::{CompositeConfiguration, CompositeType};
pub use subframe::{cycle_duration, ConstantSubframe, Subframe, VariableSubframe};
