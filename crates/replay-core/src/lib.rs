//! Replay Core - Foundation types for the delay-and-review engine
//!
//! This crate provides the fundamental types used throughout Replay:
//! - Image descriptors and pixel layouts
//! - Frame buffers in CPU memory
//! - Integer pixel rectangles for canvas layout
//! - The shared error type

pub mod error;
pub mod frame;
pub mod geometry;

pub use error::{ReplayError, Result};
pub use frame::{Frame, ImageDescriptor, PixelFormat};
pub use geometry::Rect;

/// Memory budget constants for the delay buffer.
pub mod memory_budget {
    /// Default memory given to the delay buffer of one capture screen.
    pub const DEFAULT_MEMORY_BUFFER_MB: usize = 768;

    /// One mebibyte.
    pub const MIB: usize = 1024 * 1024;

    /// Frames held by the upstream capture pipeline, deducted from the budget.
    pub const PIPELINE_RING_FRAMES: usize = 8;
}
