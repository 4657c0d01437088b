//! Replay Delay - the delay buffer
//!
//! Continuously records live frames into a bounded ring while several
//! independent readers fetch frames by age.
//!
//! Architecture:
//! - `Delayer`: ring of pre-allocated frame slots addressed by an absolute,
//!   monotonically increasing write position
//! - `FrameRef`: a live, read-locked view into one slot
//! - `DelayerStats`: counters for pushes and missed reads
//!
//! Roles:
//! - one producer calls `push`
//! - display readers call `get` / `get_weak`, which never block
//! - the recorder calls `get_strong`, which waits for the slot lock

pub mod delayer;

pub use delayer::{
    Delayer, DelayerStats, FrameRef, DEFAULT_MIN_CAPACITY, DEFAULT_RESERVE_CAPACITY,
};
