//! Ring buffer of frame slots addressed by age.
//!
//! The producer publishes every write through an atomic position counter and
//! copies pixels under the target slot's own lock only; there is no
//! buffer-wide lock on the hot path. Readers are kept `reserve_capacity`
//! slots away from the slot the producer writes next, so a reader copying
//! out of a slot is statistically never overtaken by the producer.
//!
//! Reallocation takes `&mut self`. Share the delayer as `Arc<Delayer>` and
//! reallocate through `Arc::get_mut`, which only succeeds once every
//! producer and reader handle has been dropped.

use parking_lot::{RwLock, RwLockReadGuard};
use replay_core::{Frame, ImageDescriptor, ReplayError, Result};
use std::ops::Deref;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

/// Slots kept off-limits to readers behind the write head.
pub const DEFAULT_RESERVE_CAPACITY: usize = 8;

/// Smallest ring allocated when memory is not constrained.
pub const DEFAULT_MIN_CAPACITY: usize = 12;

/// Position before the first write.
const NO_POSITION: i64 = -1;

#[derive(Default)]
struct Stats {
    pushes: AtomicU64,
    push_failures: AtomicU64,
    weak_misses: AtomicU64,
}

/// Snapshot of the delayer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayerStats {
    /// Frames successfully pushed since allocation.
    pub pushes: u64,
    /// Pushes rejected because of a format mismatch.
    pub push_failures: u64,
    /// `get_weak` calls that gave up on a slot being written.
    pub weak_misses: u64,
}

/// A live view into one slot of the ring.
///
/// Holds the slot's read lock; the producer cannot write into this slot
/// until the view is dropped. Copy out and drop quickly.
pub struct FrameRef<'a> {
    guard: RwLockReadGuard<'a, Frame>,
    position: i64,
    slot: usize,
}

impl FrameRef<'_> {
    /// Absolute write position of the frame.
    #[inline]
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Physical slot index inside the ring.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl Deref for FrameRef<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.guard
    }
}

impl std::fmt::Debug for FrameRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRef")
            .field("position", &self.position)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Bounded ring of pre-allocated frames with age-based access.
pub struct Delayer {
    slots: Vec<RwLock<Frame>>,
    reserve_capacity: usize,
    min_capacity: usize,
    position: AtomicI64,
    descriptor: Option<ImageDescriptor>,
    memory_budget: usize,
    stats: Stats,
}

impl Delayer {
    /// Create an unallocated delayer.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            reserve_capacity: DEFAULT_RESERVE_CAPACITY,
            min_capacity: DEFAULT_MIN_CAPACITY,
            position: AtomicI64::new(NO_POSITION),
            descriptor: None,
            memory_budget: 0,
            stats: Stats::default(),
        }
    }

    /// Total number of slots.
    #[inline]
    pub fn full_capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots the producer may be ahead of any read.
    #[inline]
    pub fn reserve_capacity(&self) -> usize {
        self.reserve_capacity
    }

    /// Capacity floor for the current allocation.
    #[inline]
    pub fn min_capacity(&self) -> usize {
        self.min_capacity
    }

    /// `full_capacity - reserve_capacity`.
    #[inline]
    pub fn safe_capacity(&self) -> usize {
        self.full_capacity().saturating_sub(self.reserve_capacity)
    }

    /// Oldest age that resolves to its own frame once the ring has wrapped.
    ///
    /// Older requests are clamped to this age.
    #[inline]
    pub fn max_age(&self) -> usize {
        self.safe_capacity().saturating_sub(1)
    }

    /// Absolute position of the newest frame, or -1 before the first push.
    #[inline]
    pub fn current_position(&self) -> i64 {
        self.position.load(Ordering::Acquire)
    }

    /// Descriptor of the frames currently stored.
    pub fn descriptor(&self) -> Option<&ImageDescriptor> {
        self.descriptor.as_ref()
    }

    /// Budget passed to the last successful allocation.
    pub fn memory_budget(&self) -> usize {
        self.memory_budget
    }

    pub fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> DelayerStats {
        DelayerStats {
            pushes: self.stats.pushes.load(Ordering::Relaxed),
            push_failures: self.stats.push_failures.load(Ordering::Relaxed),
            weak_misses: self.stats.weak_misses.load(Ordering::Relaxed),
        }
    }

    /// Whether `allocate_buffers` would change anything for this input.
    pub fn needs_reallocation(&self, descriptor: &ImageDescriptor, memory_budget: usize) -> bool {
        match &self.descriptor {
            Some(current) => {
                !current.is_compatible(descriptor)
                    || memory_budget != self.memory_budget
                    || self.slots.is_empty()
            }
            None => true,
        }
    }

    /// Size the ring for `descriptor` within `memory_budget` bytes.
    ///
    /// On failure the error is logged and the buffer is left in its last
    /// valid state, which may be empty.
    pub fn allocate_buffers(&mut self, descriptor: &ImageDescriptor, memory_budget: usize) -> bool {
        match self.try_allocate(descriptor, memory_budget) {
            Ok(()) => {
                info!(
                    width = descriptor.width,
                    height = descriptor.height,
                    capacity = self.full_capacity(),
                    reserve = self.reserve_capacity,
                    safe = self.safe_capacity(),
                    "Delay buffer allocated"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Delay buffer could not be allocated");
                false
            }
        }
    }

    fn try_allocate(&mut self, descriptor: &ImageDescriptor, memory_budget: usize) -> Result<()> {
        if !descriptor.is_valid() {
            return Err(ReplayError::InvalidParameter(format!(
                "Cannot size delay buffer for {}x{} frames",
                descriptor.width, descriptor.height
            )));
        }

        let target = memory_budget / descriptor.bytes_per_frame();
        let (reserve, min) = if target < DEFAULT_MIN_CAPACITY {
            warn!(
                target_capacity = target,
                budget = memory_budget,
                "Memory pressure on delay buffer, lowering reserve"
            );
            (target.max(2), (target + 1).max(3))
        } else {
            (DEFAULT_RESERVE_CAPACITY, DEFAULT_MIN_CAPACITY)
        };
        let capacity = target.max(min);

        let compatible = self
            .descriptor
            .is_some_and(|current| current.is_compatible(descriptor));
        if !compatible {
            self.free_all();
        }

        let previous = self.slots.len();
        if capacity < previous {
            self.slots.truncate(capacity);
            self.slots.shrink_to_fit();
        } else if capacity > previous {
            let missing = capacity - previous;
            let mut fresh = Vec::new();
            fresh.try_reserve_exact(missing).map_err(|e| {
                ReplayError::OutOfMemory(format!("Failed to reserve {} slots: {}", missing, e))
            })?;
            for _ in 0..missing {
                fresh.push(RwLock::new(Frame::try_new(*descriptor)?));
            }
            self.slots.try_reserve_exact(missing).map_err(|e| {
                ReplayError::OutOfMemory(format!("Failed to grow ring: {}", e))
            })?;
            self.slots.extend(fresh);
        }

        // Positions map to slots modulo capacity; history is meaningless once it changes.
        if self.slots.len() != previous {
            *self.position.get_mut() = NO_POSITION;
        }

        self.descriptor = Some(*descriptor);
        self.reserve_capacity = reserve;
        self.min_capacity = min;
        self.memory_budget = memory_budget;
        Ok(())
    }

    /// Dispose all slots and return to the unallocated state.
    pub fn free_all(&mut self) {
        if !self.slots.is_empty() {
            debug!(slots = self.slots.len(), "Freeing delay buffer");
        }
        self.slots = Vec::new();
        *self.position.get_mut() = NO_POSITION;
        self.descriptor = None;
        self.memory_budget = 0;
        self.reserve_capacity = DEFAULT_RESERVE_CAPACITY;
        self.min_capacity = DEFAULT_MIN_CAPACITY;
        self.stats = Stats::default();
    }

    /// Copy `frame` into the next slot and publish it as the newest frame.
    ///
    /// Must only be called from one thread at a time. On a format mismatch
    /// the error is logged and the position is not advanced.
    pub fn push(&self, frame: &Frame) -> bool {
        if self.slots.is_empty() {
            debug!("Push on unallocated delay buffer");
            return false;
        }

        // Only the producer writes the counter.
        let next = self.position.load(Ordering::Relaxed) + 1;
        let slot = next as usize % self.slots.len();

        let copied = self.slots[slot].write().copy_from(frame);
        match copied {
            Ok(()) => {
                self.position.store(next, Ordering::Release);
                self.stats.pushes.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.stats.push_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, position = next, "Failed to push frame to delay buffer");
                false
            }
        }
    }

    /// Resolve `age` to an absolute position and its slot.
    ///
    /// Requests older than the reserve margin are clamped to the oldest
    /// position the producer is not about to overwrite.
    pub fn resolve(&self, age: usize) -> Option<(i64, usize)> {
        let current = self.current_position();
        let capacity = self.slots.len();
        if current < 0 || capacity == 0 {
            return None;
        }

        let requested = current - i64::try_from(age).ok()?;
        if requested < 0 {
            return None;
        }

        let oldest_safe = current - (capacity as i64 - 1) + self.reserve_capacity as i64;
        let position = requested.max(oldest_safe).min(current);
        Some((position, position as usize % capacity))
    }

    /// Live view of the frame at `age`, without copying.
    ///
    /// Returns `None` if the history is not deep enough yet or if the slot is
    /// being written. Never blocks.
    pub fn get(&self, age: usize) -> Option<FrameRef<'_>> {
        let (position, slot) = self.resolve(age)?;
        let guard = self.slots[slot].try_read()?;
        Some(FrameRef {
            guard,
            position,
            slot,
        })
    }

    /// Best-effort copy of the frame at `age`. Never blocks.
    pub fn get_weak(&self, age: usize) -> Option<Frame> {
        let (_, slot) = self.resolve(age)?;
        match self.slots[slot].try_read() {
            Some(guard) => Some(Frame::clone(&guard)),
            None => {
                self.stats.weak_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Copy the frame at `age` into `destination`, waiting for the slot lock.
    ///
    /// Returns false if the history is not deep enough yet or if
    /// `destination` does not match the stored frames.
    pub fn get_strong(&self, age: usize, destination: &mut Frame) -> bool {
        let Some((position, slot)) = self.resolve(age) else {
            return false;
        };

        let source = self.slots[slot].read();
        match destination.copy_from(&source) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, position, "Strong read into incompatible destination");
                false
            }
        }
    }
}

impl Default for Delayer {
    fn default() -> Self {
        Self::new()
    }
}
