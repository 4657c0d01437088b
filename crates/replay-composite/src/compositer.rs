//! Drives the active composite and assembles its output canvas.

use crate::blit::blit_nearest;
use crate::composite::DelayComposite;
use crate::composites::Basic;
use replay_core::{Frame, ImageDescriptor};
use replay_delay::{Delayer, FrameRef};
use std::ops::Deref;
use tracing::{debug, info, warn};

/// Output of [`Compositer::get`].
pub enum CompositedFrame<'a> {
    /// Slot of the delay buffer, returned as is.
    Live(FrameRef<'a>),
    /// The compositer canvas.
    Canvas(&'a Frame),
}

impl CompositedFrame<'_> {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

impl Deref for CompositedFrame<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        match self {
            Self::Live(frame) => frame,
            Self::Canvas(frame) => frame,
        }
    }
}

pub struct Compositer {
    composite: Box<dyn DelayComposite>,
    descriptor: Option<ImageDescriptor>,
    total_frames: usize,
    canvas: Option<Frame>,
    ticks: u64,
}

impl Compositer {
    pub fn new() -> Self {
        Self {
            composite: Box::new(Basic),
            descriptor: None,
            total_frames: 0,
            canvas: None,
            ticks: 0,
        }
    }

    /// Whether the canvas must be reallocated for `descriptor`.
    pub fn needs_reallocation(&self, descriptor: &ImageDescriptor) -> bool {
        self.canvas
            .as_ref()
            .map_or(true, |canvas| !canvas.descriptor().is_compatible(descriptor))
    }

    /// Size the canvas for `descriptor` and lay the composite out over
    /// `total_frames` of history.
    pub fn allocate(&mut self, descriptor: &ImageDescriptor, total_frames: usize) -> bool {
        if !descriptor.is_valid() {
            warn!(
                width = descriptor.width,
                height = descriptor.height,
                "Cannot allocate canvas"
            );
            return false;
        }

        if self.needs_reallocation(descriptor) {
            match Frame::try_new(*descriptor) {
                Ok(canvas) => self.canvas = Some(canvas),
                Err(e) => {
                    warn!(error = %e, "Canvas allocation failed");
                    self.free();
                    return false;
                }
            }
        }

        self.descriptor = Some(*descriptor);
        self.total_frames = total_frames;
        self.relayout();
        info!(
            composite = self.composite.name(),
            total_frames, "Compositer allocated"
        );
        true
    }

    pub fn free(&mut self) {
        self.canvas = None;
        self.descriptor = None;
        self.total_frames = 0;
        self.ticks = 0;
    }

    pub fn descriptor(&self) -> Option<&ImageDescriptor> {
        self.descriptor.as_ref()
    }

    /// History depth the composite is laid out over.
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn composite(&self) -> &dyn DelayComposite {
        self.composite.as_ref()
    }

    pub fn composite_mut(&mut self) -> &mut dyn DelayComposite {
        self.composite.as_mut()
    }

    /// Swap in `composite` as is and return the previous one.
    pub fn set_composite(&mut self, composite: Box<dyn DelayComposite>) -> Box<dyn DelayComposite> {
        debug!(composite = composite.name(), "Composite swapped");
        std::mem::replace(&mut self.composite, composite)
    }

    /// Swap in `composite`, lay it out against the current canvas and
    /// restart the tick counter. Returns the previous composite.
    pub fn reset_composite(
        &mut self,
        composite: Box<dyn DelayComposite>,
    ) -> Box<dyn DelayComposite> {
        let previous = self.set_composite(composite);
        self.relayout();
        previous
    }

    fn relayout(&mut self) {
        if let Some(descriptor) = self.descriptor {
            self.composite
                .update_subframes(&descriptor, self.total_frames);
        }
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.fill(0);
        }
        self.ticks = 0;
    }

    /// Frame to display for a delay of `age`.
    ///
    /// Without subframes the delay buffer slot is returned directly. Otherwise
    /// the composite is ticked and, if it asks for it, every active subframe
    /// is redrawn from the delay buffer at `age` plus its own age.
    pub fn get<'a>(&'a mut self, delayer: &'a Delayer, age: usize) -> Option<CompositedFrame<'a>> {
        if self.composite.subframes().is_empty() {
            return delayer.get(age).map(CompositedFrame::Live);
        }

        let canvas = self.canvas.as_mut()?;
        let current = delayer.current_position();
        self.composite.tick(self.ticks, current);
        self.ticks += 1;

        if self.composite.needs_refresh() {
            for index in 0..self.composite.subframes().len() {
                let Some(subframe_age) = self.composite.age(index, current) else {
                    continue;
                };
                let bounds = self.composite.subframes()[index].bounds();
                if let Some(frame) = delayer.get(age.saturating_add(subframe_age)) {
                    blit_nearest(&frame, canvas, bounds);
                }
            }
        }

        Some(CompositedFrame::Canvas(canvas))
    }
}

impl Default for Compositer {
    fn default() -> Self {
        Self::new()
    }
}
