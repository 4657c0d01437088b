use crate::composite::DelayComposite;
use crate::config::CompositeType;
use crate::subframe::{cycle_duration, Subframe, VariableSubframe};
use replay_core::{ImageDescriptor, Rect};
use tracing::debug;

/// Full-canvas slow motion that periodically catches up with the live frame.
#[derive(Debug, Clone)]
pub struct SlowMotion {
    refresh_rate: f32,
    total_frames: usize,
    last_position: i64,
    anchored: bool,
    subframes: Vec<Subframe>,
}

impl SlowMotion {
    pub fn new(refresh_rate: f32) -> Self {
        Self {
            refresh_rate: refresh_rate.clamp(0.0, 1.0),
            total_frames: 0,
            last_position: -1,
            anchored: false,
            subframes: Vec::new(),
        }
    }

    pub fn refresh_rate(&self) -> f32 {
        self.refresh_rate
    }

    /// Change the playback rate; the cycle restarts from the live frame.
    pub fn update_refresh_rate(&mut self, refresh_rate: f32) {
        self.refresh_rate = refresh_rate.clamp(0.0, 1.0);
        let cycle = cycle_duration(self.total_frames, self.refresh_rate);
        let position = self.last_position;
        if let Some(subframe) = self.variable_mut() {
            subframe.update_refresh_rate(refresh_rate, cycle, position);
        }
        debug!(rate = self.refresh_rate, cycle, "Slow motion rate changed");
    }

    /// Restart the cycle from the live frame.
    pub fn sync(&mut self) {
        let position = self.last_position;
        self.rewind(position);
    }

    /// Restart the cycle from absolute `position`.
    pub fn rewind(&mut self, position: i64) {
        if let Some(subframe) = self.variable_mut() {
            subframe.sync(position);
        }
    }

    /// Frames left until the replay catches up with the live frame.
    pub fn countdown(&self) -> usize {
        self.subframes
            .first()
            .and_then(Subframe::as_variable)
            .map_or(0, |s| s.countdown(self.last_position))
    }

    fn variable_mut(&mut self) -> Option<&mut VariableSubframe> {
        self.subframes.first_mut().and_then(Subframe::as_variable_mut)
    }
}

impl Default for SlowMotion {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl DelayComposite for SlowMotion {
    fn name(&self) -> &str {
        "Slow motion"
    }

    fn composite_type(&self) -> CompositeType {
        CompositeType::SlowMotion
    }

    /// Lays the subframe out again. The cycle restarts on the next
    /// position seen, since the delay buffer may have been reset.
    fn update_subframes(&mut self, descriptor: &ImageDescriptor, total_frames: usize) {
        self.total_frames = total_frames;
        self.last_position = -1;
        self.anchored = false;
        let bounds = Rect::full(descriptor.width, descriptor.height);
        let cycle = cycle_duration(total_frames, self.refresh_rate);
        self.subframes = vec![Subframe::Variable(VariableSubframe::new(
            bounds,
            self.refresh_rate,
            total_frames,
            0,
            cycle,
        ))];
    }

    fn tick(&mut self, _tick: u64, current_position: i64) {
        self.last_position = current_position;
        if !self.anchored && current_position >= 0 {
            self.rewind(current_position);
            self.anchored = true;
        }
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

    fn as_slow_motion(&self) -> Option<&SlowMotion> {
        Some(self)
    }

    fn as_slow_motion_mut(&mut self) -> Option<&mut SlowMotion> {
        Some(self)
    }
}
