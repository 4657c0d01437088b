//! Subframes: a region of the output canvas and the age it displays.

use replay_core::Rect;

/// Length in source frames of one slow-motion cycle.
///
/// A cycle lasts `total_frames * (1 - refresh_rate)` real frames, during
/// which `refresh_rate` of them are replayed. The oldest age reached is then
/// always below `total_frames`.
pub fn cycle_duration(total_frames: usize, refresh_rate: f32) -> usize {
    let rate = refresh_rate.clamp(0.0, 1.0) as f64;
    let replayed = (total_frames as f64 * (1.0 - rate) * rate).floor() as usize;
    replayed.max(1)
}

/// A region of the canvas with its age policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Subframe {
    /// Always shows the same age.
    Constant(ConstantSubframe),
    /// Plays history back at a reduced rate and periodically catches up.
    Variable(VariableSubframe),
}

impl Subframe {
    /// Region of the canvas covered by this subframe.
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Constant(s) => s.bounds(),
            Self::Variable(s) => s.bounds(),
        }
    }

    /// Age to display at `current_position`, or `None` if not active yet.
    pub fn age(&mut self, current_position: i64) -> Option<usize> {
        match self {
            Self::Constant(s) => Some(s.age()),
            Self::Variable(s) => s.age(current_position),
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut VariableSubframe> {
        match self {
            Self::Variable(s) => Some(s),
            Self::Constant(_) => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableSubframe> {
        match self {
            Self::Variable(s) => Some(s),
            Self::Constant(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantSubframe {
    bounds: Rect,
    age: usize,
}

impl ConstantSubframe {
    pub fn new(bounds: Rect, age: usize) -> Self {
        Self { bounds, age }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn age(&self) -> usize {
        self.age
    }
}

/// Subframe whose age grows at `1 - refresh_rate` per frame until the end
/// of the cycle, where it restarts from the live frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableSubframe {
    bounds: Rect,
    refresh_rate: f32,
    total_frames: usize,
    start_position: i64,
    cycle_duration: usize,
}

impl VariableSubframe {
    pub fn new(
        bounds: Rect,
        refresh_rate: f32,
        total_frames: usize,
        start_position: i64,
        cycle_duration: usize,
    ) -> Self {
        Self {
            bounds,
            refresh_rate: refresh_rate.clamp(0.0, 1.0),
            total_frames,
            start_position,
            cycle_duration,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn refresh_rate(&self) -> f32 {
        self.refresh_rate
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Absolute position the current cycle started at.
    pub fn start_position(&self) -> i64 {
        self.start_position
    }

    pub fn cycle_duration(&self) -> usize {
        self.cycle_duration
    }

    /// Age to display at `current_position`.
    ///
    /// Returns `None` while `current_position` is before the cycle start.
    /// Rebases the cycle on `current_position` once the replay has covered
    /// `cycle_duration` frames or fallen behind the history.
    pub fn age(&mut self, current_position: i64) -> Option<usize> {
        let in_cycle = current_position - self.start_position;
        if in_cycle < 0 {
            return None;
        }

        let mut target =
            self.start_position + (in_cycle as f64 * self.refresh_rate as f64).floor() as i64;
        let cycle_end = self.start_position + self.cycle_duration as i64;
        if target >= cycle_end || current_position - target > self.total_frames as i64 {
            target = current_position;
            self.start_position = current_position;
        }

        Some((current_position - target) as usize)
    }

    /// Change the playback rate and restart the cycle at `current_position`.
    pub fn update_refresh_rate(
        &mut self,
        refresh_rate: f32,
        cycle_duration: usize,
        current_position: i64,
    ) {
        self.refresh_rate = refresh_rate.clamp(0.0, 1.0);
        self.cycle_duration = cycle_duration;
        self.start_position = current_position;
    }

    /// Restart the cycle at `position`.
    pub fn sync(&mut self, position: i64) {
        self.start_position = position;
    }

    /// Frames left until the cycle restarts.
    pub fn countdown(&self, current_position: i64) -> usize {
        let in_cycle = (current_position - self.start_position).max(0) as usize;
        let rate = self.refresh_rate as f64;

        let by_rate = if rate > 0.0 {
            (self.cycle_duration as f64 / rate).ceil() as usize
        } else {
            usize::MAX
        };
        let by_age = if rate < 1.0 {
            ((self.total_frames + 1) as f64 / (1.0 - rate)).ceil() as usize
        } else {
            usize::MAX
        };

        by_rate.min(by_age).saturating_sub(in_cycle)
    }
}
