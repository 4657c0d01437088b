//! Synthetic camera used when no device is attached.

use replay_core::{Frame, ImageDescriptor};

const COUNTER_BYTES: usize = std::mem::size_of::<u64>();

/// Produces color bar frames whose first bytes carry a frame counter.
pub struct FrameGenerator {
    background: Frame,
    counter: u64,
}

impl FrameGenerator {
    pub fn new(descriptor: ImageDescriptor) -> Self {
        Self {
            background: Frame::test_pattern(descriptor),
            counter: 0,
        }
    }

    pub fn descriptor(&self) -> &ImageDescriptor {
        self.background.descriptor()
    }

    /// Number of frames produced so far.
    pub fn count(&self) -> u64 {
        self.counter
    }

    /// Render the next frame into `frame`. Returns its number.
    pub fn render_into(&mut self, frame: &mut Frame) -> Option<u64> {
        frame.copy_from(&self.background).ok()?;
        let number = self.counter;
        stamp(frame, number);
        self.counter += 1;
        Some(number)
    }

    pub fn next_frame(&mut self) -> Frame {
        let mut frame = self.background.clone();
        stamp(&mut frame, self.counter);
        self.counter += 1;
        frame
    }
}

fn stamp(frame: &mut Frame, number: u64) {
    if let Some(head) = frame.data_mut().get_mut(..COUNTER_BYTES) {
        head.copy_from_slice(&number.to_le_bytes());
    }
}

/// Counter stamped by [`FrameGenerator`], if the frame is large enough.
pub fn frame_number(frame: &Frame) -> Option<u64> {
    let head = frame.data().get(..COUNTER_BYTES)?;
    Some(u64::from_le_bytes(head.try_into().ok()?))
}
