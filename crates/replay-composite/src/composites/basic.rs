use crate::composite::DelayComposite;
use crate::config::CompositeType;
use crate::subframe::Subframe;
use replay_core::ImageDescriptor;

/// Plain delay: no subframes, the compositer hands back the buffered frame as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Basic;

impl DelayComposite for Basic {
    fn name(&self) -> &str {
        "Basic"
    }

    fn composite_type(&self) -> CompositeType {
        CompositeType::Basic
    }

    fn update_subframes(&mut self, _descriptor: &ImageDescriptor, _total_frames: usize) {}

    fn tick(&mut self, _tick: u64, _current_position: i64) {}

    fn needs_refresh(&self) -> bool {
        true
    }

    fn subframes(&self) -> &[Subframe] {
        &[]
    }

    fn subframes_mut(&mut self) -> &mut [Subframe] {
        &mut []
    }
}
