//! Integration tests for the compositer.
//!
//! Drives every composite type against a real delay buffer filled by the
//! replay-capture generator.

use replay_capture::{frame_number, FrameGenerator};
use replay_composite::{
    CompositeConfiguration, CompositeType, CompositedFrame, Compositer, DelayComposite,
    FrozenMosaic, MultiReview, SlowMotion,
};
use replay_core::{Frame, ImageDescriptor, PixelFormat, Rect};
use replay_delay::Delayer;

// ── Helpers ────────────────────────────────────────────────────

fn descriptor() -> ImageDescriptor {
    ImageDescriptor::new(PixelFormat::Gray8, 64, 64)
}

struct Rig {
    delayer: Delayer,
    compositer: Compositer,
    generator: FrameGenerator,
}

impl Rig {
    /// Ring of 48 slots, 39 frames of usable history.
    fn new(composite: Box<dyn DelayComposite>) -> Self {
        let descriptor = descriptor();
        let mut delayer = Delayer::new();
        assert!(delayer.allocate_buffers(&descriptor, 48 * descriptor.bytes_per_frame()));
        let mut compositer = Compositer::new();
        assert!(compositer.allocate(&descriptor, delayer.max_age()));
        compositer.reset_composite(composite);
        Self {
            delayer,
            compositer,
            generator: FrameGenerator::new(descriptor),
        }
    }

    fn push(&mut self, count: usize) {
        for _ in 0..count {
            assert!(self.delayer.push(&self.generator.next_frame()));
        }
    }

    fn render(&mut self, age: usize) -> Option<Frame> {
        self.compositer
            .get(&self.delayer, age)
            .map(|frame| Frame::clone(&frame))
    }
}

/// Low byte of the counter stamped into the frame drawn in `tile`.
///
/// The counter starts at the first pixel of a frame, which nearest-neighbour
/// scaling keeps at the tile's top-left corner.
fn tile_low_byte(frame: &Frame, tile: Rect) -> u8 {
    frame.row(tile.y)[tile.x as usize]
}

// ── Fast path ──────────────────────────────────────────────────

#[test]
fn basic_hands_back_the_delayer_slot() {
    let mut rig = Rig::new(CompositeConfiguration::default().build());
    rig.push(30);

    let expected = rig.delayer.get(7).map(|frame| frame.slot());
    let frame = rig.compositer.get(&rig.delayer, 7).unwrap();
    match &frame {
        CompositedFrame::Live(live) => assert_eq!(Some(live.slot()), expected),
        CompositedFrame::Canvas(_) => panic!("basic composite drew a canvas"),
    }
    assert_eq!(frame_number(&frame), Some(22));
}

// ── Tiled composites ───────────────────────────────────────────

#[test]
fn multi_review_shows_evenly_spaced_ages() {
    let mut rig = Rig::new(Box::new(MultiReview::new(4)));
    rig.push(60);

    // 39 frames of history: ages 0, 13, 26, 39
    let frame = rig.render(0).unwrap();
    assert_eq!(tile_low_byte(&frame, Rect::new(0, 0, 32, 32)), 59);
    assert_eq!(tile_low_byte(&frame, Rect::new(32, 0, 32, 32)), 46);
    assert_eq!(tile_low_byte(&frame, Rect::new(0, 32, 32, 32)), 33);
    assert_eq!(tile_low_byte(&frame, Rect::new(32, 32, 32, 32)), 20);
}

#[test]
fn frozen_mosaic_redraws_on_pulses_only() {
    let mut rig = Rig::new(Box::new(FrozenMosaic::new(4, 0, 1)));
    rig.push(60);
    assert_eq!(rig.compositer.composite().subframes().len(), 4);

    let first = rig.render(0).unwrap();
    rig.push(1);
    assert_eq!(rig.render(0).unwrap(), first);

    // Period is 39 / 2 = 19 ticks
    for _ in 2..19 {
        rig.push(1);
        assert_eq!(rig.render(0).unwrap(), first);
    }
    rig.push(1);
    assert_ne!(rig.render(0).unwrap(), first);
}

#[test]
fn slow_motion_plays_back_at_half_rate() {
    let mut rig = Rig::new(Box::new(SlowMotion::new(0.5)));
    rig.push(1);
    // The cycle starts on the first position rendered.
    assert_eq!(frame_number(&rig.render(0).unwrap()), Some(0));
    let mut numbers = Vec::new();
    for _ in 0..10 {
        rig.push(1);
        let frame = rig.render(0).unwrap();
        numbers.push(frame_number(&frame).unwrap());
    }

    assert_eq!(numbers, vec![0, 1, 1, 2, 2, 3, 3, 4, 4, 5]);
    let countdown = rig
        .compositer
        .composite()
        .as_slow_motion()
        .unwrap()
        .countdown();
    assert!(countdown > 0);
}

#[test]
fn slow_motion_sync_jumps_to_live() {
    let mut rig = Rig::new(Box::new(SlowMotion::new(0.5)));
    rig.push(1);
    for _ in 0..10 {
        rig.push(1);
        rig.render(0);
    }
    rig.compositer
        .composite_mut()
        .as_slow_motion_mut()
        .unwrap()
        .sync();
    rig.push(1);
    let frame = rig.render(0).unwrap();
    // Restarted at position 10, now at 11
    assert_eq!(frame_number(&frame), Some(10));
}

#[test]
fn slow_motion_restarts_after_reallocation() {
    let mut rig = Rig::new(Box::new(SlowMotion::new(0.5)));
    for _ in 0..500 {
        rig.push(1);
        rig.render(0);
    }

    let descriptor = descriptor();
    assert!(rig
        .delayer
        .allocate_buffers(&descriptor, 40 * descriptor.bytes_per_frame()));
    assert!(rig.compositer.allocate(&descriptor, rig.delayer.max_age()));
    assert_eq!(rig.delayer.current_position(), -1);

    for _ in 0..100 {
        rig.push(1);
        let frame = rig.render(0).unwrap();
        let number = frame_number(&frame).unwrap();
        assert!(number >= 500, "slow motion showed frame {number}");
    }
}

#[test]
fn every_configured_type_renders() {
    for &composite_type in CompositeType::all() {
        let configuration = CompositeConfiguration::default().with_type(composite_type);
        let mut rig = Rig::new(configuration.build());
        assert!(rig.render(0).is_none() || composite_type != CompositeType::Basic);
        rig.push(45);
        assert!(rig.render(3).is_some(), "{composite_type:?}");
    }
}
