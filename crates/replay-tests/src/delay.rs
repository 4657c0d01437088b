//! Integration tests for the delay buffer.
//!
//! Exercises replay-delay with frames from the replay-capture generator,
//! including a producer and readers on separate threads.

use replay_capture::{frame_number, FrameGenerator};
use replay_core::{Frame, ImageDescriptor, PixelFormat};
use replay_delay::Delayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

// ── Helpers ────────────────────────────────────────────────────

fn descriptor() -> ImageDescriptor {
    ImageDescriptor::new(PixelFormat::Rgb24, 64, 48)
}

fn delayer_with_capacity(capacity: usize) -> Delayer {
    let descriptor = descriptor();
    let mut delayer = Delayer::new();
    assert!(delayer.allocate_buffers(&descriptor, capacity * descriptor.bytes_per_frame()));
    assert_eq!(delayer.full_capacity(), capacity);
    delayer
}

fn push_frames(delayer: &Delayer, generator: &mut FrameGenerator, count: usize) {
    for _ in 0..count {
        assert!(delayer.push(&generator.next_frame()));
    }
}

// ── History ────────────────────────────────────────────────────

#[test]
fn every_safe_age_returns_its_own_frame() {
    let delayer = delayer_with_capacity(40);
    let mut generator = FrameGenerator::new(descriptor());
    push_frames(&delayer, &mut generator, 100);

    for age in 0..=delayer.max_age() {
        let frame = delayer.get_weak(age).unwrap();
        assert_eq!(frame_number(&frame), Some(99 - age as u64));
    }
}

#[test]
fn history_grows_with_pushes() {
    let delayer = delayer_with_capacity(20);
    let mut generator = FrameGenerator::new(descriptor());
    assert!(delayer.get(0).is_none());

    push_frames(&delayer, &mut generator, 3);
    assert!(delayer.get(2).is_some());
    assert!(delayer.get(3).is_none());
}

#[test]
fn old_requests_clamp_to_oldest_safe_frame() {
    let delayer = delayer_with_capacity(20);
    let mut generator = FrameGenerator::new(descriptor());
    push_frames(&delayer, &mut generator, 50);

    // Oldest safe position is 49 - 19 + 8 = 38
    let clamped = delayer.get_weak(19).unwrap();
    assert_eq!(frame_number(&clamped), Some(38));
    assert_eq!(delayer.max_age(), 11);
}

#[test]
fn strong_read_matches_weak_read() {
    let delayer = delayer_with_capacity(16);
    let mut generator = FrameGenerator::new(descriptor());
    push_frames(&delayer, &mut generator, 30);

    let mut destination = Frame::new(descriptor());
    assert!(delayer.get_strong(5, &mut destination));
    assert_eq!(Some(destination), delayer.get_weak(5));
}

#[test]
fn growing_budget_keeps_geometry() {
    let descriptor = descriptor();
    let mut delayer = delayer_with_capacity(12);
    assert!(!delayer.needs_reallocation(&descriptor, 12 * descriptor.bytes_per_frame()));
    assert!(delayer.needs_reallocation(&descriptor, 30 * descriptor.bytes_per_frame()));
    assert!(delayer.allocate_buffers(&descriptor, 30 * descriptor.bytes_per_frame()));
    assert_eq!(delayer.full_capacity(), 30);
    assert_eq!(delayer.current_position(), -1);
}

// ── Concurrency ────────────────────────────────────────────────

#[test]
fn readers_never_see_frames_from_the_future() {
    let delayer = Arc::new(delayer_with_capacity(32));
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let delayer = Arc::clone(&delayer);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut generator = FrameGenerator::new(descriptor());
            for _ in 0..2000 {
                assert!(delayer.push(&generator.next_frame()));
            }
            done.store(true, Ordering::Release);
        })
    };

    let readers: Vec<_> = (0..2)
        .map(|reader| {
            let delayer = Arc::clone(&delayer);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut destination = Frame::new(descriptor());
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    let before = delayer.current_position();
                    let number = if reader == 0 {
                        delayer.get_weak(4).and_then(|f| frame_number(&f))
                    } else if delayer.get_strong(4, &mut destination) {
                        frame_number(&destination)
                    } else {
                        None
                    };
                    // A slot only ever holds its resolved position or a newer one.
                    if let Some(number) = number {
                        assert!(number as i64 >= before - 4);
                        assert!(number < 2000);
                        reads += 1;
                    }
                }
                reads
            })
        })
        .collect();

    producer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(delayer.current_position(), 1999);
    assert_eq!(delayer.stats().pushes, 2000);
    let latest = delayer.get_weak(0).unwrap();
    assert_eq!(frame_number(&latest), Some(1999));
}

#[test]
fn reallocation_requires_exclusive_access() {
    let mut delayer = Arc::new(delayer_with_capacity(12));
    let reader = Arc::clone(&delayer);
    assert!(Arc::get_mut(&mut delayer).is_none());

    drop(reader);
    let descriptor = ImageDescriptor::new(PixelFormat::Gray8, 32, 32);
    let exclusive = Arc::get_mut(&mut delayer).unwrap();
    assert!(exclusive.allocate_buffers(&descriptor, 20 * descriptor.bytes_per_frame()));
    assert_eq!(delayer.descriptor(), Some(&descriptor));
}
