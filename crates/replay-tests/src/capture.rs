//! Integration tests for capture sessions.
//!
//! Runs a session end to end: preferences, allocation, the recording
//! consumer thread and the display path.

use replay_capture::{
    frame_number, CapturePreferences, CaptureSession, FrameGenerator, MemorySink, RawFileSink,
    RecordingMode,
};
use replay_composite::CompositeType;
use replay_core::{Frame, ImageDescriptor, PixelFormat};
use std::thread;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

fn descriptor() -> ImageDescriptor {
    ImageDescriptor::new(PixelFormat::Rgb24, 128, 96)
}

fn session_from_json(json: &str) -> CaptureSession {
    let preferences = CapturePreferences::from_json(json).unwrap();
    let mut session = CaptureSession::new(preferences);
    assert!(session.set_image_descriptor(descriptor()).unwrap());
    session
}

/// Queue `frame`, waiting for room in the consumer queue.
fn submit(session: &CaptureSession, frame: Frame) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !session.submit_frame(frame.clone()) {
        assert!(Instant::now() < deadline, "consumer queue stayed full");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Wait until the consumer has pushed the frame at `position`.
fn wait_for_position(session: &CaptureSession, position: i64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while session.delayer().current_position() < position {
        assert!(Instant::now() < deadline, "consumer did not reach {position}");
        thread::sleep(Duration::from_millis(1));
    }
}

// ── Configuration ──────────────────────────────────────────────

#[test]
fn preferences_select_the_composite() {
    let session = session_from_json(
        r#"{"memory_buffer_mb": 8, "composite": {"composite_type": "MultiReview", "image_count": 9}}"#,
    );
    let composite = session.compositer().composite();
    assert_eq!(composite.composite_type(), CompositeType::MultiReview);
    assert_eq!(composite.subframes().len(), 9);
}

#[test]
fn tiny_budget_still_yields_a_buffer() {
    // 1 MiB minus 8 pipeline frames of 36 KiB leaves room for 20 frames
    let session = session_from_json(r#"{"memory_buffer_mb": 1}"#);
    let delayer = session.delayer();
    assert!(delayer.is_allocated());
    assert_eq!(delayer.full_capacity(), 20);
    assert_eq!(delayer.reserve_capacity(), 8);
}

// ── Recording ──────────────────────────────────────────────────

#[test]
fn consumer_records_at_the_configured_delay() {
    let mut session = session_from_json(r#"{"memory_buffer_mb": 8}"#);
    session.activate_consumer().unwrap();
    session.delay_changed(5.0);

    let sink = MemorySink::new();
    let recorded = sink.frames();
    session.start_recording(Box::new(sink), 10.0).unwrap();

    let mut generator = FrameGenerator::new(descriptor());
    for _ in 0..30 {
        submit(&session, generator.next_frame());
    }
    session.stop_recording().unwrap();
    // Counted once the queue has drained.
    assert_eq!(session.deactivate_consumer(), 25);

    let numbers: Vec<u64> = recorded.lock().iter().filter_map(frame_number).collect();
    assert_eq!(numbers, (0..25).collect::<Vec<_>>());
    assert_eq!(session.delayer().current_position(), 29);
}

#[test]
fn recording_to_file_writes_every_delayed_frame() {
    let path = std::env::temp_dir().join(format!("replay-it-{}.raw", uuid::Uuid::new_v4()));
    let mut session = session_from_json(r#"{"memory_buffer_mb": 8}"#);
    session.activate_consumer().unwrap();
    session
        .start_recording(Box::new(RawFileSink::new(&path)), 2.0)
        .unwrap();

    let mut generator = FrameGenerator::new(descriptor());
    for _ in 0..12 {
        submit(&session, generator.next_frame());
    }
    session.stop_recording().unwrap();
    session.deactivate_consumer();

    let bytes = std::fs::read(&path).unwrap();
    let newline = bytes.iter().position(|&b| b == b'\n').unwrap();
    let header = std::str::from_utf8(&bytes[..newline]).unwrap();
    // 500 fps capture is written at the high speed output rate
    assert!(header.contains("\"file_interval_ms\":33.33"));
    assert_eq!(bytes.len() - newline - 1, 12 * descriptor().bytes_per_frame());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn camera_mode_records_frames_as_they_arrive() {
    let mut session = session_from_json(r#"{"memory_buffer_mb": 8, "recording_mode": "Camera"}"#);
    session.activate_consumer().unwrap();
    session.delay_changed(5.0);

    let sink = MemorySink::new();
    let recorded = sink.frames();
    session.start_recording(Box::new(sink), 10.0).unwrap();

    let mut generator = FrameGenerator::new(descriptor());
    for _ in 0..30 {
        submit(&session, generator.next_frame());
    }
    session.stop_recording().unwrap();
    session.deactivate_consumer();

    let numbers: Vec<u64> = recorded.lock().iter().filter_map(frame_number).collect();
    assert_eq!(numbers, (0..30).collect::<Vec<_>>());
}

#[test]
fn display_mode_records_what_the_viewport_shows() {
    let mut session = session_from_json(r#"{"memory_buffer_mb": 8, "recording_mode": "Display"}"#);
    session.activate_consumer().unwrap();
    session.delay_changed(2.0);

    let sink = MemorySink::new();
    let recorded = sink.frames();
    session.start_recording(Box::new(sink), 10.0).unwrap();

    let mut generator = FrameGenerator::new(descriptor());
    for position in 0..30 {
        submit(&session, generator.next_frame());
        wait_for_position(&session, position);
        session.display_frame();
    }
    session.stop_recording().unwrap();
    session.deactivate_consumer();

    // Nothing is displayed until two frames of history exist.
    let numbers: Vec<u64> = recorded.lock().iter().filter_map(frame_number).collect();
    assert_eq!(numbers, (0..28).collect::<Vec<_>>());
}

// ── Display ────────────────────────────────────────────────────

#[test]
fn display_reads_while_consumer_feeds() {
    let mut session = session_from_json(
        r#"{"memory_buffer_mb": 8, "composite": {"composite_type": "SlowMotion"}}"#,
    );
    session.set_camera_frequency(100.0);
    session.activate_consumer().unwrap();

    let mut generator = FrameGenerator::new(descriptor());
    let mut displayed = 0;
    while generator.count() < 200 {
        if !session.submit_frame(generator.next_frame()) {
            thread::sleep(Duration::from_millis(1));
        }
        if session.display_frame().is_some() {
            displayed += 1;
        }
    }

    assert!(displayed > 0);
    assert!(session.slow_motion_countdown().is_some());
    assert!(session.age_to_seconds(50) > 0.0);
    session.force_sync();
}

#[test]
fn camera_mode_converts_ages_with_display_rate() {
    let session =
        session_from_json(r#"{"memory_buffer_mb": 8, "recording_mode": "Camera", "display_framerate": 50.0}"#);
    assert_eq!(session.recording_mode(), RecordingMode::Camera);
    assert_eq!(session.age_to_seconds(100), 2.0);
}
