//! Replay - headless delay-and-review runner
//!
//! Feeds a synthetic camera into a capture session for a fixed duration,
//! renders the configured review mode at the display rate and logs the
//! delay buffer statistics.
//!
//! Usage: `replay [seconds] [composite] [preferences.json] [output.raw]`
//!
//! Without an output path the recording goes to a temporary file that is
//! removed at exit.

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, select, tick, Receiver};
use replay_capture::{
    frame_number, CapturePreferences, CaptureSession, FrameGenerator, RawFileSink,
};
use replay_composite::CompositeType;
use replay_core::{Frame, ImageDescriptor, PixelFormat};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const CAMERA_FPS: f64 = 60.0;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let seconds: u64 = match args.next() {
        Some(arg) => arg.parse().context("Duration must be a number of seconds")?,
        None => 5,
    };
    let composite = args.next().map(|name| parse_composite(&name)).transpose()?;
    let preferences = match args.next().map(PathBuf::from) {
        Some(path) => CapturePreferences::load(&path)
            .with_context(|| format!("Failed to load preferences from {}", path.display()))?,
        None => {
            let path = CapturePreferences::default_path();
            CapturePreferences::load(&path).unwrap_or_default()
        }
    };

    let output = args.next().map(PathBuf::from);

    info!("Replay starting...");
    run(preferences, composite, Duration::from_secs(seconds), output)
}

fn parse_composite(name: &str) -> Result<CompositeType> {
    let composite = match name.to_ascii_lowercase().as_str() {
        "basic" => CompositeType::Basic,
        "slowmotion" | "slow-motion" => CompositeType::SlowMotion,
        "multireview" | "multi-review" => CompositeType::MultiReview,
        "frozenmosaic" | "frozen-mosaic" => CompositeType::FrozenMosaic,
        "mixed" => CompositeType::Mixed,
        _ => bail!("Unknown composite: {name}"),
    };
    Ok(composite)
}

fn run(
    preferences: CapturePreferences,
    composite: Option<CompositeType>,
    duration: Duration,
    output: Option<PathBuf>,
) -> Result<()> {
    let descriptor = ImageDescriptor::new(PixelFormat::Rgb24, 640, 480);
    let display_fps = preferences.display_framerate.max(1.0);
    let configuration = preferences.composite;

    let mut session = CaptureSession::new(preferences);
    if let Some(composite_type) = composite {
        session.change_composite(configuration.with_type(composite_type));
    }
    session.set_camera_frequency(CAMERA_FPS);
    if !session.set_image_descriptor(descriptor)? {
        bail!("Delay buffer could not be allocated");
    }
    session.activate_consumer()?;

    let max_age = session.delayer().max_age();
    let delay = session.delay_changed(max_age as f64 / 2.0);
    info!(
        id = session.short_id(),
        max_age,
        delay,
        seconds = session.age_to_seconds(delay),
        composite = session.compositer().composite().name(),
        "Session ready"
    );

    let keep_recording = output.is_some();
    let recording = output.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("replay-{}.raw", session.short_id()))
    });
    session.start_recording(Box::new(RawFileSink::new(&recording)), 1000.0 / CAMERA_FPS)?;

    let (frames, camera) = spawn_camera(descriptor, duration);
    let display = tick(Duration::from_secs_f64(1.0 / display_fps));
    let started = Instant::now();
    let mut dropped = 0u64;
    let mut displayed = 0u64;

    loop {
        select! {
            recv(frames) -> frame => match frame {
                Ok(frame) => {
                    if !session.submit_frame(frame) {
                        dropped += 1;
                    }
                }
                Err(_) => break,
            },
            recv(display) -> _ => {
                if let Some(frame) = session.display_frame() {
                    displayed += 1;
                    debug!(frame = ?frame_number(&frame), "Displayed");
                }
                if let Some(countdown) = session.slow_motion_countdown() {
                    debug!(seconds = session.age_to_seconds(countdown), "Slow motion countdown");
                }
            },
        }
    }

    if camera.join().is_err() {
        warn!("Camera thread panicked");
    }
    session.stop_recording()?;
    let recorded = session.deactivate_consumer();
    let bytes = std::fs::metadata(&recording).map_or(0, |m| m.len());

    let stats = session.delayer().stats();
    info!(
        elapsed = ?started.elapsed(),
        pushes = stats.pushes,
        push_failures = stats.push_failures,
        weak_misses = stats.weak_misses,
        dropped,
        displayed,
        recorded,
        bytes,
        file = %recording.display(),
        "Replay finished"
    );

    if !keep_recording {
        std::fs::remove_file(&recording)
            .with_context(|| format!("Failed to remove {}", recording.display()))?;
    }
    Ok(())
}

/// Synthetic camera producing frames at `CAMERA_FPS` for `duration`.
fn spawn_camera(
    descriptor: ImageDescriptor,
    duration: Duration,
) -> (Receiver<Frame>, thread::JoinHandle<()>) {
    let (sender, receiver) = bounded(4);
    let handle = thread::spawn(move || {
        let mut generator = FrameGenerator::new(descriptor);
        let interval = Duration::from_secs_f64(1.0 / CAMERA_FPS);
        let started = Instant::now();
        while started.elapsed() < duration {
            if sender.send(generator.next_frame()).is_err() {
                break;
            }
            thread::sleep(interval);
        }
        debug!(frames = generator.count(), "Camera stopped");
    });
    (receiver, handle)
}
