//! Recording consumer: feeds the delay buffer and writes recorded frames.
//!
//! The consumer owns a thread that receives camera frames over a bounded
//! channel and pushes each one into the delayer. While recording, what it
//! hands to the [`FrameSink`] depends on the [`RecordingMode`]:
//!
//! - `Camera`: the camera frame itself, before any delay.
//! - `Delay`: the frame at the configured age, copied out with a strong read.
//! - `Display`: the composited frames sent by the display path.
//!
//! Commands travel on the same channel as frames so that they apply between
//! two frames in submission order.

use crate::preferences::{CapturePreferences, RecordingMode};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use replay_core::{Frame, ImageDescriptor, ReplayError, Result};
use replay_delay::Delayer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Parameters of one recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingSettings {
    /// Camera frame interval in milliseconds.
    pub interval_ms: f64,
    /// Delay of the recorded frames, in `Delay` mode.
    pub age: usize,
    pub mode: RecordingMode,
    pub highspeed_threshold_fps: f64,
    pub highspeed_output_fps: f64,
}

impl RecordingSettings {
    pub fn new(interval_ms: f64, age: usize, preferences: &CapturePreferences) -> Self {
        Self {
            interval_ms,
            age,
            mode: preferences.recording_mode,
            highspeed_threshold_fps: preferences.highspeed_threshold_fps,
            highspeed_output_fps: preferences.highspeed_output_fps,
        }
    }

    /// Frame interval written in the file.
    ///
    /// High speed captures are written at the output framerate so that they
    /// play back as slow motion.
    pub fn file_interval(&self) -> f64 {
        if self.interval_ms <= 0.0 || self.highspeed_output_fps <= 0.0 {
            return self.interval_ms;
        }

        let fps = 1000.0 / self.interval_ms;
        if fps >= self.highspeed_threshold_fps {
            1000.0 / self.highspeed_output_fps
        } else {
            self.interval_ms
        }
    }
}

/// Destination of recorded frames.
pub trait FrameSink: Send {
    fn open(&mut self, descriptor: &ImageDescriptor, settings: &RecordingSettings) -> Result<()>;

    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Keeps recorded frames in memory.
#[derive(Default, Clone)]
pub struct MemorySink {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle on the recorded frames.
    pub fn frames(&self) -> Arc<Mutex<Vec<Frame>>> {
        Arc::clone(&self.frames)
    }
}

impl FrameSink for MemorySink {
    fn open(&mut self, _descriptor: &ImageDescriptor, _settings: &RecordingSettings) -> Result<()> {
        self.frames.lock().clear();
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.lock().push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct RawHeader<'a> {
    descriptor: &'a ImageDescriptor,
    interval_ms: f64,
    file_interval_ms: f64,
}

/// Writes a one-line JSON header followed by raw frame data.
pub struct RawFileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    frames_written: u64,
}

impl RawFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            frames_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl FrameSink for RawFileSink {
    fn open(&mut self, descriptor: &ImageDescriptor, settings: &RecordingSettings) -> Result<()> {
        let header = RawHeader {
            descriptor,
            interval_ms: settings.interval_ms,
            file_interval_ms: settings.file_interval(),
        };
        let json = serde_json::to_string(&header)
            .map_err(|e| ReplayError::Serialization(format!("Failed to write header: {e}")))?;

        let mut writer = BufWriter::new(File::create(&self.path)?);
        writeln!(writer, "{json}")?;
        self.writer = Some(writer);
        self.frames_written = 0;
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ReplayError::Internal("Recording file is not open".into()))?;
        writer.write_all(frame.data())?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

enum Message {
    Frame(Frame),
    Displayed(Frame),
    StartRecord {
        sink: Box<dyn FrameSink>,
        settings: RecordingSettings,
    },
    StopRecord,
    Deactivate,
}

/// Handle on the recording consumer thread.
///
/// The thread holds a clone of the delayer `Arc`; deactivate the consumer
/// before reallocating the delay buffer.
pub struct RecordingConsumer {
    short_id: String,
    sender: Sender<Message>,
    active: Arc<AtomicBool>,
    recording: Arc<AtomicBool>,
    frames_recorded: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl RecordingConsumer {
    /// Spawn the consumer thread. At most `queue_size` frames wait in line.
    pub fn activate(short_id: &str, delayer: Arc<Delayer>, queue_size: usize) -> Result<Self> {
        let (sender, receiver) = bounded(queue_size.max(1));
        let active = Arc::new(AtomicBool::new(true));
        let recording = Arc::new(AtomicBool::new(false));
        let frames_recorded = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            short_id: short_id.to_string(),
            delayer,
            sink: None,
            delayed: None,
            age: 0,
            mode: RecordingMode::Delay,
            recording: Arc::clone(&recording),
            frames_recorded: Arc::clone(&frames_recorded),
        };
        let thread_active = Arc::clone(&active);
        let handle = std::thread::Builder::new()
            .name(format!("replay-consumer-{short_id}"))
            .spawn(move || {
                worker.run(receiver);
                thread_active.store(false, Ordering::Release);
            })?;

        debug!(id = short_id, "Recording consumer activated");
        Ok(Self {
            short_id: short_id.to_string(),
            sender,
            active,
            recording,
            frames_recorded,
            handle: Some(handle),
        })
    }

    /// Queue a camera frame. Returns false if the queue is full or the
    /// consumer has stopped.
    pub fn submit(&self, frame: Frame) -> bool {
        match self.sender.try_send(Message::Frame(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => {
                self.active.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Queue a composited frame for a `Display` mode recording. Dropped if
    /// the queue is full.
    pub fn submit_displayed(&self, frame: Frame) -> bool {
        self.sender.try_send(Message::Displayed(frame)).is_ok()
    }

    /// Start writing frames to `sink` as `settings.mode` dictates.
    pub fn start_record(&self, sink: Box<dyn FrameSink>, settings: RecordingSettings) -> Result<()> {
        self.send(Message::StartRecord { sink, settings })
    }

    pub fn stop_record(&self) -> Result<()> {
        self.send(Message::StopRecord)
    }

    fn send(&self, message: Message) -> Result<()> {
        self.sender.send(message).map_err(|_| {
            ReplayError::Internal(format!("Recording consumer {} has stopped", self.short_id))
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded.load(Ordering::Relaxed)
    }

    /// Stop the thread after the queued frames and wait for it.
    pub fn deactivate(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.sender.send(Message::Deactivate);
        if handle.join().is_err() {
            error!(id = %self.short_id, "Recording consumer panicked");
        }
        self.active.store(false, Ordering::Release);
        debug!(id = %self.short_id, "Recording consumer deactivated");
    }
}

impl Drop for RecordingConsumer {
    fn drop(&mut self) {
        self.deactivate();
    }
}

struct Worker {
    short_id: String,
    delayer: Arc<Delayer>,
    sink: Option<Box<dyn FrameSink>>,
    delayed: Option<Frame>,
    age: usize,
    mode: RecordingMode,
    recording: Arc<AtomicBool>,
    frames_recorded: Arc<AtomicU64>,
}

impl Worker {
    fn run(mut self, receiver: Receiver<Message>) {
        while let Ok(message) = receiver.recv() {
            match message {
                Message::Frame(frame) => {
                    if !self.process(&frame) {
                        break;
                    }
                }
                Message::Displayed(frame) => {
                    if self.mode == RecordingMode::Display {
                        self.write(&frame);
                    }
                }
                Message::StartRecord { sink, settings } => self.start_record(sink, settings),
                Message::StopRecord => self.stop_record(),
                Message::Deactivate => break,
            }
        }
        self.stop_record();
    }

    /// Returns false when the consumer must deactivate.
    fn process(&mut self, frame: &Frame) -> bool {
        if !self.delayer.push(frame) {
            error!(id = %self.short_id, "Critical error while pushing frame to delay buffer");
            self.stop_record();
            return false;
        }

        match self.mode {
            RecordingMode::Camera => self.write(frame),
            RecordingMode::Delay => {
                let Some(mut delayed) = self.delayed.take() else {
                    return true;
                };
                // Nothing yet while the history is shorter than the delay.
                if self.delayer.get_strong(self.age, &mut delayed) {
                    self.write(&delayed);
                }
                if self.sink.is_some() {
                    self.delayed = Some(delayed);
                }
            }
            RecordingMode::Display => {}
        }
        true
    }

    fn write(&mut self, frame: &Frame) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.write_frame(frame) {
            warn!(id = %self.short_id, error = %e, "Failed to write recorded frame");
            self.stop_record();
            return;
        }
        self.frames_recorded.fetch_add(1, Ordering::Relaxed);
    }

    fn start_record(&mut self, mut sink: Box<dyn FrameSink>, settings: RecordingSettings) {
        self.stop_record();

        let Some(descriptor) = self.delayer.descriptor().copied() else {
            warn!(id = %self.short_id, "Cannot record before the delay buffer is allocated");
            return;
        };
        let delayed = match settings.mode {
            RecordingMode::Delay => match Frame::try_new(descriptor) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!(id = %self.short_id, error = %e, "Cannot allocate recording frame");
                    return;
                }
            },
            RecordingMode::Camera | RecordingMode::Display => None,
        };
        if let Err(e) = sink.open(&descriptor, &settings) {
            warn!(id = %self.short_id, error = %e, "Cannot open recording sink");
            return;
        }

        if settings.file_interval() != settings.interval_ms {
            debug!(
                fps = 1000.0 / settings.interval_ms,
                output_fps = settings.highspeed_output_fps,
                "High speed recording, forcing output framerate"
            );
        }
        info!(
            id = %self.short_id,
            mode = ?settings.mode,
            age = settings.age,
            "Recording started"
        );

        self.age = settings.age;
        self.mode = settings.mode;
        self.delayed = delayed;
        self.sink = Some(sink);
        self.frames_recorded.store(0, Ordering::Relaxed);
        self.recording.store(true, Ordering::Release);
    }

    fn stop_record(&mut self) {
        self.delayed = None;
        let Some(mut sink) = self.sink.take() else {
            return;
        };
        if let Err(e) = sink.close() {
            warn!(id = %self.short_id, error = %e, "Failed to close recording sink");
        }
        self.recording.store(false, Ordering::Release);
        info!(
            id = %self.short_id,
            frames = self.frames_recorded.load(Ordering::Relaxed),
            "Recording stopped"
        );
    }
}
