//! Capture session: the delay buffer, its compositer and the recording
//! consumer of one capture screen.

use crate::preferences::{CapturePreferences, RecordingMode};
use crate::recorder::{FrameSink, RecordingConsumer, RecordingSettings};
use replay_composite::{
    CompositeConfiguration, CompositeType, CompositedFrame, Compositer, DelayComposite,
};
use replay_core::memory_budget::PIPELINE_RING_FRAMES;
use replay_core::{Frame, ImageDescriptor, ReplayError, Result};
use replay_delay::Delayer;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Slowest slow motion rate accepted from the UI.
const MIN_REFRESH_RATE: f32 = 0.01;

struct CachedComposite {
    configuration: CompositeConfiguration,
    composite: Box<dyn DelayComposite>,
}

pub struct CaptureSession {
    short_id: String,
    preferences: CapturePreferences,
    shared: bool,
    descriptor: Option<ImageDescriptor>,
    delayer: Arc<Delayer>,
    compositer: Compositer,
    /// Composites not currently installed in the compositer, by type.
    composites: HashMap<CompositeType, CachedComposite>,
    configuration: CompositeConfiguration,
    consumer: Option<RecordingConsumer>,
    recording: bool,
    delay: usize,
    camera_frequency: f64,
}

impl CaptureSession {
    pub fn new(preferences: CapturePreferences) -> Self {
        let short_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let configuration = preferences.composite;
        let mut compositer = Compositer::new();
        compositer.reset_composite(configuration.build());

        debug!(id = %short_id, composite = ?configuration.composite_type, "Capture session created");
        Self {
            short_id,
            preferences,
            shared: false,
            descriptor: None,
            delayer: Arc::new(Delayer::new()),
            compositer,
            composites: HashMap::new(),
            configuration,
            consumer: None,
            recording: false,
            delay: 0,
            camera_frequency: 0.0,
        }
    }

    pub fn short_id(&self) -> &str {
        &self.short_id
    }

    pub fn preferences(&self) -> &CapturePreferences {
        &self.preferences
    }

    pub fn delayer(&self) -> &Arc<Delayer> {
        &self.delayer
    }

    pub fn compositer(&self) -> &Compositer {
        &self.compositer
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn recording_mode(&self) -> RecordingMode {
        self.preferences.recording_mode
    }

    /// Geometry of the incoming frames changed.
    pub fn set_image_descriptor(&mut self, descriptor: ImageDescriptor) -> Result<bool> {
        self.descriptor = Some(descriptor);
        self.allocate_delayer()
    }

    /// Whether another capture screen shares the memory budget.
    pub fn set_shared(&mut self, shared: bool) -> Result<bool> {
        self.shared = shared;
        self.allocate_delayer()
    }

    /// Change the memory given to the delay buffer, in MiB.
    pub fn set_memory_buffer(&mut self, megabytes: usize) -> Result<bool> {
        self.preferences.memory_buffer_mb = megabytes;
        self.allocate_delayer()
    }

    /// Size the delay buffer and the compositer for the current input.
    ///
    /// The recording consumer is stopped for the duration of the
    /// reallocation and restarted afterwards. Fails with `PipelineActive` if
    /// another handle on the delayer is still alive. Returns false if the
    /// buffers could not be allocated.
    pub fn allocate_delayer(&mut self) -> Result<bool> {
        let Some(descriptor) = self.descriptor else {
            return Ok(false);
        };

        let budget = self.preferences.available_memory(self.shared, &descriptor);
        if !self.delayer.needs_reallocation(&descriptor, budget) {
            return Ok(true);
        }

        let restart_consumer = self.consumer.is_some();
        self.deactivate_consumer();

        let Some(delayer) = Arc::get_mut(&mut self.delayer) else {
            if restart_consumer {
                self.activate_consumer()?;
            }
            return Err(ReplayError::PipelineActive(
                "Delay buffer is still referenced outside the session".into(),
            ));
        };
        let allocated = delayer.allocate_buffers(&descriptor, budget);
        let max_age = delayer.max_age();

        let allocated = allocated && self.compositer.allocate(&descriptor, max_age);
        self.delay = self.delay.min(max_age);

        if restart_consumer {
            self.activate_consumer()?;
        }

        info!(
            id = %self.short_id,
            budget,
            shared = self.shared,
            max_age,
            allocated,
            "Delay buffer reallocated"
        );
        Ok(allocated)
    }

    /// Start the thread that feeds the delay buffer and records from it.
    pub fn activate_consumer(&mut self) -> Result<()> {
        if self.consumer.is_some() {
            return Ok(());
        }
        let consumer = RecordingConsumer::activate(
            &self.short_id,
            Arc::clone(&self.delayer),
            PIPELINE_RING_FRAMES,
        )?;
        self.consumer = Some(consumer);
        Ok(())
    }

    /// Stop the consumer thread once its queue is drained.
    ///
    /// Returns the number of frames written by its last recording.
    pub fn deactivate_consumer(&mut self) -> u64 {
        let Some(mut consumer) = self.consumer.take() else {
            return 0;
        };
        consumer.deactivate();
        self.recording = false;
        consumer.frames_recorded()
    }

    pub fn consumer(&self) -> Option<&RecordingConsumer> {
        self.consumer.as_ref()
    }

    /// Hand a camera frame to the pipeline.
    ///
    /// Goes through the recording consumer when one is active, straight into
    /// the delay buffer otherwise.
    pub fn submit_frame(&self, frame: Frame) -> bool {
        match &self.consumer {
            Some(consumer) => consumer.submit(frame),
            None => self.delayer.push(&frame),
        }
    }

    /// Frame to show in the viewport at the current delay.
    ///
    /// In display recording mode a copy also goes to the recording.
    pub fn display_frame(&mut self) -> Option<CompositedFrame<'_>> {
        let frame = self.compositer.get(&self.delayer, self.delay)?;
        if self.recording && self.preferences.recording_mode == RecordingMode::Display {
            if let Some(consumer) = &self.consumer {
                if !consumer.submit_displayed(Frame::clone(&frame)) {
                    debug!(id = %self.short_id, "Displayed frame not recorded");
                }
            }
        }
        Some(frame)
    }

    /// Install the composite described by `configuration`.
    ///
    /// A composite previously used for the same type is reused as long as its
    /// configuration did not change, so that it keeps its state.
    pub fn change_composite(&mut self, configuration: CompositeConfiguration) {
        let composite = match self.composites.remove(&configuration.composite_type) {
            Some(cached) if cached.configuration == configuration => cached.composite,
            _ => configuration.build(),
        };

        let previous = self.compositer.reset_composite(composite);
        self.composites.insert(
            previous.composite_type(),
            CachedComposite {
                configuration: self.configuration,
                composite: previous,
            },
        );

        info!(
            id = %self.short_id,
            composite = self.compositer.composite().name(),
            "Composite changed"
        );
        self.configuration = configuration;
        self.preferences.composite = configuration;
    }

    pub fn composite_configuration(&self) -> &CompositeConfiguration {
        &self.configuration
    }

    /// Set the display delay in frames, clamped to the history available.
    pub fn delay_changed(&mut self, age: f64) -> usize {
        let max_age = self.delayer.max_age();
        self.delay = (age.round().max(0.0) as usize).min(max_age);
        self.delay
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Change the slow motion rate. Ignored by other composites.
    pub fn refresh_rate_changed(&mut self, rate: f32) -> f32 {
        let rate = rate.max(MIN_REFRESH_RATE);
        if let Some(slow_motion) = self.compositer.composite_mut().as_slow_motion_mut() {
            slow_motion.update_refresh_rate(rate);
            self.configuration.refresh_rate = rate;
            self.preferences.composite.refresh_rate = rate;
        }
        rate
    }

    /// Restart the slow motion from the live frame.
    pub fn force_sync(&mut self) {
        if let Some(slow_motion) = self.compositer.composite_mut().as_slow_motion_mut() {
            slow_motion.sync();
            debug!(id = %self.short_id, "Slow motion synchronized");
        }
    }

    /// Frames left before the slow motion catches up with the live frame.
    pub fn slow_motion_countdown(&self) -> Option<usize> {
        self.compositer
            .composite()
            .as_slow_motion()
            .map(|slow_motion| slow_motion.countdown())
    }

    /// Measured camera rate in Hz.
    pub fn set_camera_frequency(&mut self, frequency: f64) {
        self.camera_frequency = frequency;
    }

    /// Duration of `age` frames of delay, for display.
    ///
    /// In camera mode the buffer is fed at the display rate, otherwise it
    /// receives every camera frame.
    pub fn age_to_seconds(&self, age: usize) -> f64 {
        let framerate = match self.preferences.recording_mode {
            RecordingMode::Camera => self.preferences.display_framerate,
            RecordingMode::Delay | RecordingMode::Display => self.camera_frequency,
        };
        if framerate <= 0.0 {
            return 0.0;
        }
        age as f64 / framerate
    }

    /// Start recording according to the recording mode: camera frames as
    /// they arrive, frames at the current delay, or what the viewport shows.
    ///
    /// `interval_ms` is the camera frame interval.
    pub fn start_recording(&mut self, sink: Box<dyn FrameSink>, interval_ms: f64) -> Result<()> {
        let consumer = self.consumer.as_ref().ok_or_else(|| {
            ReplayError::InvalidParameter("Recording needs an active consumer".into())
        })?;
        let age = match self.preferences.recording_mode {
            RecordingMode::Delay => self.delay,
            RecordingMode::Camera | RecordingMode::Display => 0,
        };
        let settings = RecordingSettings::new(interval_ms, age, &self.preferences);
        consumer.start_record(sink, settings)?;
        self.recording = true;
        Ok(())
    }

    pub fn stop_recording(&mut self) -> Result<()> {
        self.recording = false;
        match &self.consumer {
            Some(consumer) => consumer.stop_record(),
            None => {
                warn!(id = %self.short_id, "No recording to stop");
                Ok(())
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.deactivate_consumer();
    }
}
