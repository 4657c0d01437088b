//! Capture preferences and the delay buffer memory policy.

use replay_composite::CompositeConfiguration;
use replay_core::memory_budget::{DEFAULT_MEMORY_BUFFER_MB, MIB, PIPELINE_RING_FRAMES};
use replay_core::{ImageDescriptor, ReplayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What gets written to file while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordingMode {
    /// Frames straight from the camera; the delay buffer is fed at display rate.
    Camera,
    /// Frames pulled from the delay buffer at the current delay.
    #[default]
    Delay,
    /// What the viewport shows.
    Display,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturePreferences {
    /// Memory given to the delay buffer, in MiB.
    pub memory_buffer_mb: usize,
    /// Display refresh rate in Hz.
    pub display_framerate: f64,
    pub recording_mode: RecordingMode,
    pub composite: CompositeConfiguration,
    /// Camera rate from which recordings are written at `highspeed_output_fps`.
    pub highspeed_threshold_fps: f64,
    pub highspeed_output_fps: f64,
}

impl Default for CapturePreferences {
    fn default() -> Self {
        Self {
            memory_buffer_mb: DEFAULT_MEMORY_BUFFER_MB,
            display_framerate: 25.0,
            recording_mode: RecordingMode::Delay,
            composite: CompositeConfiguration::default(),
            highspeed_threshold_fps: 150.0,
            highspeed_output_fps: 30.0,
        }
    }
}

impl CapturePreferences {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            ReplayError::Serialization(format!("Failed to parse capture preferences: {e}"))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ReplayError::Serialization(format!("Failed to serialize capture preferences: {e}"))
        })
    }

    /// Load preferences from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save preferences to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Default preferences file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("replay")
            .join("capture.json")
    }

    /// Bytes the delay buffer may use for frames of `descriptor`.
    ///
    /// Halved when two capture screens share the memory, minus the frames
    /// held by the upstream pipeline.
    pub fn available_memory(&self, shared: bool, descriptor: &ImageDescriptor) -> usize {
        let total = self.memory_buffer_mb.saturating_mul(MIB);
        let available = if shared { total / 2 } else { total };
        available.saturating_sub(PIPELINE_RING_FRAMES * descriptor.bytes_per_frame())
    }
}
