//! Command-line parsing, typed sub-configs, and validation helpers.

mod defaults;
mod validation;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use defaults::{
    default_classifier, CALIBRATION_MARGIN_DB, DEFAULT_BODY_LEAN, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_CHUNK_MS, DEFAULT_DENOISE_STRENGTH, DEFAULT_EAR_LEVEL, DEFAULT_ENERGY_THRESHOLD_DB,
    DEFAULT_GAZE_HORIZONTAL, DEFAULT_GAZE_VERTICAL, DEFAULT_GAZE_VISIBILITY_FLOOR,
    DEFAULT_KNEE_RATIO, DEFAULT_MIC_METER_MS, DEFAULT_SAMPLE_RATE, DEFAULT_SHOULDER_LEVEL,
    DEFAULT_SILENCE_TIMEOUT_MS, DEFAULT_STABILITY_STALE_FRAMES, DEFAULT_SWAY_DISPLACEMENT,
    DEFAULT_VISIBILITY_FLOOR, FALLBACK_FPS, MAX_MIC_METER_SAMPLE_MS, MAX_SILENCE_TIMEOUT_MS,
    MIN_MIC_METER_SAMPLE_MS,
};

/// CLI options for the rehearsal capture and analysis tool. Validated values
/// keep the capture and analysis pipelines inside safe bounds.
#[derive(Debug, Parser, Clone)]
#[command(about = "Interview answer capture and posture analysis", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Sample the ambient noise level and suggest an energy threshold, then exit
    #[arg(long = "mic-meter", default_value_t = false)]
    pub mic_meter: bool,

    /// Ambient sample duration for the mic meter (milliseconds)
    #[arg(long = "mic-meter-ms", default_value_t = DEFAULT_MIC_METER_MS)]
    pub mic_meter_ms: u64,

    /// Record one spoken answer to this WAV path
    #[arg(long, value_name = "WAV")]
    pub record: Option<PathBuf>,

    /// Re-run the denoiser over an existing WAV artifact
    #[arg(long = "denoise-wav", value_name = "WAV")]
    pub denoise_wav: Option<PathBuf>,

    /// Analyze a recorded interview video (requires the `video` feature)
    #[arg(long, value_name = "VIDEO")]
    pub analyze: Option<PathBuf>,

    /// JSON-lines file of per-frame landmark detections for --analyze
    #[arg(long, value_name = "JSONL")]
    pub landmarks: Option<PathBuf>,

    /// Mistake log output path for --analyze
    #[arg(long = "mistake-log", default_value = "mistakes.log")]
    pub mistake_log: PathBuf,

    /// Write an annotated copy of the analyzed video to this path
    #[arg(long = "annotated-out", value_name = "VIDEO")]
    pub annotated_out: Option<PathBuf>,

    /// Print the analysis summary as JSON on stdout
    #[arg(long = "summary-json", default_value_t = false)]
    pub summary_json: bool,

    /// TOML file overriding the posture rule thresholds
    #[arg(long = "thresholds", value_name = "TOML")]
    pub thresholds_path: Option<PathBuf>,

    /// Capture sample rate (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Audio chunk duration (milliseconds)
    #[arg(long = "chunk-ms", default_value_t = DEFAULT_CHUNK_MS)]
    pub chunk_ms: u64,

    /// Trailing non-speech duration that ends a capture (milliseconds)
    #[arg(long = "silence-timeout-ms", default_value_t = DEFAULT_SILENCE_TIMEOUT_MS)]
    pub silence_timeout_ms: u64,

    /// Denoise strength applied when the capture stops (0.0 = pass-through)
    #[arg(long = "denoise-strength", default_value_t = DEFAULT_DENOISE_STRENGTH)]
    pub denoise_strength: f32,

    /// Chunk channel capacity between the audio callback and the capture loop
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Speech classifier implementation to use
    #[arg(long = "classifier", value_enum, default_value_t = default_classifier())]
    pub classifier: ClassifierKind,

    /// Speech threshold for the energy classifier (decibels)
    #[arg(long = "energy-threshold-db", default_value_t = DEFAULT_ENERGY_THRESHOLD_DB)]
    pub energy_threshold_db: f32,

    /// Enable debug file logging
    #[arg(long = "logs", env = "REHEARSE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs)
    #[arg(long = "no-logs", env = "REHEARSE_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

impl AppConfig {
    /// Build the typed capture config consumed by the audio pipeline.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            chunk_ms: self.chunk_ms,
            silence_timeout_ms: self.silence_timeout_ms,
            channel_capacity: self.channel_capacity,
            classifier: self.classifier,
            energy_threshold_db: self.energy_threshold_db,
        }
    }

    /// Load posture thresholds from the configured file, or fall back to the
    /// built-in defaults.
    pub fn posture_thresholds(&self) -> Result<PostureThresholds> {
        let thresholds = match &self.thresholds_path {
            Some(path) => PostureThresholds::load(path)?,
            None => PostureThresholds::default(),
        };
        thresholds.validate()?;
        Ok(thresholds)
    }
}

/// Tunable parameters for the silence-endpointed capture pipeline.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub chunk_ms: u64,
    pub silence_timeout_ms: u64,
    pub channel_capacity: usize,
    pub classifier: ClassifierKind,
    pub energy_threshold_db: f32,
}

impl CaptureConfig {
    /// Samples per chunk at the configured rate.
    pub fn chunk_samples(&self) -> usize {
        ((u64::from(self.sample_rate) * self.chunk_ms) / 1000).max(1) as usize
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_ms: DEFAULT_CHUNK_MS,
            silence_timeout_ms: DEFAULT_SILENCE_TIMEOUT_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            classifier: default_classifier(),
            energy_threshold_db: DEFAULT_ENERGY_THRESHOLD_DB,
        }
    }
}

/// Available runtime-selectable speech classifier implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassifierKind {
    Earshot,
    Energy,
}

impl ClassifierKind {
    pub fn label(self) -> &'static str {
        match self {
            ClassifierKind::Earshot => "earshot",
            ClassifierKind::Energy => "energy",
        }
    }
}

/// Thresholds for the posture and gaze rules, in normalized frame
/// coordinates. Loadable from a TOML file so the rules stay tunable without
/// recompiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureThresholds {
    /// Minimum landmark visibility before a posture rule trusts it.
    pub visibility_floor: f32,
    /// Stricter visibility floor applied by the gaze rule.
    pub gaze_visibility_floor: f32,
    /// Mean shoulder/hip displacement between frames that counts as swaying.
    pub sway_displacement: f32,
    /// Knee separation over shoulder separation ratio that counts as too wide.
    pub knee_ratio: f32,
    /// Vertical shoulder offset that counts as an uneven back.
    pub shoulder_level: f32,
    /// Shoulder-midpoint vs hip-midpoint horizontal offset that counts as leaning.
    pub body_lean: f32,
    /// Vertical ear offset that counts as a sideways head tilt.
    pub ear_level: f32,
    /// Horizontal nose offset from the eye midpoint that moves the gaze label.
    pub gaze_horizontal: f32,
    /// Vertical nose offset from the eye midpoint that moves the gaze label.
    pub gaze_vertical: f32,
    /// Frames after which the stability reference is discarded as stale.
    pub stability_stale_frames: u64,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            visibility_floor: DEFAULT_VISIBILITY_FLOOR,
            gaze_visibility_floor: DEFAULT_GAZE_VISIBILITY_FLOOR,
            sway_displacement: DEFAULT_SWAY_DISPLACEMENT,
            knee_ratio: DEFAULT_KNEE_RATIO,
            shoulder_level: DEFAULT_SHOULDER_LEVEL,
            body_lean: DEFAULT_BODY_LEAN,
            ear_level: DEFAULT_EAR_LEVEL,
            gaze_horizontal: DEFAULT_GAZE_HORIZONTAL,
            gaze_vertical: DEFAULT_GAZE_VERTICAL,
            stability_stale_frames: DEFAULT_STABILITY_STALE_FRAMES,
        }
    }
}

impl PostureThresholds {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read thresholds file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse thresholds file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize thresholds")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write thresholds file {}", path.display()))?;
        Ok(())
    }
}
