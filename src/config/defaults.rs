//! Default values shared between the CLI surface and the typed configs.

use super::ClassifierKind;

pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_CHUNK_MS: u64 = 30;
pub const DEFAULT_SILENCE_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_DENOISE_STRENGTH: f32 = 0.7;
pub const DEFAULT_ENERGY_THRESHOLD_DB: f32 = -55.0;

/// Headroom added above the measured ambient level when calibrating the
/// energy classifier.
pub const CALIBRATION_MARGIN_DB: f32 = 6.0;

pub const DEFAULT_MIC_METER_MS: u64 = 1_500;
pub const MIN_MIC_METER_SAMPLE_MS: u64 = 250;
pub const MAX_MIC_METER_SAMPLE_MS: u64 = 10_000;

/// Hard ceiling on the non-speech timeout so a misconfigured session cannot
/// wait forever for silence.
pub const MAX_SILENCE_TIMEOUT_MS: u64 = 600_000;

// Posture rule thresholds, in normalized frame coordinates.
pub const DEFAULT_VISIBILITY_FLOOR: f32 = 0.1;
pub const DEFAULT_GAZE_VISIBILITY_FLOOR: f32 = 0.2;
pub const DEFAULT_SWAY_DISPLACEMENT: f32 = 0.05;
pub const DEFAULT_KNEE_RATIO: f32 = 1.2;
pub const DEFAULT_SHOULDER_LEVEL: f32 = 0.04;
pub const DEFAULT_BODY_LEAN: f32 = 0.06;
pub const DEFAULT_EAR_LEVEL: f32 = 0.03;
pub const DEFAULT_GAZE_HORIZONTAL: f32 = 0.04;
pub const DEFAULT_GAZE_VERTICAL: f32 = 0.03;

/// Frames after which a stored stability reference is considered stale and no
/// longer compared against.
pub const DEFAULT_STABILITY_STALE_FRAMES: u64 = 30;

/// Frame rate assumed when a video container reports none.
pub const FALLBACK_FPS: f64 = 30.0;

pub fn default_classifier() -> ClassifierKind {
    #[cfg(feature = "vad_earshot")]
    {
        ClassifierKind::Earshot
    }
    #[cfg(not(feature = "vad_earshot"))]
    {
        ClassifierKind::Energy
    }
}
