//! Speech/non-speech classification for capture endpointing.
//!
//! The capture loop only needs a per-chunk boolean; everything else (timeout
//! bookkeeping, buffering) lives in the session state machine.

use anyhow::Result;

const SILENCE_FLOOR_DB: f32 = -60.0;

/// Per-chunk speech classifier consumed by the capture loop.
///
/// # Chunk Size Contract
/// Implementations may require specific chunk sizes. Earshot, for example,
/// expects 10 ms, 20 ms, or 30 ms of samples at one of its supported rates.
/// Chunk size in samples = (sample_rate * chunk_duration_ms) / 1000.
///
/// A classifier error is a transient failure of the external capability; the
/// capture loop treats the chunk as non-speech and keeps going.
pub trait SpeechClassifier {
    fn is_speech(&mut self, chunk: &[i16], sample_rate: u32) -> Result<bool>;
    fn reset(&mut self) {}
    fn name(&self) -> &'static str {
        "unknown_classifier"
    }
}

/// Lightweight RMS-energy classifier. Used when Earshot is disabled or
/// unavailable, and as the calibration target for the mic meter.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    threshold_db: f32,
}

impl EnergyClassifier {
    pub fn new(threshold_db: f32) -> Self {
        Self { threshold_db }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Set the speech threshold a fixed margin above the measured ambient
    /// level, so a noisy room does not read as continuous speech.
    pub fn calibrate(&mut self, ambient: &[i16], margin_db: f32) {
        if ambient.is_empty() {
            return;
        }
        self.threshold_db = rms_db(ambient) + margin_db;
    }
}

impl SpeechClassifier for EnergyClassifier {
    fn is_speech(&mut self, chunk: &[i16], _sample_rate: u32) -> Result<bool> {
        if chunk.is_empty() {
            return Ok(false);
        }
        Ok(rms_db(chunk) >= self.threshold_db)
    }

    fn name(&self) -> &'static str {
        "energy_classifier"
    }
}

/// RMS level of a 16-bit PCM buffer in decibels relative to full scale.
pub fn rms_db(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return SILENCE_FLOOR_DB;
    }
    let energy: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = f64::from(s) / 32_768.0;
            normalized * normalized
        })
        .sum::<f64>()
        / samples.len() as f64;
    let rms = energy.sqrt().max(1e-6);
    (20.0 * rms.log10()) as f32
}
