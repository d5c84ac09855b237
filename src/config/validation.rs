use super::{
    AppConfig, ClassifierKind, PostureThresholds, MAX_MIC_METER_SAMPLE_MS, MAX_SILENCE_TIMEOUT_MS,
    MIN_MIC_METER_SAMPLE_MS,
};
use anyhow::{bail, Result};
use clap::Parser;

/// Sample rates the Earshot classifier can consume directly.
const EARSHOT_SAMPLE_RATES: [u32; 4] = [8_000, 16_000, 32_000, 48_000];

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any device or file is opened.
    pub fn validate(&self) -> Result<()> {
        if !(8_000..=48_000).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between 8000 and 48000 Hz, got {}",
                self.sample_rate
            );
        }
        if self.classifier == ClassifierKind::Earshot
            && !EARSHOT_SAMPLE_RATES.contains(&self.sample_rate)
        {
            bail!(
                "--classifier earshot supports sample rates {EARSHOT_SAMPLE_RATES:?}, got {}",
                self.sample_rate
            );
        }
        #[cfg(not(feature = "vad_earshot"))]
        if self.classifier == ClassifierKind::Earshot {
            bail!("--classifier earshot requires a build with the 'vad_earshot' feature");
        }
        if !(10..=120).contains(&self.chunk_ms) {
            bail!("--chunk-ms must be between 10 and 120, got {}", self.chunk_ms);
        }
        if self.silence_timeout_ms < self.chunk_ms
            || self.silence_timeout_ms > MAX_SILENCE_TIMEOUT_MS
        {
            bail!(
                "--silence-timeout-ms must be between --chunk-ms ({}) and {MAX_SILENCE_TIMEOUT_MS}, got {}",
                self.chunk_ms,
                self.silence_timeout_ms
            );
        }
        if !(0.0..=1.0).contains(&self.denoise_strength) {
            bail!(
                "--denoise-strength must be between 0.0 and 1.0, got {}",
                self.denoise_strength
            );
        }
        if !(8..=1024).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between 8 and 1024, got {}",
                self.channel_capacity
            );
        }
        if !(-120.0..=0.0).contains(&self.energy_threshold_db) {
            bail!(
                "--energy-threshold-db must be between -120.0 and 0.0 dB, got {}",
                self.energy_threshold_db
            );
        }
        if !(MIN_MIC_METER_SAMPLE_MS..=MAX_MIC_METER_SAMPLE_MS).contains(&self.mic_meter_ms) {
            bail!(
                "--mic-meter-ms must be between {MIN_MIC_METER_SAMPLE_MS} and {MAX_MIC_METER_SAMPLE_MS} ms"
            );
        }
        if self.analyze.is_some() && self.landmarks.is_none() {
            bail!("--analyze requires --landmarks with per-frame detections");
        }
        if self.annotated_out.is_some() && self.analyze.is_none() {
            bail!("--annotated-out requires --analyze");
        }
        Ok(())
    }
}

impl PostureThresholds {
    /// Reject threshold files that would make the rules vacuous.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("visibility_floor", self.visibility_floor),
            ("gaze_visibility_floor", self.gaze_visibility_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be between 0.0 and 1.0, got {value}");
            }
        }
        for (name, value) in [
            ("sway_displacement", self.sway_displacement),
            ("knee_ratio", self.knee_ratio),
            ("shoulder_level", self.shoulder_level),
            ("body_lean", self.body_lean),
            ("ear_level", self.ear_level),
            ("gaze_horizontal", self.gaze_horizontal),
            ("gaze_vertical", self.gaze_vertical),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("{name} must be a positive number, got {value}");
            }
        }
        if self.stability_stale_frames == 0 {
            bail!("stability_stale_frames must be at least 1");
        }
        Ok(())
    }
}
