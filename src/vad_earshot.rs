//! Earshot-powered voice activity detector adapter implementing `SpeechClassifier`.

use crate::audio::SpeechClassifier;
use anyhow::{anyhow, Result};
use earshot::{VoiceActivityDetector, VoiceActivityProfile};

/// Thin wrapper that adapts `earshot` to the crate's `SpeechClassifier` trait.
pub struct EarshotClassifier {
    detector: VoiceActivityDetector,
    chunk_samples: usize,
    scratch: Vec<i16>,
}

impl EarshotClassifier {
    pub fn new(sample_rate: u32, chunk_ms: u64) -> Self {
        // Earshot accepts 10/20/30 ms windows; longer configured chunks are
        // classified on their leading window.
        let window_ms = chunk_ms.clamp(10, 30) as usize;
        let chunk_samples = ((sample_rate as usize) * window_ms) / 1000;
        Self {
            detector: VoiceActivityDetector::new(VoiceActivityProfile::QUALITY),
            chunk_samples: chunk_samples.max(80),
            scratch: Vec::new(),
        }
    }
}

impl SpeechClassifier for EarshotClassifier {
    fn is_speech(&mut self, chunk: &[i16], sample_rate: u32) -> Result<bool> {
        if chunk.is_empty() {
            return Ok(false);
        }
        self.scratch.clear();
        self.scratch.extend_from_slice(chunk);
        self.scratch.resize(self.chunk_samples, 0);

        let window = &self.scratch[..self.chunk_samples];
        let verdict = match sample_rate {
            8_000 => self.detector.predict_8khz(window),
            16_000 => self.detector.predict_16khz(window),
            32_000 => self.detector.predict_32khz(window),
            48_000 => self.detector.predict_48khz(window),
            other => return Err(anyhow!("earshot does not support {other} Hz")),
        };
        verdict.map_err(|err| anyhow!("earshot prediction failed: {err:?}"))
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn name(&self) -> &'static str {
        "earshot_classifier"
    }
}
