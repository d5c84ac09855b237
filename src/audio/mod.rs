//! Answer capture pipeline: VAD-gated endpointing, denoising, and WAV
//! artifacts.
//!
//! Chunks are captured via CPAL, downmixed to mono 16-bit PCM, and appended
//! to the session buffer until the speech classifier reports enough trailing
//! silence. The stopped session is denoised and persisted as a mono WAV.

mod capture;
mod chunker;
mod classifier;
mod denoise;
mod endpointer;
mod resample;
mod wav;

pub use capture::{run_capture_loop, CaptureMetrics, CaptureResult, StopReason};
pub use classifier::{rms_db, EnergyClassifier, SpeechClassifier};
pub use denoise::{denoise, DenoiseResult};
pub use endpointer::Endpointer;
pub use wav::{read_wav, write_wav};

use crate::config::{CaptureConfig, ClassifierKind};

/// Build the configured speech classifier implementation.
pub fn create_classifier(cfg: &CaptureConfig) -> Box<dyn SpeechClassifier + Send> {
    match cfg.classifier {
        ClassifierKind::Energy => Box::new(EnergyClassifier::new(cfg.energy_threshold_db)),
        ClassifierKind::Earshot => {
            #[cfg(feature = "vad_earshot")]
            {
                Box::new(crate::vad_earshot::EarshotClassifier::new(
                    cfg.sample_rate,
                    cfg.chunk_ms,
                ))
            }
            #[cfg(not(feature = "vad_earshot"))]
            {
                unreachable!("earshot classifier requested without 'vad_earshot' feature")
            }
        }
    }
}
