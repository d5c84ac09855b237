//! RNNoise-backed denoising of a captured answer buffer.
//!
//! Strength selects a linear mix between the raw capture and the full
//! RNNoise output, so 0.0 is exactly the identity and 1.0 is the full
//! suppression pass. A fresh denoiser state is built per call; identical
//! input and strength always produce identical output.

use crate::logging::log_debug;
use nnnoiseless::DenoiseState;

/// Derived denoising artifact. `noise` is the reference output at strength
/// 0.0, kept alongside the cleaned buffer for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenoiseResult {
    pub denoised: Vec<i16>,
    pub noise: Vec<i16>,
    pub sample_rate: u32,
}

/// Denoise `samples` at the given strength, clamped to [0.0, 1.0].
///
/// Degenerate input (shorter than one RNNoise frame) falls back to
/// pass-through for both outputs rather than failing the session.
pub fn denoise(samples: &[i16], sample_rate: u32, strength: f32) -> DenoiseResult {
    let strength = strength.clamp(0.0, 1.0);
    DenoiseResult {
        denoised: apply_strength(samples, strength),
        noise: apply_strength(samples, 0.0),
        sample_rate,
    }
}

fn apply_strength(samples: &[i16], strength: f32) -> Vec<i16> {
    if strength == 0.0 {
        return samples.to_vec();
    }
    if samples.len() < DenoiseState::FRAME_SIZE {
        log_debug(&format!(
            "buffer of {} samples is shorter than one denoise frame; passing through",
            samples.len()
        ));
        return samples.to_vec();
    }

    let reduced = rnnoise_pass(samples);
    samples
        .iter()
        .zip(reduced.iter())
        .map(|(&raw, &clean)| {
            let raw = f32::from(raw);
            let mixed = raw + strength * (clean - raw);
            mixed.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
        })
        .collect()
}

/// Full-strength RNNoise pass. The tail frame is zero-padded and the output
/// truncated back, so the result length always equals the input length.
fn rnnoise_pass(samples: &[i16]) -> Vec<f32> {
    const FRAME_SIZE: usize = DenoiseState::FRAME_SIZE;

    let mut state = DenoiseState::new();
    let mut output = Vec::with_capacity(samples.len());
    let mut in_frame = [0.0f32; FRAME_SIZE];
    let mut out_frame = [0.0f32; FRAME_SIZE];

    for chunk in samples.chunks(FRAME_SIZE) {
        // RNNoise works on f32 samples in the 16-bit PCM range.
        for (slot, &sample) in in_frame.iter_mut().zip(chunk.iter()) {
            *slot = f32::from(sample);
        }
        for slot in in_frame.iter_mut().skip(chunk.len()) {
            *slot = 0.0;
        }
        state.process_frame(&mut out_frame, &in_frame);
        output.extend_from_slice(&out_frame[..chunk.len()]);
    }

    output
}
