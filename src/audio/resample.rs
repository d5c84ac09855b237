//! Sample-rate conversion between the device rate and the artifact rate.
//!
//! Linear interpolation is enough here: the classifier and the WAV artifact
//! only need speech-band content, and chunks are short.

pub(super) fn resample_linear_i16(input: &[i16], output_len: usize) -> Vec<i16> {
    if output_len == 0 {
        return Vec::new();
    }
    if input.is_empty() {
        return vec![0; output_len];
    }
    if input.len() == output_len {
        return input.to_vec();
    }

    let last = (input.len() - 1) as f32;
    let step = last / (output_len.max(2) - 1) as f32;
    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let pos = (i as f32 * step).min(last);
        let idx = pos as usize;
        let frac = pos - idx as f32;
        let a = f32::from(input[idx]);
        let b = f32::from(input[(idx + 1).min(input.len() - 1)]);
        output.push((a + (b - a) * frac).round() as i16);
    }
    output
}

/// Bring one device-rate chunk to exactly `target_samples` at the configured
/// rate, padding or truncating when the rates already match.
pub(super) fn convert_chunk_to_target(
    chunk: Vec<i16>,
    device_rate: u32,
    target_rate: u32,
    target_samples: usize,
) -> Vec<i16> {
    if device_rate == target_rate {
        let mut chunk = chunk;
        chunk.resize(target_samples, 0);
        return chunk;
    }
    resample_linear_i16(&chunk, target_samples)
}

/// Resample a whole buffer from the device rate to the target rate.
pub(super) fn resample_buffer(samples: &[i16], device_rate: u32, target_rate: u32) -> Vec<i16> {
    if device_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let output_len = ((samples.len() as u64 * u64::from(target_rate)) / u64::from(device_rate))
        .max(1) as usize;
    resample_linear_i16(samples, output_len)
}
