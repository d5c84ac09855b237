//! Mono 16-bit WAV artifacts for captured answers.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Write a mono PCM buffer as a 16-bit WAV file. An empty buffer still
/// produces a valid zero-duration artifact.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create WAV file {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("failed to finalize WAV file {}", path.display()))?;
    Ok(())
}

/// Read a 16-bit WAV file as mono samples. Stereo files keep the left
/// channel, matching the capture pipeline's downmix policy.
pub fn read_wav(path: &Path) -> Result<(Vec<i16>, u32)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .with_context(|| format!("failed to decode WAV file {}", path.display()))?;
    let samples = if spec.channels == 2 {
        samples.into_iter().step_by(2).collect()
    } else {
        samples
    };
    Ok((samples, spec.sample_rate))
}
