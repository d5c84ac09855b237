use crate::logging::log_debug;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Downmix interleaved device channels to mono 16-bit PCM while applying the
/// provided converter, so the session buffer holds one channel regardless of
/// the microphone layout.
pub(super) fn append_mono_i16<T, F>(buf: &mut Vec<i16>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(|sample| to_i16(convert(sample))));
        return;
    }

    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(to_i16(acc / channels as f32));
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(to_i16(acc / count as f32));
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32_767.0) as i16
}

/// Slice a mismatched chunk back to the expected mono width.
///
/// A chunk exactly twice the expected length is a stereo capture feeding a
/// mono pipeline; keep the left channel. Any other length is logged and
/// passed through unchanged.
pub(super) fn normalize_chunk(chunk: Vec<i16>, expected_samples: usize) -> Vec<i16> {
    if chunk.len() == expected_samples {
        return chunk;
    }
    if chunk.len() == 2 * expected_samples {
        return chunk.into_iter().step_by(2).collect();
    }
    log_debug(&format!(
        "unexpected chunk of {} samples, expected {expected_samples}; passing through",
        chunk.len()
    ));
    chunk
}

/// Accumulates callback buffers into fixed-size chunks and hands them to the
/// capture loop over a bounded channel. Runs inside the audio callback, so a
/// full channel drops the chunk instead of blocking.
pub(super) struct ChunkDispatcher {
    chunk_samples: usize,
    pending: Vec<i16>,
    scratch: Vec<i16>,
    sender: Sender<Vec<i16>>,
    dropped: Arc<AtomicUsize>,
}

impl ChunkDispatcher {
    pub(super) fn new(
        chunk_samples: usize,
        sender: Sender<Vec<i16>>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            chunk_samples: chunk_samples.max(1),
            pending: Vec::with_capacity(chunk_samples),
            scratch: Vec::new(),
            sender,
            dropped,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        append_mono_i16(&mut self.scratch, data, channels, convert);
        self.pending.extend_from_slice(&self.scratch);

        while self.pending.len() >= self.chunk_samples {
            let chunk: Vec<i16> = self.pending.drain(..self.chunk_samples).collect();
            if let Err(err) = self.sender.try_send(chunk) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => break,
                }
            }
        }
    }
}
