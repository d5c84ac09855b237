//! Capture session state machine: chunk bookkeeping and the stop decision.
//!
//! A session has no fixed wall-clock limit; it ends when the trailing
//! non-speech counter reaches the configured timeout, or when the caller
//! cancels it.

use super::chunker::normalize_chunk;
use super::classifier::SpeechClassifier;
use crate::config::CaptureConfig;
use crate::logging::log_debug;

/// Metrics collected during a capture session for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMetrics {
    pub capture_ms: u64,
    pub speech_ms: u64,
    pub silence_tail_ms: u64,
    pub chunks_processed: usize,
    pub chunks_dropped: usize,
    pub stop_reason: StopReason,
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self {
            capture_ms: 0,
            speech_ms: 0,
            silence_tail_ms: 0,
            chunks_processed: 0,
            chunks_dropped: 0,
            stop_reason: StopReason::Cancelled,
        }
    }
}

/// Why a capture session became inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    SilenceTimeout { tail_ms: u64 },
    Cancelled,
    StreamClosed,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::SilenceTimeout { .. } => "silence_timeout",
            StopReason::Cancelled => "cancelled",
            StopReason::StreamClosed => "stream_closed",
        }
    }
}

/// Caller-facing result: the ordered mono PCM buffer plus metrics.
#[derive(Debug, Clone, Default)]
pub struct CaptureResult {
    pub samples: Vec<i16>,
    pub metrics: CaptureMetrics,
}

/// Tracks trailing non-speech duration and decides when the answer is over.
///
/// Per chunk: speech resets the non-speech counter, non-speech advances it by
/// one chunk duration. The session stops once the counter reaches the
/// configured timeout, so the stop decision lags real silence by at most one
/// chunk.
pub(super) struct SilenceTracker {
    timeout_ms: u64,
    chunk_ms: u64,
    silence_ms: u64,
    speech_ms: u64,
    total_ms: u64,
}

impl SilenceTracker {
    pub(super) fn new(cfg: &CaptureConfig) -> Self {
        Self {
            timeout_ms: cfg.silence_timeout_ms,
            chunk_ms: cfg.chunk_ms,
            silence_ms: 0,
            speech_ms: 0,
            total_ms: 0,
        }
    }

    pub(super) fn on_chunk(&mut self, is_speech: bool) -> Option<StopReason> {
        if is_speech {
            self.speech_ms = self.speech_ms.saturating_add(self.chunk_ms);
            self.silence_ms = 0;
        } else {
            self.silence_ms = self.silence_ms.saturating_add(self.chunk_ms);
        }
        self.total_ms = self.total_ms.saturating_add(self.chunk_ms);

        if self.silence_ms >= self.timeout_ms {
            return Some(StopReason::SilenceTimeout {
                tail_ms: self.silence_ms,
            });
        }
        None
    }

    pub(super) fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub(super) fn speech_ms(&self) -> u64 {
        self.speech_ms
    }

    pub(super) fn silence_tail_ms(&self) -> u64 {
        self.silence_ms
    }
}

/// Run the endpointing state machine over an already-materialized chunk
/// sequence: recorded WAV files, synthetic test input, anything that does not
/// need a live device.
pub fn run_capture_loop<I>(
    chunks: I,
    cfg: &CaptureConfig,
    classifier: &mut dyn SpeechClassifier,
) -> CaptureResult
where
    I: IntoIterator<Item = Vec<i16>>,
{
    let expected_samples = cfg.chunk_samples();
    let mut tracker = SilenceTracker::new(cfg);
    let mut metrics = CaptureMetrics::default();
    let mut samples = Vec::new();
    let mut stop_reason = StopReason::StreamClosed;

    for chunk in chunks {
        let chunk = normalize_chunk(chunk, expected_samples);
        samples.extend_from_slice(&chunk);
        let is_speech = classify_chunk(classifier, &chunk, cfg.sample_rate);
        metrics.chunks_processed += 1;
        if let Some(reason) = tracker.on_chunk(is_speech) {
            stop_reason = reason;
            break;
        }
    }

    metrics.capture_ms = tracker.total_ms();
    metrics.speech_ms = tracker.speech_ms();
    metrics.silence_tail_ms = tracker.silence_tail_ms();
    metrics.stop_reason = stop_reason;

    CaptureResult { samples, metrics }
}

/// Classify one chunk, treating a classifier failure as non-speech for that
/// chunk only.
pub(super) fn classify_chunk(
    classifier: &mut dyn SpeechClassifier,
    chunk: &[i16],
    sample_rate: u32,
) -> bool {
    match classifier.is_speech(chunk, sample_rate) {
        Ok(is_speech) => is_speech,
        Err(err) => {
            log_debug(&format!(
                "classifier {} failed for one chunk: {err:#}",
                classifier.name()
            ));
            false
        }
    }
}

/// Emit structured capture metrics in the debug log.
/// Format: `capture_metrics|capture_ms=...|speech_ms=...|silence_tail_ms=...|chunks_processed=...|chunks_dropped=...|stop=...`
pub(crate) fn log_capture_metrics(metrics: &CaptureMetrics) {
    log_debug(&format!(
        "capture_metrics|capture_ms={}|speech_ms={}|silence_tail_ms={}|chunks_processed={}|chunks_dropped={}|stop={}",
        metrics.capture_ms,
        metrics.speech_ms,
        metrics.silence_tail_ms,
        metrics.chunks_processed,
        metrics.chunks_dropped,
        metrics.stop_reason.label()
    ));
}
