//! Microphone endpointing via CPAL.
//!
//! `start()` spawns the capture loop on its own thread and returns once the
//! input stream is live; the loop appends chunks to the session buffer and
//! stops itself when the trailing non-speech duration reaches the configured
//! timeout. `stop()` cancels a still-running loop, joins it, denoises the
//! buffer, and writes the WAV artifact.

use super::capture::{
    classify_chunk, log_capture_metrics, CaptureMetrics, CaptureResult, SilenceTracker, StopReason,
};
use super::chunker::{append_mono_i16, normalize_chunk, ChunkDispatcher};
use super::classifier::SpeechClassifier;
use super::denoise::denoise;
use super::resample::{convert_chunk_to_target, resample_buffer};
use super::wav::write_wav;
use crate::config::CaptureConfig;
use crate::logging::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One in-flight capture session. The loop thread owns the stream and the
/// sample buffer; the handle only carries the shared `active` flag and the
/// completion signal.
struct SessionHandle {
    active: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    handle: thread::JoinHandle<CaptureResult>,
}

/// Audio input endpointer. Owns the CPAL device and at most one capture
/// session at a time.
pub struct Endpointer {
    device: cpal::Device,
    cfg: CaptureConfig,
    session: Option<SessionHandle>,
}

impl Endpointer {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create an endpointer, optionally forcing a specific device so users
    /// can pick the right microphone when the machine exposes several.
    pub fn new(cfg: CaptureConfig, preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self {
            device,
            cfg,
            session: None,
        })
    }

    /// Name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Whether a capture loop is currently consuming chunks.
    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.active.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Begin a capture session. Idempotent: calling `start` while a session
    /// exists is a no-op. Returns once the input stream is live, or with the
    /// open error if the device is unavailable.
    pub fn start(&mut self, classifier: Box<dyn SpeechClassifier + Send>) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let active = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (done_tx, done_rx) = bounded::<()>(1);
        let device = self.device.clone();
        let cfg = self.cfg.clone();
        let loop_active = active.clone();

        let handle = thread::spawn(move || {
            let result = run_live_capture(device, cfg, classifier, loop_active, ready_tx);
            let _ = done_tx.send(());
            result
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log_debug("capture session started");
                self.session = Some(SessionHandle {
                    active,
                    done_rx,
                    handle,
                });
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(anyhow!("capture thread exited before the stream was ready"))
            }
        }
    }

    /// Request an early stop. Observed cooperatively by the capture loop at
    /// its next chunk iteration.
    pub fn cancel(&self) {
        if let Some(session) = &self.session {
            session.active.store(false, Ordering::Release);
        }
    }

    /// Block until the capture loop exits on its own (silence timeout or
    /// stream failure) without cancelling it.
    pub fn wait(&self) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .context("no capture session in progress")?;
        let _ = session.done_rx.recv();
        Ok(())
    }

    /// End the session: cancel a still-running loop, join it, denoise the
    /// buffered audio at the given strength, and write the WAV artifact.
    /// A session that captured nothing still produces a valid empty file.
    pub fn stop(&mut self, denoise_strength: f32, output: &Path) -> Result<PathBuf> {
        let session = self
            .session
            .take()
            .context("no capture session to stop")?;
        session.active.store(false, Ordering::Release);
        let result = session
            .handle
            .join()
            .map_err(|_| anyhow!("capture thread panicked"))?;
        log_capture_metrics(&result.metrics);

        let cleaned = denoise(&result.samples, self.cfg.sample_rate, denoise_strength);
        write_wav(output, &cleaned.denoised, cleaned.sample_rate)?;
        tracing::debug!(
            samples = cleaned.denoised.len(),
            path = %output.display(),
            "capture artifact written"
        );
        Ok(output.to_path_buf())
    }

    /// Record for a fixed duration without endpointing, normalized to the
    /// configured rate. Used by the mic meter and ambient calibration.
    pub fn record_for(&self, duration: Duration) -> Result<Vec<i16>> {
        let default_config = self.device.default_input_config()?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let device_sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        let expected_samples =
            (duration.as_secs_f64() * f64::from(device_sample_rate)).ceil() as usize;
        let buffer = Arc::new(Mutex::new(Vec::<i16>::with_capacity(expected_samples)));
        let buffer_clone = buffer.clone();

        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));
        let stream = match format {
            SampleFormat::F32 => self.device.build_input_stream(
                &device_config,
                move |data: &[f32], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_mono_i16(&mut buf, data, channels, |sample| sample);
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_mono_i16(&mut buf, data, channels, |sample| {
                            f32::from(sample) / 32_768.0
                        });
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => self.device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_mono_i16(&mut buf, data, channels, |sample| {
                            (f32::from(sample) - 32_768.0) / 32_768.0
                        });
                    }
                },
                err_fn,
                None,
            )?,
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play()?;
        thread::sleep(duration);
        if let Err(err) = stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(stream);

        let samples = buffer
            .lock()
            .map_err(|_| anyhow!("audio buffer lock poisoned"))?;
        Ok(resample_buffer(
            &samples,
            device_sample_rate,
            self.cfg.sample_rate,
        ))
    }
}

/// Capture loop body. Builds and plays the input stream on this thread,
/// reports readiness (or the open error) through `ready`, then consumes
/// chunks until timeout or cancellation.
fn run_live_capture(
    device: cpal::Device,
    cfg: CaptureConfig,
    mut classifier: Box<dyn SpeechClassifier + Send>,
    active: Arc<AtomicBool>,
    ready: Sender<Result<()>>,
) -> CaptureResult {
    let setup = build_chunk_stream(&device, &cfg);
    let (stream, receiver, dropped, device_sample_rate) = match setup {
        Ok(parts) => parts,
        Err(err) => {
            active.store(false, Ordering::Release);
            let _ = ready.send(Err(err));
            return CaptureResult::default();
        }
    };
    if let Err(err) = stream.play() {
        active.store(false, Ordering::Release);
        let _ = ready.send(Err(err.into()));
        return CaptureResult::default();
    }
    let _ = ready.send(Ok(()));

    let target_samples = cfg.chunk_samples();
    let mut tracker = SilenceTracker::new(&cfg);
    let mut metrics = CaptureMetrics::default();
    let mut samples = Vec::new();
    let mut stop_reason = None;
    let wait_time = Duration::from_millis(cfg.chunk_ms);

    while stop_reason.is_none() {
        if !active.load(Ordering::Acquire) {
            stop_reason = Some(StopReason::Cancelled);
            break;
        }
        match receiver.recv_timeout(wait_time) {
            Ok(chunk) => {
                let chunk = convert_chunk_to_target(
                    chunk,
                    device_sample_rate,
                    cfg.sample_rate,
                    target_samples,
                );
                let chunk = normalize_chunk(chunk, target_samples);
                samples.extend_from_slice(&chunk);
                let is_speech = classify_chunk(classifier.as_mut(), &chunk, cfg.sample_rate);
                metrics.chunks_processed += 1;
                if let Some(reason) = tracker.on_chunk(is_speech) {
                    stop_reason = Some(reason);
                }
            }
            // A stalled device produces no chunk; keep waiting so
            // cancellation stays observable.
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                stop_reason = Some(StopReason::StreamClosed);
            }
        }
    }

    active.store(false, Ordering::Release);
    if let Err(err) = stream.pause() {
        log_debug(&format!("failed to pause audio stream: {err}"));
    }
    drop(stream);

    metrics.capture_ms = tracker.total_ms();
    metrics.speech_ms = tracker.speech_ms();
    metrics.silence_tail_ms = tracker.silence_tail_ms();
    metrics.chunks_dropped = dropped.load(Ordering::Relaxed);
    metrics.stop_reason = stop_reason.unwrap_or(StopReason::Cancelled);

    CaptureResult { samples, metrics }
}

type ChunkStream = (
    cpal::Stream,
    Receiver<Vec<i16>>,
    Arc<AtomicUsize>,
    u32,
);

fn build_chunk_stream(device: &cpal::Device, cfg: &CaptureConfig) -> Result<ChunkStream> {
    let default_config = device
        .default_input_config()
        .context("failed to query input device config")?;
    let format = default_config.sample_format();
    let device_config: StreamConfig = default_config.into();
    let device_sample_rate = device_config.sample_rate.0;
    let channels = usize::from(device_config.channels.max(1));
    let device_chunk_samples =
        ((u64::from(device_sample_rate) * cfg.chunk_ms) / 1000).max(1) as usize;

    log_debug(&format!(
        "capture config: format={format:?} sample_rate={device_sample_rate}Hz channels={channels} chunk_samples={device_chunk_samples}"
    ));

    let (sender, receiver) = bounded::<Vec<i16>>(cfg.channel_capacity.max(1));
    let dropped = Arc::new(AtomicUsize::new(0));
    let dispatcher = Arc::new(Mutex::new(ChunkDispatcher::new(
        device_chunk_samples,
        sender,
        dropped.clone(),
    )));

    let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));
    let stream = match format {
        SampleFormat::F32 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            device.build_input_stream(
                &device_config,
                move |data: &[f32], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, channels, |sample| sample);
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::I16 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, channels, |sample| f32::from(sample) / 32_768.0);
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, channels, |sample| {
                            (f32::from(sample) - 32_768.0) / 32_768.0
                        });
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )?
        }
        other => return Err(anyhow!("unsupported sample format: {other:?}")),
    };

    Ok((stream, receiver, dropped, device_sample_rate))
}
