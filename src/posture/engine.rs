//! Frame loop that applies the posture rules and aggregates a session report.
//!
//! The engine is synchronous and processes frames strictly in arrival order;
//! the stability rule needs the previous frame's torso positions, so frames
//! cannot be reordered or classified in parallel. All per-run state lives in
//! the `analyze` call, which keeps independent engine instances safe to run
//! concurrently over different videos.

use super::landmarks::LandmarkFrame;
use super::report::{AnalysisSummary, MistakeLog};
use super::rules::{
    check_back_straightness, check_head_tilt, check_knee_spread, check_stability, estimate_gaze,
    GazeLabel, Mistake, StabilityState,
};
use crate::config::{PostureThresholds, FALLBACK_FPS};
use crate::logging::log_debug;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// External pose-estimation capability. `Ok(None)` means no person was
/// detected in the frame; an `Err` mid-stream counts as no detection for
/// that frame only and never aborts the run.
pub trait PoseDetector<F> {
    fn detect(&mut self, frame: &F) -> Result<Option<LandmarkFrame>>;
}

/// Ordered frame supply for one video. Opening the underlying source happens
/// in the adapter's constructor, so a source that cannot be opened fails the
/// call before any frame is consumed.
pub trait FrameSource {
    type Frame;

    /// Frames per second reported by the container, or a fallback.
    fn fps(&self) -> f64;

    /// Next frame, or `None` once the source is exhausted.
    fn read(&mut self) -> Result<Option<Self::Frame>>;
}

/// Optional annotated-output sink. Every input frame is written exactly
/// once: annotated when a detection exists, passed through untouched
/// otherwise, so the output frame count always equals the input's.
pub trait FrameSink<F> {
    fn write_raw(&mut self, frame: &F) -> Result<()>;
    fn write_annotated(
        &mut self,
        frame: &F,
        landmarks: &LandmarkFrame,
        mistakes: &[Mistake],
        gaze: GazeLabel,
    ) -> Result<()>;
}

/// Posture and gaze classifier for recorded interview videos.
pub struct PostureAnalysisEngine {
    thresholds: PostureThresholds,
}

impl PostureAnalysisEngine {
    pub fn new(thresholds: PostureThresholds) -> Self {
        Self { thresholds }
    }

    /// Consume every frame of `source`, apply the rules, and produce the
    /// mistake log at `log_path` plus the aggregate summary. When `sink` is
    /// given, an annotated copy of each frame is written to it.
    pub fn analyze<S, D>(
        &self,
        source: &mut S,
        detector: &mut D,
        log_path: &Path,
        mut sink: Option<&mut dyn FrameSink<S::Frame>>,
    ) -> Result<AnalysisSummary>
    where
        S: FrameSource,
        D: PoseDetector<S::Frame>,
    {
        let fps = match source.fps() {
            fps if fps.is_finite() && fps > 0.0 => fps,
            _ => FALLBACK_FPS,
        };
        let mut log = MistakeLog::create(log_path)?;

        let mut stability: Option<StabilityState> = None;
        let mut mistake_counts: BTreeMap<Mistake, u64> = BTreeMap::new();
        let mut gaze_counts: BTreeMap<GazeLabel, u64> = BTreeMap::new();
        let mut valid_frames: u64 = 0;
        let mut frame_idx: u64 = 0;

        while let Some(frame) = source.read()? {
            frame_idx += 1;
            let timestamp = frame_idx as f64 / fps;

            let detection = match detector.detect(&frame) {
                Ok(detection) => detection,
                Err(err) => {
                    log_debug(&format!(
                        "pose detection failed at frame {frame_idx}: {err:#}"
                    ));
                    None
                }
            };

            match detection {
                Some(landmarks) => {
                    valid_frames += 1;

                    let mut mistakes = Vec::new();
                    for verdict in [
                        check_stability(&landmarks, &mut stability, frame_idx, &self.thresholds),
                        check_knee_spread(&landmarks, &self.thresholds),
                        check_back_straightness(&landmarks, &self.thresholds),
                        check_head_tilt(&landmarks, &self.thresholds),
                    ]
                    .into_iter()
                    .flatten()
                    {
                        mistakes.push(verdict);
                        *mistake_counts.entry(verdict).or_default() += 1;
                    }

                    let gaze = estimate_gaze(&landmarks, &self.thresholds);
                    *gaze_counts.entry(gaze).or_default() += 1;

                    if !mistakes.is_empty() {
                        log.record(timestamp, &mistakes)?;
                    }
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.write_annotated(&frame, &landmarks, &mistakes, gaze)?;
                    }
                }
                None => {
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.write_raw(&frame)?;
                    }
                }
            }
        }

        let summary = AnalysisSummary::from_counts(
            &mistake_counts,
            &gaze_counts,
            valid_frames,
            frame_idx,
            fps,
        );
        log.write_summary(&summary)?;
        tracing::debug!(
            total_frames = summary.total_frames,
            valid_frames = summary.valid_frames,
            "analysis complete"
        );
        Ok(summary)
    }
}
