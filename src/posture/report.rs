//! Mistake log file and the end-of-run aggregate summary.

use super::rules::{GazeLabel, Mistake};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Lifetime totals for one mistake message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MistakeTotal {
    pub message: String,
    pub count: u64,
    /// Detected frames expressed as seconds of video.
    pub seconds: f64,
}

/// Lifetime totals for one gaze label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GazeTotal {
    pub label: String,
    pub count: u64,
    /// Share of frames with a valid detection, in percent.
    pub percent: f64,
}

/// Aggregate result of one analysis run. Computed once when the frame source
/// is exhausted, never incrementally.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub mistakes: Vec<MistakeTotal>,
    pub gaze: Vec<GazeTotal>,
    pub valid_frames: u64,
    pub total_frames: u64,
    pub fps: f64,
    pub duration_secs: f64,
}

impl AnalysisSummary {
    pub(super) fn from_counts(
        mistake_counts: &BTreeMap<Mistake, u64>,
        gaze_counts: &BTreeMap<GazeLabel, u64>,
        valid_frames: u64,
        total_frames: u64,
        fps: f64,
    ) -> Self {
        let mistakes = mistake_counts
            .iter()
            .map(|(&mistake, &count)| MistakeTotal {
                message: mistake.message().to_string(),
                count,
                seconds: count as f64 / fps,
            })
            .collect();
        let gaze = if valid_frames > 0 {
            gaze_counts
                .iter()
                .map(|(&label, &count)| GazeTotal {
                    label: label.label().to_string(),
                    count,
                    percent: count as f64 / valid_frames as f64 * 100.0,
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            mistakes,
            gaze,
            valid_frames,
            total_frames,
            fps,
            duration_secs: total_frames as f64 / fps,
        }
    }
}

/// Append-only mistake log. The file is truncated when the log is created,
/// at the start of each analysis run.
pub struct MistakeLog {
    writer: BufWriter<File>,
}

impl MistakeLog {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory {}", parent.display())
                })?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create mistake log {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// One line per mistake at the frame's timestamp.
    pub fn record(&mut self, timestamp_secs: f64, mistakes: &[Mistake]) -> Result<()> {
        for mistake in mistakes {
            writeln!(self.writer, "{timestamp_secs:.2} sec: {}", mistake.message())
                .context("failed to append to mistake log")?;
        }
        Ok(())
    }

    /// Append the summary block and flush the log.
    pub fn write_summary(&mut self, summary: &AnalysisSummary) -> Result<()> {
        let w = &mut self.writer;
        writeln!(w, "\n\n--- analysis summary ---")?;
        writeln!(w, "[posture mistakes]")?;
        for total in &summary.mistakes {
            writeln!(
                w,
                "- {}: {} frames ({:.2} s)",
                total.message, total.count, total.seconds
            )?;
        }
        writeln!(w, "\n[gaze analysis]")?;
        if summary.valid_frames > 0 {
            for total in &summary.gaze {
                writeln!(
                    w,
                    "- {}: {} frames ({:.1}%)",
                    total.label, total.count, total.percent
                )?;
            }
        } else {
            writeln!(w, "no landmarks detected")?;
        }
        writeln!(w, "\n[total video duration] {:.2} s", summary.duration_secs)?;
        w.flush().context("failed to flush mistake log")?;
        Ok(())
    }
}
