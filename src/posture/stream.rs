//! Pre-computed detection streams.
//!
//! External pose estimators run out of process; their per-frame output
//! reaches the engine as a JSON-lines file, one record per video frame:
//!
//! ```text
//! {"landmarks": [{"name": "nose", "x": 0.5, "y": 0.3, "visibility": 0.97}, ...]}
//! {"landmarks": null}
//! ```
//!
//! `null` (or a missing trailing line) is a frame with no detection.
//! Landmark names the rules do not know are skipped.

use super::engine::PoseDetector;
use super::landmarks::{Landmark, LandmarkFrame, LandmarkKind};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct DetectionRecord {
    landmarks: Option<Vec<LandmarkRecord>>,
}

#[derive(Debug, Deserialize)]
struct LandmarkRecord {
    name: String,
    x: f32,
    y: f32,
    #[serde(default)]
    visibility: f32,
}

/// Detector adapter that replays a recorded JSON-lines detection stream in
/// frame order.
pub struct RecordedDetections {
    lines: Lines<BufReader<File>>,
}

impl RecordedDetections {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open detections file {}", path.display()))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl<F> PoseDetector<F> for RecordedDetections {
    fn detect(&mut self, _frame: &F) -> Result<Option<LandmarkFrame>> {
        let line = match self.lines.next() {
            // More video frames than detection records: no detection.
            None => return Ok(None),
            Some(line) => line.context("failed to read detections line")?,
        };
        if line.trim().is_empty() {
            return Ok(None);
        }
        let record: DetectionRecord =
            serde_json::from_str(&line).context("malformed detections line")?;
        Ok(record.landmarks.map(|entries| {
            let mut frame = LandmarkFrame::default();
            for entry in entries {
                if let Some(kind) = LandmarkKind::from_name(&entry.name) {
                    frame.set(
                        kind,
                        Landmark {
                            x: entry.x,
                            y: entry.y,
                            visibility: entry.visibility,
                        },
                    );
                }
            }
            frame
        }))
    }
}
