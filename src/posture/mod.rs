//! Posture and gaze analysis over recorded interview video.
//!
//! Landmarks come from an external pose estimator through the
//! `PoseDetector` seam; the engine applies independent geometric rules per
//! frame, keeps the previous torso position for the stability check, and
//! aggregates everything into a mistake log and a final summary.

#[cfg(feature = "video")]
pub mod annotate;
mod engine;
mod landmarks;
mod report;
mod rules;
mod stream;
#[cfg(test)]
mod tests;

pub use engine::{FrameSink, FrameSource, PoseDetector, PostureAnalysisEngine};
pub use landmarks::{Landmark, LandmarkFrame, LandmarkKind};
pub use report::{AnalysisSummary, GazeTotal, MistakeLog, MistakeTotal};
pub use rules::{GazeLabel, Mistake};
pub use stream::RecordedDetections;
