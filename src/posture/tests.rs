use super::engine::{FrameSink, FrameSource, PoseDetector, PostureAnalysisEngine};
use super::landmarks::{Landmark, LandmarkFrame, LandmarkKind};
use super::rules::{
    check_back_straightness, check_head_tilt, check_knee_spread, check_stability, estimate_gaze,
    GazeLabel, Mistake,
};
use super::stream::RecordedDetections;
use crate::config::PostureThresholds;
use anyhow::{anyhow, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

fn set(frame: &mut LandmarkFrame, kind: LandmarkKind, x: f32, y: f32, visibility: f32) {
    frame.set(kind, Landmark { x, y, visibility });
}

/// A neutral seated pose with every landmark well visible.
fn full_frame() -> LandmarkFrame {
    let mut frame = LandmarkFrame::default();
    set(&mut frame, LandmarkKind::Nose, 0.50, 0.30, 0.9);
    set(&mut frame, LandmarkKind::LeftEye, 0.53, 0.28, 0.9);
    set(&mut frame, LandmarkKind::RightEye, 0.47, 0.28, 0.9);
    set(&mut frame, LandmarkKind::LeftEar, 0.56, 0.29, 0.9);
    set(&mut frame, LandmarkKind::RightEar, 0.44, 0.29, 0.9);
    set(&mut frame, LandmarkKind::LeftShoulder, 0.60, 0.45, 0.9);
    set(&mut frame, LandmarkKind::RightShoulder, 0.40, 0.45, 0.9);
    set(&mut frame, LandmarkKind::LeftHip, 0.57, 0.70, 0.9);
    set(&mut frame, LandmarkKind::RightHip, 0.43, 0.70, 0.9);
    set(&mut frame, LandmarkKind::LeftKnee, 0.60, 0.90, 0.9);
    set(&mut frame, LandmarkKind::RightKnee, 0.40, 0.90, 0.9);
    frame
}

/// The neutral pose with shoulders and hips shifted horizontally by `dx`.
fn torso_shifted_frame(dx: f32) -> LandmarkFrame {
    let mut frame = full_frame();
    for kind in [
        LandmarkKind::LeftShoulder,
        LandmarkKind::RightShoulder,
        LandmarkKind::LeftHip,
        LandmarkKind::RightHip,
    ] {
        let lm = frame.get(kind).unwrap();
        set(&mut frame, kind, lm.x + dx, lm.y, lm.visibility);
    }
    frame
}

fn thresholds() -> PostureThresholds {
    PostureThresholds::default()
}

struct VecSource {
    total: usize,
    next: usize,
    fps: f64,
}

impl VecSource {
    fn new(total: usize, fps: f64) -> Self {
        Self { total, next: 0, fps }
    }
}

impl FrameSource for VecSource {
    type Frame = usize;

    fn fps(&self) -> f64 {
        self.fps
    }

    fn read(&mut self) -> Result<Option<usize>> {
        if self.next >= self.total {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(self.next - 1))
    }
}

struct VecDetector {
    detections: Vec<Option<LandmarkFrame>>,
}

impl PoseDetector<usize> for VecDetector {
    fn detect(&mut self, frame: &usize) -> Result<Option<LandmarkFrame>> {
        Ok(self.detections.get(*frame).cloned().flatten())
    }
}

/// Fails on one frame index, detects the neutral pose elsewhere.
struct FlakyDetector {
    fail_at: usize,
}

impl PoseDetector<usize> for FlakyDetector {
    fn detect(&mut self, frame: &usize) -> Result<Option<LandmarkFrame>> {
        if *frame == self.fail_at {
            return Err(anyhow!("detector backend crashed"));
        }
        Ok(Some(full_frame()))
    }
}

#[derive(Default)]
struct CountingSink {
    raw: usize,
    annotated: usize,
}

impl FrameSink<usize> for CountingSink {
    fn write_raw(&mut self, _frame: &usize) -> Result<()> {
        self.raw += 1;
        Ok(())
    }

    fn write_annotated(
        &mut self,
        _frame: &usize,
        _landmarks: &LandmarkFrame,
        _mistakes: &[Mistake],
        _gaze: GazeLabel,
    ) -> Result<()> {
        self.annotated += 1;
        Ok(())
    }
}

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("rehearse_posture_{}_{name}", std::process::id()))
}

#[test]
fn identical_frames_never_sway() {
    let t = thresholds();
    let mut previous = None;
    let frame = full_frame();
    assert_eq!(check_stability(&frame, &mut previous, 1, &t), None);
    assert_eq!(check_stability(&frame, &mut previous, 2, &t), None);
}

#[test]
fn displacement_above_threshold_sways() {
    let t = thresholds();
    let mut previous = None;
    assert_eq!(check_stability(&full_frame(), &mut previous, 1, &t), None);
    assert_eq!(
        check_stability(&torso_shifted_frame(0.1), &mut previous, 2, &t),
        Some(Mistake::Swaying)
    );
}

#[test]
fn stability_skips_frames_missing_the_torso() {
    let t = thresholds();
    let mut previous = None;
    assert_eq!(check_stability(&full_frame(), &mut previous, 1, &t), None);

    let mut no_hips = full_frame();
    set(&mut no_hips, LandmarkKind::LeftHip, 0.57, 0.70, 0.05);
    assert_eq!(check_stability(&no_hips, &mut previous, 2, &t), None);

    // The reference from frame 1 is still current, so the shift registers.
    assert_eq!(
        check_stability(&torso_shifted_frame(0.1), &mut previous, 3, &t),
        Some(Mistake::Swaying)
    );
}

#[test]
fn stale_stability_reference_is_not_compared() {
    let mut t = thresholds();
    t.stability_stale_frames = 2;
    let mut previous = None;
    assert_eq!(check_stability(&full_frame(), &mut previous, 1, &t), None);

    // Ten frames later the old reference has aged out; no sway even though
    // the torso moved far.
    assert_eq!(
        check_stability(&torso_shifted_frame(0.2), &mut previous, 11, &t),
        None
    );
    // But the reference was refreshed, so the next shift registers.
    assert_eq!(
        check_stability(&torso_shifted_frame(0.4), &mut previous, 12, &t),
        Some(Mistake::Swaying)
    );
}

#[test]
fn wide_knees_are_flagged() {
    let t = thresholds();
    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::LeftKnee, 0.75, 0.90, 0.9);
    set(&mut frame, LandmarkKind::RightKnee, 0.25, 0.90, 0.9);
    assert_eq!(check_knee_spread(&frame, &t), Some(Mistake::KneesTooWide));
}

#[test]
fn neutral_pose_passes_every_rule() {
    let t = thresholds();
    let frame = full_frame();
    assert_eq!(check_knee_spread(&frame, &t), None);
    assert_eq!(check_back_straightness(&frame, &t), None);
    assert_eq!(check_head_tilt(&frame, &t), None);
    assert_eq!(estimate_gaze(&frame, &t), GazeLabel::Forward);
}

#[test]
fn hidden_knee_skips_the_knee_rule() {
    let t = thresholds();
    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::LeftKnee, 0.75, 0.90, 0.05);
    set(&mut frame, LandmarkKind::RightKnee, 0.25, 0.90, 0.9);
    assert_eq!(check_knee_spread(&frame, &t), None);
}

#[test]
fn uneven_shoulders_flag_the_back() {
    let t = thresholds();
    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::LeftShoulder, 0.60, 0.50, 0.9);
    assert_eq!(check_back_straightness(&frame, &t), Some(Mistake::BentBack));
}

#[test]
fn leaning_torso_flags_the_back() {
    let t = thresholds();
    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::LeftShoulder, 0.67, 0.45, 0.9);
    set(&mut frame, LandmarkKind::RightShoulder, 0.47, 0.45, 0.9);
    assert_eq!(check_back_straightness(&frame, &t), Some(Mistake::BentBack));
}

#[test]
fn tilted_ears_flag_the_head() {
    let t = thresholds();
    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::LeftEar, 0.56, 0.33, 0.9);
    assert_eq!(check_head_tilt(&frame, &t), Some(Mistake::HeadTilted));
}

#[test]
fn gaze_labels_follow_the_nose_offset() {
    let t = thresholds();

    // Mirror view: nose to the image right of the eye midpoint reads as left.
    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::Nose, 0.56, 0.30, 0.9);
    assert_eq!(estimate_gaze(&frame, &t), GazeLabel::Left);

    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::Nose, 0.44, 0.30, 0.9);
    assert_eq!(estimate_gaze(&frame, &t), GazeLabel::Right);

    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::Nose, 0.50, 0.23, 0.9);
    assert_eq!(estimate_gaze(&frame, &t), GazeLabel::Up);

    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::Nose, 0.50, 0.33, 0.9);
    assert_eq!(estimate_gaze(&frame, &t), GazeLabel::Down);

    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::Nose, 0.56, 0.33, 0.9);
    assert_eq!(estimate_gaze(&frame, &t), GazeLabel::DownLeft);
}

#[test]
fn dim_eyes_classify_as_unknown() {
    let t = thresholds();
    let mut frame = full_frame();
    set(&mut frame, LandmarkKind::LeftEye, 0.53, 0.28, 0.15);
    assert_eq!(estimate_gaze(&frame, &t), GazeLabel::Unknown);
}

#[test]
fn step_change_produces_exactly_one_sway_event() {
    // Ten frames at 10 fps; the torso shifts by 0.1 at frame 5 and stays
    // there, so only the transition frame sways.
    let detections: Vec<Option<LandmarkFrame>> = (0..10)
        .map(|i| {
            Some(if i < 4 {
                full_frame()
            } else {
                torso_shifted_frame(0.1)
            })
        })
        .collect();
    let mut source = VecSource::new(10, 10.0);
    let mut detector = VecDetector { detections };
    let log_path = temp_path("scenario_a.log");

    let engine = PostureAnalysisEngine::new(thresholds());
    let summary = engine
        .analyze(&mut source, &mut detector, &log_path, None)
        .expect("analysis succeeds");

    let sway = summary
        .mistakes
        .iter()
        .find(|total| total.message == "body is swaying")
        .expect("sway recorded");
    assert_eq!(sway.count, 1);
    assert!((sway.seconds - 0.1).abs() < 1e-9);

    let log = fs::read_to_string(&log_path).expect("log exists");
    let _ = fs::remove_file(&log_path);
    assert_eq!(log.matches("sec: body is swaying").count(), 1);
    assert!(log.contains("0.50 sec: body is swaying"));
}

#[test]
fn no_detections_yield_the_placeholder_summary() {
    let mut source = VecSource::new(6, 30.0);
    let mut detector = VecDetector {
        detections: vec![None; 6],
    };
    let log_path = temp_path("scenario_c.log");

    let engine = PostureAnalysisEngine::new(thresholds());
    let summary = engine
        .analyze(&mut source, &mut detector, &log_path, None)
        .expect("analysis succeeds");

    assert_eq!(summary.valid_frames, 0);
    assert_eq!(summary.total_frames, 6);
    assert!(summary.mistakes.is_empty());
    assert!(summary.gaze.is_empty());
    assert!((summary.duration_secs - 6.0 / 30.0).abs() < 1e-9);

    let log = fs::read_to_string(&log_path).expect("log exists");
    let _ = fs::remove_file(&log_path);
    assert!(log.contains("no landmarks detected"));
    assert!(!log.contains("sec:"));
}

#[test]
fn gaze_percentages_sum_to_one_hundred() {
    let mut detections = Vec::new();
    for _ in 0..4 {
        detections.push(Some(full_frame()));
    }
    for _ in 0..3 {
        let mut frame = full_frame();
        set(&mut frame, LandmarkKind::Nose, 0.56, 0.30, 0.9);
        detections.push(Some(frame));
    }
    for _ in 0..3 {
        let mut frame = full_frame();
        set(&mut frame, LandmarkKind::LeftEye, 0.53, 0.28, 0.15);
        detections.push(Some(frame));
    }

    let mut source = VecSource::new(10, 30.0);
    let mut detector = VecDetector { detections };
    let log_path = temp_path("gaze_mix.log");

    let engine = PostureAnalysisEngine::new(thresholds());
    let summary = engine
        .analyze(&mut source, &mut detector, &log_path, None)
        .expect("analysis succeeds");
    let _ = fs::remove_file(&log_path);

    assert_eq!(summary.valid_frames, 10);
    let total_percent: f64 = summary.gaze.iter().map(|total| total.percent).sum();
    assert!((total_percent - 100.0).abs() < 1e-6);
    assert!(summary
        .gaze
        .iter()
        .any(|total| total.label == "gaze: unknown" && total.count == 3));

    let mistake_frames: u64 = summary.mistakes.iter().map(|total| total.count).sum();
    assert!(mistake_frames <= summary.valid_frames * Mistake::ALL.len() as u64);
}

#[test]
fn detector_error_skips_only_that_frame() {
    let mut source = VecSource::new(3, 30.0);
    let mut detector = FlakyDetector { fail_at: 1 };
    let log_path = temp_path("flaky.log");

    let engine = PostureAnalysisEngine::new(thresholds());
    let summary = engine
        .analyze(&mut source, &mut detector, &log_path, None)
        .expect("analysis continues past the failure");
    let _ = fs::remove_file(&log_path);

    assert_eq!(summary.total_frames, 3);
    assert_eq!(summary.valid_frames, 2);
}

#[test]
fn sink_gets_every_frame_exactly_once() {
    let detections = vec![
        Some(full_frame()),
        None,
        Some(full_frame()),
        None,
        Some(full_frame()),
    ];
    let mut source = VecSource::new(5, 30.0);
    let mut detector = VecDetector { detections };
    let mut sink = CountingSink::default();
    let log_path = temp_path("sink.log");

    let engine = PostureAnalysisEngine::new(thresholds());
    engine
        .analyze(&mut source, &mut detector, &log_path, Some(&mut sink))
        .expect("analysis succeeds");
    let _ = fs::remove_file(&log_path);

    assert_eq!(sink.annotated, 3);
    assert_eq!(sink.raw, 2);
    assert_eq!(sink.annotated + sink.raw, 5);
}

#[test]
fn stability_survives_a_detection_gap() {
    let detections = vec![
        Some(full_frame()),
        None,
        Some(torso_shifted_frame(0.1)),
    ];
    let mut source = VecSource::new(3, 30.0);
    let mut detector = VecDetector { detections };
    let log_path = temp_path("gap.log");

    let engine = PostureAnalysisEngine::new(thresholds());
    let summary = engine
        .analyze(&mut source, &mut detector, &log_path, None)
        .expect("analysis succeeds");
    let _ = fs::remove_file(&log_path);

    let sway = summary
        .mistakes
        .iter()
        .find(|total| total.message == "body is swaying");
    assert_eq!(sway.map(|total| total.count), Some(1));
}

#[test]
fn recorded_detections_replay_in_order() {
    let path = temp_path("detections.jsonl");
    let lines = concat!(
        r#"{"landmarks": [{"name": "nose", "x": 0.5, "y": 0.3, "visibility": 0.9}, {"name": "left_wrist", "x": 0.1, "y": 0.1, "visibility": 0.9}]}"#,
        "\n",
        r#"{"landmarks": null}"#,
        "\n",
    );
    fs::write(&path, lines).expect("write detections");

    let mut detections = RecordedDetections::open(&path).expect("open detections");
    let first = detections.detect(&0usize).expect("first line parses");
    let frame = first.expect("first frame has a detection");
    assert!(frame.get(LandmarkKind::Nose).is_some());
    // Unknown landmark names are skipped, known ones absent stay empty.
    assert!(frame.get(LandmarkKind::LeftShoulder).is_none());

    assert!(detections.detect(&1usize).expect("null parses").is_none());
    // Past the last record: no detection rather than an error.
    assert!(detections.detect(&2usize).expect("exhausted is fine").is_none());
    let _ = fs::remove_file(&path);
}

#[test]
fn malformed_detection_line_is_an_error() {
    let path = temp_path("bad_detections.jsonl");
    fs::write(&path, "not json\n").expect("write detections");

    let mut detections = RecordedDetections::open(&path).expect("open detections");
    let result: Result<Option<LandmarkFrame>> = detections.detect(&0usize);
    assert!(result.is_err());
    let _ = fs::remove_file(&path);
}
