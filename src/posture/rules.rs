//! Independent geometric checks applied to each landmark frame.
//!
//! Every rule inspects only the landmarks it needs and returns no verdict
//! when any of them is missing or below the visibility floor; a partial
//! detection never fabricates a mistake.

use super::landmarks::{LandmarkFrame, LandmarkKind};
use crate::config::PostureThresholds;

/// A posture problem detected in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mistake {
    Swaying,
    KneesTooWide,
    BentBack,
    HeadTilted,
}

impl Mistake {
    pub const ALL: [Mistake; 4] = [
        Mistake::Swaying,
        Mistake::KneesTooWide,
        Mistake::BentBack,
        Mistake::HeadTilted,
    ];

    pub fn message(self) -> &'static str {
        match self {
            Mistake::Swaying => "body is swaying",
            Mistake::KneesTooWide => "legs spread too wide",
            Mistake::BentBack => "straighten your back",
            Mistake::HeadTilted => "head is tilted sideways",
        }
    }
}

/// Gaze classification for one frame. Exactly one label is produced per
/// frame with a valid detection; `Unknown` covers insufficient visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GazeLabel {
    Forward,
    Left,
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    Unknown,
}

impl GazeLabel {
    pub const ALL: [GazeLabel; 10] = [
        GazeLabel::Forward,
        GazeLabel::Left,
        GazeLabel::Right,
        GazeLabel::Up,
        GazeLabel::Down,
        GazeLabel::UpLeft,
        GazeLabel::UpRight,
        GazeLabel::DownLeft,
        GazeLabel::DownRight,
        GazeLabel::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GazeLabel::Forward => "gaze: forward",
            GazeLabel::Left => "gaze: left",
            GazeLabel::Right => "gaze: right",
            GazeLabel::Up => "gaze: up",
            GazeLabel::Down => "gaze: down",
            GazeLabel::UpLeft => "gaze: up-left",
            GazeLabel::UpRight => "gaze: up-right",
            GazeLabel::DownLeft => "gaze: down-left",
            GazeLabel::DownRight => "gaze: down-right",
            GazeLabel::Unknown => "gaze: unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Horizontal {
    Centered,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vertical {
    Centered,
    Up,
    Down,
}

/// Shoulder and hip positions from the most recent frame where the stability
/// rule ran, tagged with that frame's index so stale references age out.
#[derive(Debug, Clone)]
pub(super) struct StabilityState {
    positions: [[f32; 2]; 4],
    frame_idx: u64,
}

/// Flag frame-to-frame torso movement. Compares the current shoulder/hip
/// quad against the previous one and reports swaying when the mean per-point
/// displacement exceeds the threshold. The reference is always overwritten
/// with the current positions, whether or not the mistake fired; a reference
/// older than the staleness window is not compared against.
pub(super) fn check_stability(
    frame: &LandmarkFrame,
    previous: &mut Option<StabilityState>,
    frame_idx: u64,
    thresholds: &PostureThresholds,
) -> Option<Mistake> {
    let quad = frame.all_visible(
        [
            LandmarkKind::LeftShoulder,
            LandmarkKind::RightShoulder,
            LandmarkKind::LeftHip,
            LandmarkKind::RightHip,
        ],
        thresholds.visibility_floor,
    )?;
    let current: [[f32; 2]; 4] = [
        [quad[0].x, quad[0].y],
        [quad[1].x, quad[1].y],
        [quad[2].x, quad[2].y],
        [quad[3].x, quad[3].y],
    ];

    let mut moved = false;
    if let Some(state) = previous.as_ref() {
        let fresh = frame_idx.saturating_sub(state.frame_idx) <= thresholds.stability_stale_frames;
        if fresh {
            let displacement: f32 = current
                .iter()
                .zip(state.positions.iter())
                .map(|(now, then)| {
                    let dx = now[0] - then[0];
                    let dy = now[1] - then[1];
                    (dx * dx + dy * dy).sqrt()
                })
                .sum::<f32>()
                / current.len() as f32;
            moved = displacement > thresholds.sway_displacement;
        }
    }

    *previous = Some(StabilityState {
        positions: current,
        frame_idx,
    });
    moved.then_some(Mistake::Swaying)
}

/// Flag knees spread wider than the configured multiple of shoulder width.
pub(super) fn check_knee_spread(
    frame: &LandmarkFrame,
    thresholds: &PostureThresholds,
) -> Option<Mistake> {
    let [left_knee, right_knee, left_shoulder, right_shoulder] = frame.all_visible(
        [
            LandmarkKind::LeftKnee,
            LandmarkKind::RightKnee,
            LandmarkKind::LeftShoulder,
            LandmarkKind::RightShoulder,
        ],
        thresholds.visibility_floor,
    )?;

    let shoulder_width = (left_shoulder.x - right_shoulder.x).abs();
    let knee_distance = (left_knee.x - right_knee.x).abs();
    (knee_distance > shoulder_width * thresholds.knee_ratio).then_some(Mistake::KneesTooWide)
}

/// Flag uneven shoulders or a torso leaning off the hip line.
pub(super) fn check_back_straightness(
    frame: &LandmarkFrame,
    thresholds: &PostureThresholds,
) -> Option<Mistake> {
    let [left_shoulder, right_shoulder, left_hip, right_hip] = frame.all_visible(
        [
            LandmarkKind::LeftShoulder,
            LandmarkKind::RightShoulder,
            LandmarkKind::LeftHip,
            LandmarkKind::RightHip,
        ],
        thresholds.visibility_floor,
    )?;

    let shoulder_level = (left_shoulder.y - right_shoulder.y).abs();
    let shoulder_mid_x = (left_shoulder.x + right_shoulder.x) / 2.0;
    let hip_mid_x = (left_hip.x + right_hip.x) / 2.0;
    let lean = (shoulder_mid_x - hip_mid_x).abs();

    (shoulder_level > thresholds.shoulder_level || lean > thresholds.body_lean)
        .then_some(Mistake::BentBack)
}

/// Flag a sideways head tilt from the vertical ear offset.
pub(super) fn check_head_tilt(
    frame: &LandmarkFrame,
    thresholds: &PostureThresholds,
) -> Option<Mistake> {
    let [left_ear, right_ear] = frame.all_visible(
        [LandmarkKind::LeftEar, LandmarkKind::RightEar],
        thresholds.visibility_floor,
    )?;

    ((left_ear.y - right_ear.y).abs() > thresholds.ear_level).then_some(Mistake::HeadTilted)
}

/// Classify the gaze direction from the nose offset against the eye
/// midpoint. The image is mirror-view: a nose left of the midpoint means the
/// candidate looks right.
pub(super) fn estimate_gaze(frame: &LandmarkFrame, thresholds: &PostureThresholds) -> GazeLabel {
    let Some([nose, left_eye, right_eye]) = frame.all_visible(
        [LandmarkKind::Nose, LandmarkKind::LeftEye, LandmarkKind::RightEye],
        thresholds.gaze_visibility_floor,
    ) else {
        return GazeLabel::Unknown;
    };

    let eye_mid_x = (left_eye.x + right_eye.x) / 2.0;
    let eye_mid_y = (left_eye.y + right_eye.y) / 2.0;

    let horizontal = if nose.x < eye_mid_x - thresholds.gaze_horizontal {
        Horizontal::Right
    } else if nose.x > eye_mid_x + thresholds.gaze_horizontal {
        Horizontal::Left
    } else {
        Horizontal::Centered
    };
    let vertical = if nose.y < eye_mid_y - thresholds.gaze_vertical {
        Vertical::Up
    } else if nose.y > eye_mid_y + thresholds.gaze_vertical {
        Vertical::Down
    } else {
        Vertical::Centered
    };

    match (vertical, horizontal) {
        (Vertical::Centered, Horizontal::Centered) => GazeLabel::Forward,
        (Vertical::Centered, Horizontal::Left) => GazeLabel::Left,
        (Vertical::Centered, Horizontal::Right) => GazeLabel::Right,
        (Vertical::Up, Horizontal::Centered) => GazeLabel::Up,
        (Vertical::Down, Horizontal::Centered) => GazeLabel::Down,
        (Vertical::Up, Horizontal::Left) => GazeLabel::UpLeft,
        (Vertical::Up, Horizontal::Right) => GazeLabel::UpRight,
        (Vertical::Down, Horizontal::Left) => GazeLabel::DownLeft,
        (Vertical::Down, Horizontal::Right) => GazeLabel::DownRight,
    }
}
