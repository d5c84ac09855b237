//! Pose landmark types shared by the posture and gaze rules.

/// Named anatomical points consumed by the rules. The external detector may
/// report more; anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LandmarkKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
}

impl LandmarkKind {
    pub const COUNT: usize = 11;

    pub const ALL: [LandmarkKind; Self::COUNT] = [
        LandmarkKind::Nose,
        LandmarkKind::LeftEye,
        LandmarkKind::RightEye,
        LandmarkKind::LeftEar,
        LandmarkKind::RightEar,
        LandmarkKind::LeftShoulder,
        LandmarkKind::RightShoulder,
        LandmarkKind::LeftHip,
        LandmarkKind::RightHip,
        LandmarkKind::LeftKnee,
        LandmarkKind::RightKnee,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            LandmarkKind::Nose => 0,
            LandmarkKind::LeftEye => 1,
            LandmarkKind::RightEye => 2,
            LandmarkKind::LeftEar => 3,
            LandmarkKind::RightEar => 4,
            LandmarkKind::LeftShoulder => 5,
            LandmarkKind::RightShoulder => 6,
            LandmarkKind::LeftHip => 7,
            LandmarkKind::RightHip => 8,
            LandmarkKind::LeftKnee => 9,
            LandmarkKind::RightKnee => 10,
        }
    }

    /// Stable snake_case name used in detection streams.
    pub fn name(self) -> &'static str {
        match self {
            LandmarkKind::Nose => "nose",
            LandmarkKind::LeftEye => "left_eye",
            LandmarkKind::RightEye => "right_eye",
            LandmarkKind::LeftEar => "left_ear",
            LandmarkKind::RightEar => "right_ear",
            LandmarkKind::LeftShoulder => "left_shoulder",
            LandmarkKind::RightShoulder => "right_shoulder",
            LandmarkKind::LeftHip => "left_hip",
            LandmarkKind::RightHip => "right_hip",
            LandmarkKind::LeftKnee => "left_knee",
            LandmarkKind::RightKnee => "right_knee",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

/// One detected point: position normalized to frame dimensions plus the
/// detector's visibility confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub visibility: f32,
}

/// The landmarks detected in one video frame. A frame with no entry for a
/// kind simply did not detect that point.
#[derive(Debug, Clone, Default)]
pub struct LandmarkFrame {
    points: [Option<Landmark>; LandmarkKind::COUNT],
}

impl LandmarkFrame {
    pub fn set(&mut self, kind: LandmarkKind, landmark: Landmark) {
        self.points[kind.index()] = Some(landmark);
    }

    pub fn get(&self, kind: LandmarkKind) -> Option<Landmark> {
        self.points[kind.index()]
    }

    /// The landmark, only if its visibility clears the floor.
    pub fn visible(&self, kind: LandmarkKind, floor: f32) -> Option<Landmark> {
        self.get(kind).filter(|lm| lm.visibility > floor)
    }

    /// All requested landmarks at once, or None if any is missing or below
    /// the floor. Rules use this so a partial detection skips the whole rule.
    pub fn all_visible<const N: usize>(
        &self,
        kinds: [LandmarkKind; N],
        floor: f32,
    ) -> Option<[Landmark; N]> {
        let mut out = [Landmark {
            x: 0.0,
            y: 0.0,
            visibility: 0.0,
        }; N];
        for (slot, kind) in out.iter_mut().zip(kinds) {
            *slot = self.visible(kind, floor)?;
        }
        Some(out)
    }

    /// Iterate over the points present in this frame.
    pub fn iter(&self) -> impl Iterator<Item = (LandmarkKind, Landmark)> + '_ {
        LandmarkKind::ALL
            .iter()
            .filter_map(|&kind| self.get(kind).map(|lm| (kind, lm)))
    }
}
