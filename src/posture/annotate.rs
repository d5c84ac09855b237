//! OpenCV-backed frame I/O and annotation for the posture engine.

use super::engine::{FrameSink, FrameSource};
use super::landmarks::{Landmark, LandmarkFrame, LandmarkKind};
use super::rules::{GazeLabel, Mistake};
use crate::config::FALLBACK_FPS;
use anyhow::{bail, Result};
use opencv::core::{Mat, Point, Scalar, Size};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, VideoWriter};
use opencv::imgproc;
use std::path::Path;

/// Torso and head edges drawn over annotated frames.
const SKELETON_EDGES: [(LandmarkKind, LandmarkKind); 10] = [
    (LandmarkKind::LeftEar, LandmarkKind::LeftEye),
    (LandmarkKind::LeftEye, LandmarkKind::Nose),
    (LandmarkKind::Nose, LandmarkKind::RightEye),
    (LandmarkKind::RightEye, LandmarkKind::RightEar),
    (LandmarkKind::LeftShoulder, LandmarkKind::RightShoulder),
    (LandmarkKind::LeftShoulder, LandmarkKind::LeftHip),
    (LandmarkKind::RightShoulder, LandmarkKind::RightHip),
    (LandmarkKind::LeftHip, LandmarkKind::RightHip),
    (LandmarkKind::LeftHip, LandmarkKind::LeftKnee),
    (LandmarkKind::RightHip, LandmarkKind::RightKnee),
];

/// Frame supply backed by a video file.
pub struct VideoFileSource {
    capture: VideoCapture,
    fps: f64,
    width: i32,
    height: i32,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let mut capture = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            bail!("cannot open video {}", path.display());
        }
        let mut fps = capture.get(videoio::CAP_PROP_FPS)?;
        if !fps.is_finite() || fps <= 0.0 {
            fps = FALLBACK_FPS;
        }
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        Ok(Self {
            capture,
            fps,
            width,
            height,
        })
    }

    pub fn frame_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }
}

impl FrameSource for VideoFileSource {
    type Frame = Mat;

    fn fps(&self) -> f64 {
        self.fps
    }

    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self.capture.read(&mut frame)?;
        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// MP4 sink that writes annotated copies of analyzed frames.
pub struct AnnotatedVideoSink {
    writer: VideoWriter,
    width: i32,
    height: i32,
}

impl AnnotatedVideoSink {
    pub fn create(path: &Path, fps: f64, (width, height): (i32, i32)) -> Result<Self> {
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            fps,
            Size::new(width, height),
            true,
        )?;
        if !writer.is_opened()? {
            bail!("cannot open video sink {}", path.display());
        }
        Ok(Self {
            writer,
            width,
            height,
        })
    }

    fn to_pixel(&self, landmark: Landmark) -> Point {
        Point::new(
            (landmark.x * self.width as f32) as i32,
            (landmark.y * self.height as f32) as i32,
        )
    }
}

impl FrameSink<Mat> for AnnotatedVideoSink {
    fn write_raw(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame)?;
        Ok(())
    }

    fn write_annotated(
        &mut self,
        frame: &Mat,
        landmarks: &LandmarkFrame,
        mistakes: &[Mistake],
        gaze: GazeLabel,
    ) -> Result<()> {
        let mut overlay = frame.try_clone()?;

        for (from, to) in SKELETON_EDGES {
            if let (Some(a), Some(b)) = (landmarks.get(from), landmarks.get(to)) {
                imgproc::line(
                    &mut overlay,
                    self.to_pixel(a),
                    self.to_pixel(b),
                    Scalar::new(0.0, 255.0, 0.0, 0.0),
                    2,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }
        for (_, landmark) in landmarks.iter() {
            imgproc::circle(
                &mut overlay,
                self.to_pixel(landmark),
                3,
                Scalar::new(0.0, 200.0, 255.0, 0.0),
                -1,
                imgproc::LINE_8,
                0,
            )?;
        }

        let mut y = 30;
        for mistake in mistakes {
            imgproc::put_text(
                &mut overlay,
                mistake.message(),
                Point::new(20, y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.8,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                2,
                imgproc::LINE_8,
                false,
            )?;
            y += 30;
        }
        imgproc::put_text(
            &mut overlay,
            gaze.label(),
            Point::new(20, self.height - 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.8,
            Scalar::new(255.0, 100.0, 0.0, 0.0),
            2,
            imgproc::LINE_8,
            false,
        )?;

        self.writer.write(&overlay)?;
        Ok(())
    }
}
