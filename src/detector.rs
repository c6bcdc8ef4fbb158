use crate::detection::{ClassId, Detection};
use crate::error::BoxError;
use crate::frame::Frame;
use crate::keypoint::Keypoint;

/// Player/ball/referee detection model.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, BoxError>;
}

/// Pitch landmark model. Returns the fixed-size landmark list; landmarks
/// that were not found carry zero confidence.
pub trait KeypointDetector: Send {
    fn detect_keypoints(&mut self, frame: &Frame) -> Result<Vec<Keypoint>, BoxError>;
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub ball_padding: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            iou_threshold: 0.5,
            ball_padding: 10.0,
        }
    }
}

/// Raw model output split into the ball and everything that goes to the
/// tracker.
#[derive(Debug, Clone, Default)]
pub struct FrameDetections {
    pub ball: Vec<Detection>,
    pub others: Vec<Detection>,
}

impl FrameDetections {
    /// Most confident ball candidate.
    pub fn best_ball(&self) -> Option<&Detection> {
        self.ball
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// Drops weak detections, pads ball boxes and runs class-agnostic NMS over
/// the non-ball detections. Returns new detections; the input is untouched.
pub fn postprocess(detections: &[Detection], config: &DetectorConfig) -> FrameDetections {
    let mut ball = Vec::new();
    let mut others = Vec::new();

    for det in detections
        .iter()
        .filter(|d| d.confidence >= config.confidence_threshold)
    {
        if det.is(ClassId::Ball) {
            ball.push(Detection {
                bbox: det.bbox.pad(config.ball_padding),
                ..*det
            });
        } else {
            others.push(*det);
        }
    }

    FrameDetections {
        ball,
        others: non_maximum_supression(others, config.iou_threshold),
    }
}

/// Greedy NMS: keeps the most confident box of every cluster overlapping by
/// more than `iou_threshold`. Result is ordered by descending confidence.
pub fn non_maximum_supression(mut dets: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if dets.len() < 2 {
        return dets;
    }

    dets.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep = vec![true; dets.len()];
    for idx in 0..dets.len() - 1 {
        if !keep[idx] {
            continue;
        }

        for other in idx + 1..dets.len() {
            if keep[other] && dets[idx].iou(&dets[other]) > iou_threshold {
                keep[other] = false;
            }
        }
    }

    dets.into_iter()
        .zip(keep)
        .filter_map(|(d, k)| if k { Some(d) } else { None })
        .collect()
}
