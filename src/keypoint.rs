use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// A pitch landmark as seen by the field keypoint model. `pitch_index` points
/// into the landmark table of [`crate::pitch::PitchConfiguration`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    #[serde(rename = "i")]
    pub pitch_index: usize,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "p")]
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(pitch_index: usize, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            pitch_index,
            x,
            y,
            confidence,
        }
    }

    #[inline(always)]
    pub fn pixel(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    #[inline(always)]
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }
}

/// Keypoints strictly above `threshold`; everything else counts as absent.
pub fn confident(keypoints: &[Keypoint], threshold: f32) -> impl Iterator<Item = &Keypoint> {
    keypoints.iter().filter(move |k| k.is_confident(threshold))
}
