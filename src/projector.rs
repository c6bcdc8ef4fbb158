use nalgebra as na;

use crate::detection::Detection;
use crate::homography::Homography;

/// Position on the canonical pitch, `None` when it could not be projected.
pub type PitchPoint = Option<na::Point2<f32>>;

/// Projects camera-space anchors onto the pitch. Without a transform every
/// anchor comes back absent; the output always has one entry per anchor.
pub fn project_points(transform: Option<&Homography>, anchors: &[na::Point2<f32>]) -> Vec<PitchPoint> {
    match transform {
        Some(h) => anchors.iter().map(|&p| h.project(p)).collect(),
        None => vec![None; anchors.len()],
    }
}

/// Bottom-center anchors of `detections`, projected.
pub fn project_detections(transform: Option<&Homography>, detections: &[Detection]) -> Vec<PitchPoint> {
    let anchors: Vec<_> = detections.iter().map(Detection::anchor).collect();

    project_points(transform, &anchors)
}
