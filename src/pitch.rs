//! Canonical soccer pitch in centimetres, origin at the top-left corner flag,
//! `x` along the touchline and `y` along the goal line.

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Pairs of 1-based landmark numbers joined by a painted line.
pub const EDGES: [(usize, usize); 33] = [
    (1, 2),
    (2, 3),
    (3, 4),
    (4, 5),
    (5, 6),
    (7, 8),
    (10, 11),
    (11, 12),
    (12, 13),
    (14, 15),
    (15, 16),
    (16, 17),
    (18, 19),
    (19, 20),
    (20, 21),
    (23, 24),
    (25, 26),
    (26, 27),
    (27, 28),
    (28, 29),
    (29, 30),
    (1, 14),
    (2, 10),
    (3, 7),
    (4, 8),
    (5, 13),
    (6, 17),
    (14, 25),
    (18, 26),
    (23, 27),
    (24, 28),
    (21, 29),
    (17, 30),
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PitchConfiguration {
    pub width: f32,
    pub length: f32,
    pub penalty_box_width: f32,
    pub penalty_box_length: f32,
    pub goal_box_width: f32,
    pub goal_box_length: f32,
    pub centre_circle_radius: f32,
    pub penalty_spot_distance: f32,
}

impl Default for PitchConfiguration {
    fn default() -> Self {
        Self {
            width: 7000.0,
            length: 12000.0,
            penalty_box_width: 4100.0,
            penalty_box_length: 2015.0,
            goal_box_width: 1832.0,
            goal_box_length: 550.0,
            centre_circle_radius: 915.0,
            penalty_spot_distance: 1100.0,
        }
    }
}

impl PitchConfiguration {
    /// Number of landmarks the keypoint model is trained on.
    pub const NUM_LANDMARKS: usize = 32;

    /// `(length, width)`
    #[inline]
    pub fn dims(&self) -> (f32, f32) {
        (self.length, self.width)
    }

    /// Landmark table indexed by keypoint `pitch_index`.
    pub fn vertices(&self) -> Vec<na::Point2<f32>> {
        let (l, w) = (self.length, self.width);
        let pbw = self.penalty_box_width;
        let pbl = self.penalty_box_length;
        let gbw = self.goal_box_width;
        let gbl = self.goal_box_length;
        let ccr = self.centre_circle_radius;
        let psd = self.penalty_spot_distance;

        [
            (0.0, 0.0),
            (0.0, (w - pbw) / 2.0),
            (0.0, (w - gbw) / 2.0),
            (0.0, (w + gbw) / 2.0),
            (0.0, (w + pbw) / 2.0),
            (0.0, w),
            (gbl, (w - gbw) / 2.0),
            (gbl, (w + gbw) / 2.0),
            (psd, w / 2.0),
            (pbl, (w - pbw) / 2.0),
            (pbl, (w - gbw) / 2.0),
            (pbl, (w + gbw) / 2.0),
            (pbl, (w + pbw) / 2.0),
            (l / 2.0, 0.0),
            (l / 2.0, w / 2.0 - ccr),
            (l / 2.0, w / 2.0 + ccr),
            (l / 2.0, w),
            (l - pbl, (w - pbw) / 2.0),
            (l - pbl, (w - gbw) / 2.0),
            (l - pbl, (w + gbw) / 2.0),
            (l - pbl, (w + pbw) / 2.0),
            (l - psd, w / 2.0),
            (l - gbl, (w - gbw) / 2.0),
            (l - gbl, (w + gbw) / 2.0),
            (l, 0.0),
            (l, (w - pbw) / 2.0),
            (l, (w - gbw) / 2.0),
            (l, (w + gbw) / 2.0),
            (l, (w + pbw) / 2.0),
            (l, w),
            (l / 2.0 - ccr, w / 2.0),
            (l / 2.0 + ccr, w / 2.0),
        ]
        .iter()
        .map(|&(x, y)| na::Point2::new(x, y))
        .collect()
    }

    /// Painted line segments as pairs of pitch points.
    pub fn lines(&self) -> Vec<(na::Point2<f32>, na::Point2<f32>)> {
        let v = self.vertices();

        EDGES
            .iter()
            .map(|&(a, b)| (v[a - 1], v[b - 1]))
            .collect()
    }
}
