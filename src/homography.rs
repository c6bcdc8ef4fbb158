//! Camera-to-pitch homography estimation via DLT with Hartley normalization.

use nalgebra::{self as na, DMatrix, Matrix3, Vector3};
use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::keypoint::{self, Keypoint};
use crate::pitch::PitchConfiguration;

/// Projective transform from camera pixels to pitch units, normalized so
/// that `h[(2, 2)] == 1`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(transparent)]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Maps a pixel through the transform. Points on the horizon line
    /// (`w == 0`) have no image and yield `None`.
    pub fn project(&self, p: na::Point2<f32>) -> Option<na::Point2<f32>> {
        let v = self.0 * Vector3::new(p.x as f64, p.y as f64, 1.0);
        if v[2].abs() < 1e-12 {
            return None;
        }

        let (x, y) = (v[0] / v[2], v[1] / v[2]);
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        Some(na::Point2::new(x as f32, y as f32))
    }

    pub fn reprojection_error(&self, src: na::Point2<f32>, dst: na::Point2<f32>) -> f32 {
        match self.project(src) {
            Some(p) => na::distance(&p, &dst),
            None => f32::INFINITY,
        }
    }
}

pub struct HomographyEstimator {
    landmarks: Vec<na::Point2<f32>>,
    confidence_threshold: f32,
    min_points: usize,
}

impl HomographyEstimator {
    pub fn new(pitch: &PitchConfiguration, confidence_threshold: f32, min_points: usize) -> Self {
        Self {
            landmarks: pitch.vertices(),
            confidence_threshold,
            // fewer than 4 correspondences leave the projective fit underdetermined
            min_points: min_points.max(4),
        }
    }

    #[inline]
    pub fn landmarks(&self) -> &[na::Point2<f32>] {
        &self.landmarks
    }

    /// Fits a transform from every confident keypoint that has a landmark.
    pub fn estimate(&self, keypoints: &[Keypoint]) -> Result<Homography, Error> {
        let mut src = Vec::with_capacity(keypoints.len());
        let mut dst = Vec::with_capacity(keypoints.len());

        for kp in keypoint::confident(keypoints, self.confidence_threshold) {
            match self.landmarks.get(kp.pitch_index) {
                Some(target) => {
                    src.push([kp.x as f64, kp.y as f64]);
                    dst.push([target.x as f64, target.y as f64]);
                }
                None => tracing::warn!(
                    pitch_index = kp.pitch_index,
                    landmarks = self.landmarks.len(),
                    "keypoint outside of the landmark table"
                ),
            }
        }

        if src.len() < self.min_points {
            return Err(Error::InsufficientKeypoints {
                needed: self.min_points,
                got: src.len(),
            });
        }

        fit_dlt(&src, &dst).map(Homography)
    }
}

/// Translates the centroid to the origin and scales the mean distance from
/// it to sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();

    (t, normalized)
}

/// Least-squares homography `dst ≈ H * src` from at least 4 correspondences.
pub fn fit_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Matrix3<f64>, Error> {
    let n = src.len();
    if n != dst.len() {
        return Err(Error::Homography(format!(
            "{} source points for {} targets",
            n,
            dst.len()
        )));
    }
    if n < 4 {
        return Err(Error::InsufficientKeypoints { needed: 4, got: n });
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // null vector of A is the eigenvector of A^T A with the smallest eigenvalue
    let ata = a.transpose() * &a;
    let eig = na::SymmetricEigen::new(ata);

    let min_idx = (0..9)
        .min_by(|&i, &j| {
            eig.eigenvalues[i]
                .abs()
                .total_cmp(&eig.eigenvalues[j].abs())
        })
        .unwrap_or(0);

    let h_norm = Matrix3::from_fn(|r, c| eig.eigenvectors[(r * 3 + c, min_idx)]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| Error::Homography("target normalization is singular".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        return Err(Error::Homography("degenerate transform".into()));
    }

    let h = h / scale;
    if !h.iter().all(|v| v.is_finite()) || h.determinant().abs() < 1e-15 {
        return Err(Error::Homography("degenerate transform".into()));
    }

    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Homography {
        // pitch -> camera perspective, inverted to get camera -> pitch
        let to_camera = Matrix3::new(0.08, 0.02, 100.0, -0.005, 0.09, 80.0, 0.000001, 0.00003, 1.0);
        let inv = to_camera.try_inverse().unwrap();
        Homography(inv / inv[(2, 2)])
    }

    fn keypoints_for(pitch: &PitchConfiguration, indices: &[usize]) -> Vec<Keypoint> {
        let inv = camera().0.try_inverse().unwrap();
        let v = pitch.vertices();

        (0..v.len())
            .map(|i| {
                let p = Homography(inv).project(v[i]).unwrap();
                let conf = if indices.contains(&i) { 0.9 } else { 0.1 };
                Keypoint::new(i, p.x, p.y, conf)
            })
            .collect()
    }

    #[test]
    fn fit_maps_keypoints_onto_landmarks() {
        let pitch = PitchConfiguration::default();
        let est = HomographyEstimator::new(&pitch, 0.5, 4);
        let kps = keypoints_for(&pitch, &[0, 5, 13, 16, 24, 29]);

        let h = est.estimate(&kps).unwrap();
        for kp in kps.iter().filter(|k| k.confidence > 0.5) {
            let err = h.reprojection_error(kp.pixel(), est.landmarks()[kp.pitch_index]);
            assert!(err < 1.0, "reprojection error {}", err);
        }
    }

    #[test]
    fn exactly_four_points_is_enough() {
        let pitch = PitchConfiguration::default();
        let est = HomographyEstimator::new(&pitch, 0.5, 4);
        let kps = keypoints_for(&pitch, &[9, 12, 17, 20]);

        let h = est.estimate(&kps).unwrap();
        let target = est.landmarks()[21];
        assert!(h.reprojection_error(kps[21].pixel(), target) < 1.0);
    }

    #[test]
    fn three_points_are_rejected() {
        let pitch = PitchConfiguration::default();
        let est = HomographyEstimator::new(&pitch, 0.5, 4);
        let kps = keypoints_for(&pitch, &[0, 5, 13]);

        match est.estimate(&kps) {
            Err(Error::InsufficientKeypoints { needed: 4, got: 3 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_landmarks_do_not_count() {
        let pitch = PitchConfiguration::default();
        let est = HomographyEstimator::new(&pitch, 0.5, 4);
        let mut kps = keypoints_for(&pitch, &[0, 5, 13]);
        kps.push(Keypoint::new(40, 10.0, 10.0, 1.0));

        assert!(matches!(
            est.estimate(&kps),
            Err(Error::InsufficientKeypoints { got: 3, .. })
        ));
    }

    #[test]
    fn normalized_scale() {
        let src = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let dst = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
        let h = fit_dlt(&src, &dst).unwrap();

        assert!((h[(2, 2)] - 1.0).abs() < 1e-12);
        assert!((h[(0, 0)] - 2.0).abs() < 1e-9);
    }
}
