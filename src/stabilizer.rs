use crate::history::History;
use crate::homography::Homography;
use crate::math;

/// Rolling mean over the last few per-frame homographies. Damps the jitter
/// that keypoints flickering around the confidence threshold put into
/// independent per-frame fits.
#[derive(Debug, Clone)]
pub struct HomographyStabilizer {
    history: History<Homography>,
}

impl HomographyStabilizer {
    pub const DEFAULT_CAPACITY: usize = 5;

    pub fn new(capacity: usize) -> Self {
        Self {
            history: History::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Feeds this frame's estimate and returns the frame's effective
    /// transform. A frame without an estimate has no effective transform and
    /// leaves the history untouched.
    pub fn update(&mut self, estimate: Option<Homography>) -> Option<Homography> {
        let h = estimate?;
        self.history.push(h);

        self.current()
    }

    /// Element-wise mean of the matrices currently held.
    pub fn current(&self) -> Option<Homography> {
        math::mean_matrix(self.history.iter().map(|h| h.matrix())).map(Homography)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.history.capacity()
    }
}

impl Default for HomographyStabilizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    fn scaled(s: f64) -> Homography {
        Homography(Matrix3::new(s, 0.0, 0.0, 0.0, s, 0.0, 0.0, 0.0, 1.0))
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut st = HomographyStabilizer::default();

        for i in 0..12 {
            st.update(Some(scaled(i as f64)));
            assert!(st.len() <= 5);
        }
        assert_eq!(st.len(), 5);
    }

    #[test]
    fn mean_of_last_five() {
        let mut st = HomographyStabilizer::default();

        let mut out = None;
        for s in [100.0, 1.0, 2.0, 3.0, 4.0, 5.0] {
            out = st.update(Some(scaled(s)));
        }

        let m = out.unwrap();
        assert!((m.0[(0, 0)] - 3.0).abs() < 1e-12);
        assert!((m.0[(1, 1)] - 3.0).abs() < 1e-12);
        assert_eq!(m.0[(2, 2)], 1.0);
    }

    #[test]
    fn missing_estimate_has_no_transform() {
        let mut st = HomographyStabilizer::default();
        st.update(Some(scaled(2.0)));

        assert_eq!(st.update(None), None);
        assert_eq!(st.len(), 1);
        assert_eq!(st.current(), Some(scaled(2.0)));
    }
}
