use crate::detection::Detection;
use crate::error::BoxError;

/// Multi-object tracker assigning persistent ids across frames. One instance
/// belongs to one job and is reset when the job starts.
pub trait Tracker: Send {
    fn reset(&mut self);

    /// Returns the tracked subset of `detections` with `track_id` filled in.
    fn track(&mut self, detections: &[Detection]) -> Result<Vec<Detection>, BoxError>;
}

/// Keeps whatever ids the detections already carry. Used when detections
/// come from a dump that was tracked upstream.
#[derive(Debug, Default, Clone)]
pub struct PassthroughTracker {
    frames: usize,
}

impl PassthroughTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn frames_seen(&self) -> usize {
        self.frames
    }
}

impl Tracker for PassthroughTracker {
    fn reset(&mut self) {
        self.frames = 0;
    }

    fn track(&mut self, detections: &[Detection]) -> Result<Vec<Detection>, BoxError> {
        self.frames += 1;

        Ok(detections.to_vec())
    }
}
