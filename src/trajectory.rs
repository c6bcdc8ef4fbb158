use nalgebra as na;

use crate::projector::PitchPoint;

/// Breaks a trajectory at physically implausible jumps. A point farther than
/// `max_jump` from the last accepted point is flagged absent and the last
/// accepted point stays where it was. Absent points stay absent, and the
/// first present point is always accepted. Output length equals input length.
pub fn clean_trajectory(points: &[PitchPoint], max_jump: f32) -> Vec<PitchPoint> {
    let mut filter = JumpFilter::new(max_jump);

    points.iter().map(|&p| filter.accept(p)).collect()
}

/// Incremental form of [`clean_trajectory`]. The scan is prefix-stable, so
/// keeping only the last accepted point gives the same result.
#[derive(Debug, Clone)]
pub struct JumpFilter {
    max_jump: f32,
    last_valid: Option<na::Point2<f32>>,
}

impl JumpFilter {
    pub fn new(max_jump: f32) -> Self {
        Self {
            max_jump,
            last_valid: None,
        }
    }

    #[inline]
    pub fn last_valid(&self) -> Option<na::Point2<f32>> {
        self.last_valid
    }

    pub fn accept(&mut self, point: PitchPoint) -> PitchPoint {
        let p = point?;

        if let Some(last) = self.last_valid {
            if na::distance(&last, &p) > self.max_jump {
                return None;
            }
        }

        self.last_valid = Some(p);
        Some(p)
    }
}

/// Per-frame ball positions on the pitch for a whole video. Append-only: one
/// raw entry per processed frame and its cleaned counterpart.
#[derive(Debug, Clone)]
pub struct BallTrajectory {
    raw: Vec<PitchPoint>,
    cleaned: Vec<PitchPoint>,
    filter: JumpFilter,
}

impl BallTrajectory {
    pub const DEFAULT_MAX_JUMP: f32 = 500.0;

    pub fn new(max_jump: f32) -> Self {
        Self {
            raw: Vec::new(),
            cleaned: Vec::new(),
            filter: JumpFilter::new(max_jump),
        }
    }

    /// Records this frame's position and returns its cleaned value.
    pub fn push(&mut self, point: PitchPoint) -> PitchPoint {
        let cleaned = self.filter.accept(point);

        self.raw.push(point);
        self.cleaned.push(cleaned);

        cleaned
    }

    #[inline]
    pub fn raw(&self) -> &[PitchPoint] {
        &self.raw
    }

    #[inline]
    pub fn cleaned(&self) -> &[PitchPoint] {
        &self.cleaned
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Accepted points only, in frame order.
    pub fn valid_path(&self) -> impl Iterator<Item = na::Point2<f32>> + '_ {
        self.cleaned.iter().flatten().copied()
    }
}

impl Default for BallTrajectory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_JUMP)
    }
}
