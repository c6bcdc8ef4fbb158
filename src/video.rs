use crate::error::BoxError;
use crate::frame::Frame;
use crate::projector::PitchPoint;
use crate::scene::Scene;

/// Sequential access to decoded frames of one video.
pub trait FrameSource: Send {
    /// `(width, height)` of every frame.
    fn dims(&self) -> (u32, u32);

    /// Next frame, `Ok(None)` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, BoxError>;
}

/// Receives composed scenes in frame order, e.g. a renderer that draws the
/// camera overlay and the radar side by side and encodes the result.
pub trait SceneSink: Send {
    /// `ball_path` is the cleaned ball trajectory up to and including this
    /// frame.
    fn emit(&mut self, frame: &Frame, scene: &Scene, ball_path: &[PitchPoint]) -> Result<(), BoxError>;

    /// Flushes the output. Only a finished sink counts as complete output.
    fn finish(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Output canvas of the side-by-side render: camera view on the left, radar
/// scaled to the same size on the right.
#[inline]
pub fn side_by_side_dims(frame_dims: (u32, u32)) -> (u32, u32) {
    (frame_dims.0 * 2, frame_dims.1)
}

/// In-memory source, mostly for tests and replays.
pub struct VecFrameSource {
    dims: (u32, u32),
    frames: std::vec::IntoIter<Frame>,
}

impl VecFrameSource {
    pub fn new(dims: (u32, u32), frames: Vec<Frame>) -> Self {
        Self {
            dims,
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for VecFrameSource {
    fn dims(&self) -> (u32, u32) {
        self.dims
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        Ok(self.frames.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_is_twice_as_wide() {
        assert_eq!(side_by_side_dims((1920, 1080)), (3840, 1080));
    }

    #[test]
    fn vec_source_drains_in_order() {
        let mut src = VecFrameSource::new((4, 4), vec![Frame::blank(0, (4, 4)), Frame::blank(1, (4, 4))]);

        assert_eq!(src.next_frame().unwrap().map(|f| f.index), Some(0));
        assert_eq!(src.next_frame().unwrap().map(|f| f.index), Some(1));
        assert!(src.next_frame().unwrap().is_none());
    }
}
