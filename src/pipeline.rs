use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::detection::{ClassId, Detection};
use crate::detector::{self, DetectorConfig, KeypointDetector, ObjectDetector};
use crate::error::{BoxError, Error};
use crate::frame::Frame;
use crate::homography::{Homography, HomographyEstimator};
use crate::keypoint::Keypoint;
use crate::projector;
use crate::scene::{Scene, SceneBuilder};
use crate::stabilizer::HomographyStabilizer;
use crate::teams::{self, TeamClassifier, TeamClassifierTrainer};
use crate::tracker::Tracker;
use crate::trajectory::BallTrajectory;
use crate::video::{FrameSource, SceneSink};

/// Cooperative cancellation flag, checked once per frame.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// External capabilities one job runs against. None of them is shared with
/// another job.
pub struct Collaborators {
    pub object_detector: Box<dyn ObjectDetector>,
    pub keypoint_detector: Box<dyn KeypointDetector>,
    pub tracker: Box<dyn Tracker>,
    pub classifier: Box<dyn TeamClassifier>,
}

/// Per-job state: everything that carries over from one frame to the next.
pub struct FramePipeline {
    detector_config: DetectorConfig,
    estimator: HomographyEstimator,
    stabilizer: HomographyStabilizer,
    trajectory: BallTrajectory,
    parts: Collaborators,
}

impl FramePipeline {
    pub fn new(config: &PipelineConfig, mut parts: Collaborators) -> Self {
        parts.tracker.reset();

        Self {
            detector_config: config.detector(),
            estimator: HomographyEstimator::new(&config.pitch, config.keypoint_confidence, config.min_keypoints),
            stabilizer: HomographyStabilizer::new(config.homography_history),
            trajectory: BallTrajectory::new(config.max_ball_jump),
            parts,
        }
    }

    #[inline]
    pub fn trajectory(&self) -> &BallTrajectory {
        &self.trajectory
    }

    #[inline]
    pub fn stabilizer(&self) -> &HomographyStabilizer {
        &self.stabilizer
    }

    /// Runs both models on `frame` and composes its scene.
    pub fn process(&mut self, frame: &Frame) -> Result<Scene, Error> {
        let raw = self
            .parts
            .object_detector
            .detect(frame)
            .map_err(Error::DetectionBackend)?;
        let keypoints = self
            .parts
            .keypoint_detector
            .detect_keypoints(frame)
            .map_err(Error::DetectionBackend)?;

        self.process_detections(frame, &raw, &keypoints)
    }

    /// Composes the scene of `frame` from already computed model outputs.
    pub fn process_detections(
        &mut self,
        frame: &Frame,
        raw: &[Detection],
        keypoints: &[Keypoint],
    ) -> Result<Scene, Error> {
        let dets = detector::postprocess(raw, &self.detector_config);
        let tracked = self
            .parts
            .tracker
            .track(&dets.others)
            .map_err(Error::DetectionBackend)?;

        let of_class = |class: ClassId| -> Vec<Detection> {
            tracked.iter().filter(|d| d.is(class)).copied().collect()
        };
        let players = of_class(ClassId::Player);
        let goalkeepers = of_class(ClassId::Goalkeeper);
        let referees = of_class(ClassId::Referee);

        let transform = self.effective_transform(frame.index, keypoints);
        let h = transform.as_ref();

        let player_teams = teams::classify_players(self.parts.classifier.as_ref(), frame, &players)?;
        let goalkeeper_teams = teams::resolve_goalkeepers(&players, &player_teams, &goalkeepers);

        let ball = dets.best_ball();
        let ball_pitch = ball.and_then(|b| h.and_then(|h| h.project(b.anchor())));
        let ball_cleaned = self.trajectory.push(ball_pitch);

        if ball_pitch.is_some() && ball_cleaned.is_none() {
            tracing::debug!(frame = frame.index, "ball jump rejected");
        }

        Ok(SceneBuilder::new(frame.index, frame.dims(), transform.is_some())
            .players(&players, &player_teams, &projector::project_detections(h, &players))
            .goalkeepers(
                &goalkeepers,
                &goalkeeper_teams,
                &projector::project_detections(h, &goalkeepers),
            )
            .referees(&referees, &projector::project_detections(h, &referees))
            .ball(ball, ball_cleaned)
            .build())
    }

    fn effective_transform(&mut self, frame: usize, keypoints: &[Keypoint]) -> Option<Homography> {
        let estimate = match self.estimator.estimate(keypoints) {
            Ok(h) => {
                tracing::debug!(frame, keypoints = keypoints.len(), "homography estimated");
                Some(h)
            }
            Err(Error::InsufficientKeypoints { needed, got }) => {
                tracing::debug!(frame, needed, got, "not enough keypoints, no projection");
                None
            }
            Err(err) => {
                tracing::warn!(frame, %err, "homography fit failed, no projection");
                None
            }
        };

        self.stabilizer.update(estimate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub frames: usize,
    pub projected_frames: usize,
}

/// Reads the first frame, failing when the video has none.
pub fn read_first_frame(source: &mut dyn FrameSource) -> Result<Frame, Error> {
    let frame = source
        .next_frame()
        .map_err(|e| Error::VideoInput(e.to_string()))?
        .ok_or_else(|| Error::VideoInput("cannot read first frame".into()))?;

    if frame.is_empty() {
        return Err(Error::VideoInput("first frame is empty".into()));
    }

    Ok(frame)
}

/// Processes `source` frame by frame into `sink`. The pipeline is only built
/// once the first frame was read, so unreadable input allocates nothing.
pub fn run_video<B>(
    source: &mut dyn FrameSource,
    sink: &mut dyn SceneSink,
    cancel: &CancellationToken,
    build: B,
) -> Result<RunSummary, Error>
where
    B: FnOnce((u32, u32)) -> Result<FramePipeline, Error>,
{
    let first = read_first_frame(source)?;
    let mut pipeline = build(first.dims())?;
    let mut summary = RunSummary::default();
    let mut next = Some(first);

    while let Some(frame) = next {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let scene = pipeline.process(&frame)?;
        sink.emit(&frame, &scene, pipeline.trajectory().cleaned())
            .map_err(Error::Sink)?;

        summary.frames += 1;
        if scene.projected {
            summary.projected_frames += 1;
        }

        next = source
            .next_frame()
            .map_err(|e| Error::VideoInput(e.to_string()))?;
    }

    sink.finish().map_err(Error::Sink)?;

    Ok(summary)
}

/// Everything a video analysis job needs from the outside world.
pub trait AnalysisBackend: Send + Sync {
    fn open(&self, input: &str) -> Result<Box<dyn FrameSource>, BoxError>;

    /// Cheap existence check run when a job is submitted.
    fn probe(&self, input: &str) -> Result<(), BoxError> {
        self.open(input).map(|_| ())
    }

    /// Output writer for `input` and the reference the output is reachable by.
    fn create_sink(&self, input: &str, dims: (u32, u32)) -> Result<(Box<dyn SceneSink>, String), BoxError>;

    fn object_detector(&self, input: &str) -> Result<Box<dyn ObjectDetector>, BoxError>;

    fn keypoint_detector(&self, input: &str) -> Result<Box<dyn KeypointDetector>, BoxError>;

    fn tracker(&self) -> Box<dyn Tracker>;

    fn classifier_trainer(&self) -> &dyn TeamClassifierTrainer;
}

/// Full job: classifier training pass, then frame processing. Returns the
/// output reference once the sink has finished.
pub fn analyze(
    backend: &dyn AnalysisBackend,
    input: &str,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<String, Error> {
    let open = |input: &str| backend.open(input).map_err(|e| Error::VideoInput(e.to_string()));

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let dims = read_first_frame(open(input)?.as_mut())?.dims();

    let mut detector = backend.object_detector(input).map_err(Error::DetectionBackend)?;
    let crops = teams::collect_training_crops(
        open(input)?.as_mut(),
        detector.as_mut(),
        &config.detector(),
        config.classifier_stride,
        cancel,
    )?;
    let classifier = teams::fit_team_classifier(backend.classifier_trainer(), crops)?;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let (mut sink, output) = backend.create_sink(input, dims).map_err(Error::Sink)?;
    let keypoint_detector = backend.keypoint_detector(input).map_err(Error::DetectionBackend)?;
    let tracker = backend.tracker();

    let summary = run_video(open(input)?.as_mut(), sink.as_mut(), cancel, move |_| {
        Ok(FramePipeline::new(
            config,
            Collaborators {
                object_detector: detector,
                keypoint_detector,
                tracker,
                classifier,
            },
        ))
    })?;

    tracing::info!(
        input,
        frames = summary.frames,
        projected = summary.projected_frames,
        "video analysed"
    );

    Ok(output)
}
