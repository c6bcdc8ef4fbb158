use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pitchradar::bbox::BBox;
use pitchradar::detector::{KeypointDetector, ObjectDetector};
use pitchradar::error::BoxError;
use pitchradar::job::{InMemoryJobStore, JobService, JobStatus};
use pitchradar::pipeline::AnalysisBackend;
use pitchradar::pitch::PitchConfiguration;
use pitchradar::replay::{JerseyColorTrainer, ReplayBackend, ReplayFrame, SceneRecord};
use pitchradar::teams::TeamClassifierTrainer;
use pitchradar::tracker::{PassthroughTracker, Tracker};
use pitchradar::video::{FrameSource, SceneSink, VecFrameSource};
use pitchradar::{ClassId, Detection, Frame, Keypoint, PipelineConfig};

const DIMS: (u32, u32) = (1280, 720);

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pitchradar-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_dump(dir: &Path, frames: usize) -> PathBuf {
    let keypoints: Vec<_> = PitchConfiguration::default()
        .vertices()
        .iter()
        .enumerate()
        .map(|(i, v)| Keypoint::new(i, v.x / 10.0, v.y / 10.0, 1.0))
        .collect();

    let mut jerseys = HashMap::new();
    jerseys.insert(1, [220, 20, 20]);
    jerseys.insert(2, [20, 20, 220]);

    let frame = ReplayFrame {
        dims: DIMS,
        detections: vec![
            Detection::new(BBox::ltrb(595.0, 340.0, 605.0, 350.0), ClassId::Ball, 0.8),
            Detection::new(BBox::ltrb(100.0, 100.0, 140.0, 200.0), ClassId::Player, 0.95).with_track_id(1),
            Detection::new(BBox::ltrb(900.0, 100.0, 940.0, 200.0), ClassId::Player, 0.9).with_track_id(2),
        ],
        keypoints,
        jerseys,
    };

    let line = serde_json::to_string(&frame).unwrap();
    let body: Vec<_> = (0..frames).map(|_| line.as_str()).collect();

    let path = dir.join("match.jsonl");
    std::fs::write(&path, body.join("\n")).unwrap();
    path
}

#[tokio::test]
async fn nonexistent_input_fails_immediately() {
    let config = PipelineConfig::default();
    let backend = Arc::new(ReplayBackend::new(&config, None));
    let service = JobService::new(config, backend);

    let id = service.submit("/definitely/not/here.jsonl");
    let rec = service.poll(id).unwrap();

    assert_eq!(rec.status, JobStatus::Error);
    assert!(rec.error.is_some());
    assert_eq!(rec.output, None);

    let rec = service.wait(id).await.unwrap();
    assert_eq!(rec.status, JobStatus::Error);
}

#[tokio::test]
async fn replayed_video_produces_one_scene_per_frame() {
    let dir = scratch("replay");
    let input = write_dump(&dir, 10);

    let config = PipelineConfig::default();
    let backend = Arc::new(ReplayBackend::new(&config, Some(dir.clone())));
    let service = JobService::new(config, backend);

    let id = service.submit(&input.display().to_string());
    let rec = service.wait(id).await.unwrap();
    assert_eq!(rec.status, JobStatus::Done, "{:?}", rec.error);

    let output = rec.output.expect("output reference");
    let body = std::fs::read_to_string(&output).unwrap();
    let records: Vec<SceneRecord> = body.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

    assert_eq!(records.len(), 10);
    for r in &records {
        assert!(r.scene.projected);
        assert_eq!(r.scene.len(), 3);
    }

    let teams: Vec<_> = records[0].scene.entities.iter().filter_map(|e| e.role.team()).collect();
    assert_eq!(teams.len(), 2);
    assert_ne!(teams[0], teams[1]);
    assert_eq!(records[9].ball_trail.len(), 10);

    assert_eq!(service.list().len(), 1);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn unknown_job_is_an_error() {
    let config = PipelineConfig::default();
    let backend = Arc::new(ReplayBackend::new(&config, None));
    let service = JobService::new(config, backend);

    assert!(service.poll(pitchradar::job::JobId::new()).is_err());
    assert!(service.cancel(pitchradar::job::JobId::new()).is_err());
}

/// Backend whose object detector is down, or crashes while loading.
struct Unavailable {
    trainer: JerseyColorTrainer,
    crash: bool,
}

struct Down;

impl ObjectDetector for Down {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, BoxError> {
        Err("inference endpoint timed out".into())
    }
}

impl KeypointDetector for Down {
    fn detect_keypoints(&mut self, _frame: &Frame) -> Result<Vec<Keypoint>, BoxError> {
        Err("inference endpoint timed out".into())
    }
}

impl AnalysisBackend for Unavailable {
    fn open(&self, _input: &str) -> Result<Box<dyn FrameSource>, BoxError> {
        Ok(Box::new(VecFrameSource::new(DIMS, vec![Frame::blank(0, DIMS), Frame::blank(1, DIMS)])))
    }

    fn create_sink(&self, _input: &str, _dims: (u32, u32)) -> Result<(Box<dyn SceneSink>, String), BoxError> {
        Err("no sink expected".into())
    }

    fn object_detector(&self, _input: &str) -> Result<Box<dyn ObjectDetector>, BoxError> {
        if self.crash {
            panic!("detector weights corrupted");
        }

        Ok(Box::new(Down))
    }

    fn keypoint_detector(&self, _input: &str) -> Result<Box<dyn KeypointDetector>, BoxError> {
        Ok(Box::new(Down))
    }

    fn tracker(&self) -> Box<dyn Tracker> {
        Box::new(PassthroughTracker::new())
    }

    fn classifier_trainer(&self) -> &dyn TeamClassifierTrainer {
        &self.trainer
    }
}

#[tokio::test]
async fn backend_failure_marks_only_that_job_failed() {
    let dir = scratch("failure");
    let input = write_dump(&dir, 2);

    let config = PipelineConfig::default();
    let failing = JobService::new(config.clone(), Arc::new(Unavailable {
        trainer: JerseyColorTrainer,
        crash: false,
    }));
    let working = JobService::new(config.clone(), Arc::new(ReplayBackend::new(&config, Some(dir.clone()))));

    let bad = failing.submit("anything");
    let good = working.submit(&input.display().to_string());

    let bad = failing.wait(bad).await.unwrap();
    assert_eq!(bad.status, JobStatus::Error);
    assert!(bad.error.unwrap().contains("timed out"));
    assert_eq!(bad.output, None);

    assert_eq!(working.wait(good).await.unwrap().status, JobStatus::Done);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn worker_panic_is_reported_as_such() {
    let config = PipelineConfig::default();
    let service = JobService::new(
        config,
        Arc::new(Unavailable {
            trainer: JerseyColorTrainer,
            crash: true,
        }),
    );

    let id = service.submit("anything");
    let rec = service.wait(id).await.unwrap();

    assert_eq!(rec.status, JobStatus::Error);
    let msg = rec.error.unwrap();
    assert!(msg.contains("worker panicked"), "{}", msg);
    assert!(!msg.contains("detection backend"), "{}", msg);
}

#[test]
fn submit_works_outside_the_runtime() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = scratch("handle");
    let input = write_dump(&dir, 3);

    let config = PipelineConfig::default();
    let backend = Arc::new(ReplayBackend::new(&config, Some(dir.clone())));
    let service = JobService::with_runtime(
        config,
        backend,
        Arc::new(InMemoryJobStore::new()),
        rt.handle().clone(),
    );

    let id = service.submit(&input.display().to_string());
    let rec = rt.block_on(service.wait(id)).unwrap();

    assert_eq!(rec.status, JobStatus::Done, "{:?}", rec.error);
    std::fs::remove_dir_all(&dir).ok();
}
