//! Offline backend that replays recorded model outputs.
//!
//! A dump is a JSON-lines file with one [`ReplayFrame`] per video frame.
//! Frames are synthesised from the dump: black background with every
//! detection that has a recorded jersey colour painted in that colour, which
//! is enough for [`JerseyColorClassifier`] to separate the teams.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::detection::Detection;
use crate::detector::{KeypointDetector, ObjectDetector};
use crate::error::{BoxError, Error};
use crate::frame::Frame;
use crate::keypoint::Keypoint;
use crate::pipeline::AnalysisBackend;
use crate::projector::PitchPoint;
use crate::scene::{RadarProjection, Scene};
use crate::teams::{PlayerCrop, TeamClassifier, TeamClassifierTrainer, TeamId};
use crate::tracker::{PassthroughTracker, Tracker};
use crate::video::{self, FrameSource, SceneSink};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReplayFrame {
    pub dims: (u32, u32),
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    /// Jersey colour by track id.
    #[serde(default)]
    pub jerseys: HashMap<u32, [u8; 3]>,
}

#[derive(Debug, Clone)]
pub struct ReplayDump {
    frames: Arc<Vec<ReplayFrame>>,
}

impl ReplayDump {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|e| Error::VideoInput(format!("{}: {}", path.display(), e)))?;

        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut frames = Vec::new();

        for (no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: ReplayFrame = serde_json::from_str(&line)
                .map_err(|e| Error::VideoInput(format!("line {}: {}", no + 1, e)))?;

            frames.push(frame);
        }

        Ok(Self {
            frames: Arc::new(frames),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReplayFrame> {
        self.frames.get(index)
    }

    pub fn render(&self, index: usize) -> Option<Frame> {
        let rec = self.frames.get(index)?;
        let mut frame = Frame::blank(index, rec.dims);

        for det in &rec.detections {
            if let Some(rgb) = det.track_id.and_then(|id| rec.jerseys.get(&id)) {
                frame.fill(&det.bbox, *rgb);
            }
        }

        Some(frame)
    }

    fn frame_for(&self, frame: &Frame) -> Result<&ReplayFrame, BoxError> {
        self.get(frame.index)
            .ok_or_else(|| format!("nothing recorded for frame {}", frame.index).into())
    }
}

pub struct ReplaySource {
    dump: ReplayDump,
    next: usize,
}

impl ReplaySource {
    pub fn new(dump: ReplayDump) -> Self {
        Self { dump, next: 0 }
    }
}

impl FrameSource for ReplaySource {
    fn dims(&self) -> (u32, u32) {
        self.dump.get(0).map(|f| f.dims).unwrap_or_default()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        let frame = self.dump.render(self.next);
        if frame.is_some() {
            self.next += 1;
        }

        Ok(frame)
    }
}

/// Serves the recorded detections and keypoints of each frame.
pub struct ReplayDetector {
    dump: ReplayDump,
}

impl ReplayDetector {
    pub fn new(dump: ReplayDump) -> Self {
        Self { dump }
    }
}

impl ObjectDetector for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, BoxError> {
        Ok(self.dump.frame_for(frame)?.detections.clone())
    }
}

impl KeypointDetector for ReplayDetector {
    fn detect_keypoints(&mut self, frame: &Frame) -> Result<Vec<Keypoint>, BoxError> {
        Ok(self.dump.frame_for(frame)?.keypoints.clone())
    }
}

/// Mean colour of the central part of a crop, where the shirt usually is.
fn jersey_color(image: &ndarray::Array3<u8>) -> na::Vector3<f32> {
    let (h, w) = (image.shape()[0], image.shape()[1]);
    let (y0, y1) = (h / 4, (3 * h / 4).max(h / 4 + 1).min(h));
    let (x0, x1) = (w / 4, (3 * w / 4).max(w / 4 + 1).min(w));

    let mut sum = na::Vector3::zeros();
    let mut n = 0.0f32;

    for y in y0..y1 {
        for x in x0..x1 {
            sum += na::Vector3::new(
                image[[y, x, 0]] as f32,
                image[[y, x, 1]] as f32,
                image[[y, x, 2]] as f32,
            );
            n += 1.0;
        }
    }

    if n > 0.0 {
        sum / n
    } else {
        sum
    }
}

/// Two-cluster k-means over mean jersey colours.
#[derive(Debug, Clone, PartialEq)]
pub struct JerseyColorClassifier {
    centroids: [na::Vector3<f32>; 2],
}

impl JerseyColorClassifier {
    const ITERATIONS: usize = 10;

    pub fn fit(colors: &[na::Vector3<f32>]) -> Option<Self> {
        let first = *colors.first()?;
        let second = colors
            .iter()
            .copied()
            .max_by(|a, b| (a - first).norm().total_cmp(&(b - first).norm()))?;

        let mut model = Self {
            centroids: [first, second],
        };

        for _ in 0..Self::ITERATIONS {
            let mut sums = [na::Vector3::zeros(); 2];
            let mut counts = [0usize; 2];

            for c in colors {
                let k = model.nearest(c).index();
                sums[k] += c;
                counts[k] += 1;
            }

            let mut moved = false;
            for k in 0..2 {
                if counts[k] > 0 {
                    let next = sums[k] / counts[k] as f32;
                    moved |= next != model.centroids[k];
                    model.centroids[k] = next;
                }
            }

            if !moved {
                break;
            }
        }

        Some(model)
    }

    pub fn centroids(&self) -> &[na::Vector3<f32>; 2] {
        &self.centroids
    }

    fn nearest(&self, c: &na::Vector3<f32>) -> TeamId {
        if (c - self.centroids[1]).norm() < (c - self.centroids[0]).norm() {
            TeamId::Second
        } else {
            TeamId::First
        }
    }
}

impl TeamClassifier for JerseyColorClassifier {
    fn predict(&self, crops: &[PlayerCrop]) -> Result<Vec<TeamId>, BoxError> {
        Ok(crops
            .iter()
            .map(|c| self.nearest(&jersey_color(&c.image)))
            .collect())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JerseyColorTrainer;

impl TeamClassifierTrainer for JerseyColorTrainer {
    fn fit(&self, crops: Vec<PlayerCrop>) -> Result<Box<dyn TeamClassifier>, BoxError> {
        let colors: Vec<_> = crops.iter().map(|c| jersey_color(&c.image)).collect();
        let model = JerseyColorClassifier::fit(&colors).ok_or("no crops to cluster")?;

        tracing::debug!(crops = colors.len(), centroids = ?model.centroids, "jersey colours clustered");

        Ok(Box::new(model))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RadarMark {
    pub label: String,
    pub color: String,
    pub at: [f32; 2],
}

/// One line of the scene output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneRecord {
    /// Size of the side-by-side canvas.
    pub canvas: (u32, u32),
    pub scene: Scene,
    /// Radar positions in canvas pixels of the right half.
    pub radar: Vec<RadarMark>,
    /// Most recent valid ball positions on the radar, oldest first.
    pub ball_trail: Vec<[f32; 2]>,
}

/// Writes one [`SceneRecord`] per frame as JSON lines.
pub struct JsonSceneSink<W: Write + Send> {
    writer: W,
    radar: RadarProjection,
    canvas: (u32, u32),
    trail: usize,
}

impl<W: Write + Send> JsonSceneSink<W> {
    pub const TRAIL: usize = 25;
    pub const RADAR_PADDING: f32 = 50.0;

    pub fn new(writer: W, frame_dims: (u32, u32), pitch_dims: (f32, f32)) -> Self {
        Self {
            writer,
            radar: RadarProjection::new(pitch_dims, frame_dims, Self::RADAR_PADDING),
            canvas: video::side_by_side_dims(frame_dims),
            trail: Self::TRAIL,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn to_canvas(&self, p: na::Point2<f32>) -> [f32; 2] {
        let c = self.radar.to_canvas(p);
        [c.x, c.y]
    }
}

impl<W: Write + Send> SceneSink for JsonSceneSink<W> {
    fn emit(&mut self, _frame: &Frame, scene: &Scene, ball_path: &[PitchPoint]) -> Result<(), BoxError> {
        let radar = scene
            .radar()
            .map(|(e, p)| RadarMark {
                label: e.label.clone(),
                color: e.role.color().hex(),
                at: self.to_canvas(p),
            })
            .collect();

        let mut ball_trail: Vec<_> = ball_path
            .iter()
            .rev()
            .flatten()
            .take(self.trail)
            .map(|p| self.to_canvas(*p))
            .collect();
        ball_trail.reverse();

        let record = SceneRecord {
            canvas: self.canvas,
            scene: scene.clone(),
            radar,
            ball_trail,
        };

        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;

        Ok(())
    }

    fn finish(&mut self) -> Result<(), BoxError> {
        self.writer.flush()?;

        Ok(())
    }
}

/// Replays dumps from disk and writes `<stem>.scenes.jsonl` outputs.
pub struct ReplayBackend {
    output_dir: Option<PathBuf>,
    pitch_dims: (f32, f32),
    dumps: Mutex<HashMap<String, ReplayDump>>,
    trainer: JerseyColorTrainer,
}

impl ReplayBackend {
    pub fn new(config: &PipelineConfig, output_dir: Option<PathBuf>) -> Self {
        Self {
            output_dir,
            pitch_dims: config.pitch.dims(),
            dumps: Mutex::new(HashMap::new()),
            trainer: JerseyColorTrainer,
        }
    }

    fn dump(&self, input: &str) -> Result<ReplayDump, Error> {
        let mut dumps = self.dumps.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(dump) = dumps.get(input) {
            return Ok(dump.clone());
        }

        let dump = ReplayDump::load(Path::new(input))?;
        dumps.insert(input.to_string(), dump.clone());

        Ok(dump)
    }

    pub fn output_path(&self, input: &str) -> PathBuf {
        let input = Path::new(input);
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "replay".into());

        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        dir.join(format!("{}.scenes.jsonl", stem))
    }
}

impl AnalysisBackend for ReplayBackend {
    fn open(&self, input: &str) -> Result<Box<dyn FrameSource>, BoxError> {
        Ok(Box::new(ReplaySource::new(self.dump(input)?)))
    }

    fn probe(&self, input: &str) -> Result<(), BoxError> {
        if !Path::new(input).is_file() {
            return Err(format!("{}: no such file", input).into());
        }

        Ok(())
    }

    fn create_sink(&self, input: &str, dims: (u32, u32)) -> Result<(Box<dyn SceneSink>, String), BoxError> {
        let path = self.output_path(input);
        let file = BufWriter::new(File::create(&path)?);

        Ok((
            Box::new(JsonSceneSink::new(file, dims, self.pitch_dims)),
            path.display().to_string(),
        ))
    }

    fn object_detector(&self, input: &str) -> Result<Box<dyn ObjectDetector>, BoxError> {
        Ok(Box::new(ReplayDetector::new(self.dump(input)?)))
    }

    fn keypoint_detector(&self, input: &str) -> Result<Box<dyn KeypointDetector>, BoxError> {
        Ok(Box::new(ReplayDetector::new(self.dump(input)?)))
    }

    fn tracker(&self) -> Box<dyn Tracker> {
        Box::new(PassthroughTracker::new())
    }

    fn classifier_trainer(&self) -> &dyn TeamClassifierTrainer {
        &self.trainer
    }
}
