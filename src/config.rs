use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::detector::DetectorConfig;
use crate::error::Error;
use crate::pitch::PitchConfiguration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection_confidence: f32,
    pub nms_iou_threshold: f32,
    pub ball_box_padding: f32,
    pub keypoint_confidence: f32,
    pub min_keypoints: usize,
    pub homography_history: usize,
    pub max_ball_jump: f32,
    pub classifier_stride: usize,
    pub workers: usize,
    pub pitch: PitchConfiguration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_confidence: 0.3,
            nms_iou_threshold: 0.5,
            ball_box_padding: 10.0,
            keypoint_confidence: 0.5,
            min_keypoints: 4,
            homography_history: 5,
            max_ball_jump: 500.0,
            classifier_stride: 30,
            workers: 2,
            pitch: PitchConfiguration::default(),
        }
    }
}

impl PipelineConfig {
    pub const ENV_PREFIX: &'static str = "PITCHRADAR";

    /// Defaults, overridden by `path` (any format the `config` crate reads,
    /// picked by extension) and then by `PITCHRADAR_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&PipelineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let cfg = builder
            .add_source(config::Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(cfg)
    }

    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            confidence_threshold: self.detection_confidence,
            iou_threshold: self.nms_iou_threshold,
            ball_padding: self.ball_box_padding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_constants() {
        let c = PipelineConfig::default();

        assert_eq!(c.detection_confidence, 0.3);
        assert_eq!(c.homography_history, 5);
        assert_eq!(c.max_ball_jump, 500.0);
        assert_eq!(c.detector().ball_padding, 10.0);
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("pitchradar-cfg-{}.json", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"max_ball_jump": 250.0, "workers": 4}}"#).unwrap();
        drop(f);

        let c = PipelineConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(c.max_ball_jump, 250.0);
        assert_eq!(c.workers, 4);
        assert_eq!(c.min_keypoints, 4);
        assert_eq!(c.pitch, PitchConfiguration::default());
    }
}
