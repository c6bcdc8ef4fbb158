use thiserror::Error;

use crate::job::JobId;

/// Error type returned by external collaborators (models, trackers, writers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("insufficient keypoints: need {needed}, got {got}")]
    InsufficientKeypoints { needed: usize, got: usize },

    #[error("homography fit failed: {0}")]
    Homography(String),

    #[error("detection backend failure: {0}")]
    DetectionBackend(#[source] BoxError),

    #[error("team classifier failure: {0}")]
    Classifier(#[source] BoxError),

    #[error("no player crops collected for team classifier training")]
    NoTrainingCrops,

    #[error("video input error: {0}")]
    VideoInput(String),

    #[error("scene sink failure: {0}")]
    Sink(#[source] BoxError),

    #[error("job was cancelled")]
    Cancelled,

    #[error("analysis worker panicked: {0}")]
    WorkerPanic(String),

    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("Config Error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}
