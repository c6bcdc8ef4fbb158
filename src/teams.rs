use nalgebra as na;
use ndarray::Array3;
use serde_derive::{Deserialize, Serialize};

use crate::detection::{ClassId, Detection};
use crate::detector::{self, DetectorConfig, ObjectDetector};
use crate::error::{BoxError, Error};
use crate::frame::Frame;
use crate::math;
use crate::pipeline::CancellationToken;
use crate::video::FrameSource;

/// Slot of referees in the contiguous `team 0, team 1, referee` labeling:
/// the referee class id shifted down by this offset.
pub const REFEREE_LABEL_OFFSET: u8 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum TeamId {
    First = 0,
    Second = 1,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown team id {0}")]
pub struct UnknownTeam(pub u8);

impl TryFrom<u8> for TeamId {
    type Error = UnknownTeam;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TeamId::First),
            1 => Ok(TeamId::Second),
            other => Err(UnknownTeam(other)),
        }
    }
}

impl From<TeamId> for u8 {
    fn from(t: TeamId) -> u8 {
        t as u8
    }
}

impl TeamId {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Palette slot of a referee after renumbering.
#[inline]
pub fn referee_label() -> u8 {
    ClassId::Referee as u8 - REFEREE_LABEL_OFFSET
}

/// A player image handed to the team classifier, with the detection it was
/// cut from.
#[derive(Debug, Clone)]
pub struct PlayerCrop {
    pub detection: Detection,
    pub image: Array3<u8>,
}

pub fn crop_players(frame: &Frame, players: &[Detection]) -> Vec<PlayerCrop> {
    players
        .iter()
        .map(|d| PlayerCrop {
            detection: *d,
            image: frame.crop(&d.bbox),
        })
        .collect()
}

/// Fitted jersey-colour classifier.
pub trait TeamClassifier: Send {
    fn predict(&self, crops: &[PlayerCrop]) -> Result<Vec<TeamId>, BoxError>;
}

/// Fits a [`TeamClassifier`] from player crops sampled over the video.
pub trait TeamClassifierTrainer: Send + Sync {
    fn fit(&self, crops: Vec<PlayerCrop>) -> Result<Box<dyn TeamClassifier>, BoxError>;
}

/// Labels every player of the frame. The classifier must return exactly
/// one team per crop.
pub fn classify_players(
    classifier: &dyn TeamClassifier,
    frame: &Frame,
    players: &[Detection],
) -> Result<Vec<TeamId>, Error> {
    if players.is_empty() {
        return Ok(Vec::new());
    }

    let crops = crop_players(frame, players);
    let teams = classifier.predict(&crops).map_err(Error::Classifier)?;

    if teams.len() != players.len() {
        tracing::warn!(
            players = players.len(),
            labels = teams.len(),
            "team classifier returned a wrong number of labels"
        );

        return Err(Error::Classifier(
            format!("{} labels for {} players", teams.len(), players.len()).into(),
        ));
    }

    Ok(teams)
}

/// Samples every `stride`-th frame, detects players and crops them for
/// classifier training. `cancel` is checked before every frame is read.
pub fn collect_training_crops(
    source: &mut dyn FrameSource,
    detector: &mut dyn ObjectDetector,
    config: &DetectorConfig,
    stride: usize,
    cancel: &CancellationToken,
) -> Result<Vec<PlayerCrop>, Error> {
    let stride = stride.max(1);
    let mut crops = Vec::new();
    let mut n = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let frame = match source.next_frame().map_err(|e| Error::VideoInput(e.to_string()))? {
            Some(frame) => frame,
            None => break,
        };

        n += 1;
        if (n - 1) % stride != 0 {
            continue;
        }

        let raw = detector.detect(&frame).map_err(Error::DetectionBackend)?;
        let dets = detector::postprocess(&raw, config);
        let players: Vec<_> = dets
            .others
            .into_iter()
            .filter(|d| d.is(ClassId::Player))
            .collect();

        crops.extend(crop_players(&frame, &players));
    }

    tracing::debug!(frames = n, crops = crops.len(), stride, "collected classifier crops");

    Ok(crops)
}

pub fn fit_team_classifier(
    trainer: &dyn TeamClassifierTrainer,
    crops: Vec<PlayerCrop>,
) -> Result<Box<dyn TeamClassifier>, Error> {
    if crops.is_empty() {
        return Err(Error::NoTrainingCrops);
    }

    trainer.fit(crops).map_err(Error::Classifier)
}

/// Camera-space centroids of each team's player anchors. A team without
/// players this frame has no centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamCentroids {
    pub first: Option<na::Point2<f32>>,
    pub second: Option<na::Point2<f32>>,
}

impl TeamCentroids {
    pub fn from_players(players: &[Detection], teams: &[TeamId]) -> Self {
        let anchors_of = |team: TeamId| -> Vec<na::Point2<f32>> {
            players
                .iter()
                .zip(teams)
                .filter(|(_, t)| **t == team)
                .map(|(d, _)| d.anchor())
                .collect()
        };

        Self {
            first: math::centroid(&anchors_of(TeamId::First)),
            second: math::centroid(&anchors_of(TeamId::Second)),
        }
    }

    /// Team whose centroid is nearer; equal distances go to the second team.
    /// With one centroid missing the other team wins, with both missing
    /// there is nothing to decide.
    pub fn nearest(&self, p: na::Point2<f32>) -> Option<TeamId> {
        match (self.first, self.second) {
            (Some(c0), Some(c1)) => {
                if na::distance(&p, &c0) < na::distance(&p, &c1) {
                    Some(TeamId::First)
                } else {
                    Some(TeamId::Second)
                }
            }
            (Some(_), None) => Some(TeamId::First),
            (None, Some(_)) => Some(TeamId::Second),
            (None, None) => None,
        }
    }
}

/// Assigns each goalkeeper to the team whose players are closest on screen.
/// `None` entries are goalkeepers that could not be resolved this frame
/// because no players were labeled.
pub fn resolve_goalkeepers(
    players: &[Detection],
    teams: &[TeamId],
    goalkeepers: &[Detection],
) -> Vec<Option<TeamId>> {
    if goalkeepers.is_empty() {
        return Vec::new();
    }

    let centroids = TeamCentroids::from_players(players, teams);

    match (centroids.first, centroids.second) {
        (None, None) => tracing::debug!(
            goalkeepers = goalkeepers.len(),
            "no labeled players, goalkeepers left unresolved"
        ),
        (None, _) | (_, None) => tracing::warn!(
            goalkeepers = goalkeepers.len(),
            "one team has no players this frame, goalkeepers go to the other team"
        ),
        _ => {}
    }

    goalkeepers
        .iter()
        .map(|g| centroids.nearest(g.anchor()))
        .collect()
}
