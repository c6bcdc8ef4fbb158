use serde_derive::{Deserialize, Serialize};

use crate::bbox::{Anchor, BBox, Ltrb};
use nalgebra as na;

/// Object classes produced by the player detection model.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum ClassId {
    Ball = 0,
    Goalkeeper = 1,
    Player = 2,
    Referee = 3,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown class id {0}")]
pub struct UnknownClass(pub u8);

impl TryFrom<u8> for ClassId {
    type Error = UnknownClass;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ClassId::Ball,
            1 => ClassId::Goalkeeper,
            2 => ClassId::Player,
            3 => ClassId::Referee,
            other => return Err(UnknownClass(other)),
        })
    }
}

impl From<ClassId> for u8 {
    fn from(c: ClassId) -> u8 {
        c as u8
    }
}

/// Contains the (xmin, ymin, xmax, ymax) box of a detected object
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    #[serde(rename = "xyxy")]
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: ClassId,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u32>,
}

impl Detection {
    pub fn new(bbox: BBox<Ltrb>, class: ClassId, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            class,
            track_id: None,
        }
    }

    #[inline]
    pub fn with_track_id(self, track_id: u32) -> Self {
        Self {
            track_id: Some(track_id),
            ..self
        }
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    /// Bottom-center of the box, where the object touches the pitch.
    #[inline(always)]
    pub fn anchor(&self) -> na::Point2<f32> {
        self.bbox.anchor(Anchor::BottomCenter)
    }

    #[inline]
    pub fn is(&self, class: ClassId) -> bool {
        self.class == class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dump_format() {
        let det: Detection =
            serde_json::from_str(r#"{"xyxy":[1.0,2.0,3.0,4.0],"p":0.9,"c":2,"t":7}"#).unwrap();

        assert_eq!(det.class, ClassId::Player);
        assert_eq!(det.track_id, Some(7));
        assert_eq!(det.bbox.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rejects_unknown_class() {
        let res: Result<Detection, _> =
            serde_json::from_str(r#"{"xyxy":[1.0,2.0,3.0,4.0],"p":0.9,"c":9}"#);

        assert!(res.is_err());
    }

    #[test]
    fn untracked_detection_serializes_without_id() {
        let det = Detection::new(BBox::ltrb(0.0, 0.0, 1.0, 1.0), ClassId::Ball, 0.5);
        let json = serde_json::to_string(&det).unwrap();

        assert!(!json.contains("\"t\""));
        assert!(json.contains("\"c\":0"));
    }
}
