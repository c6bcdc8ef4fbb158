//! Render-ready description of one processed frame: what to draw over the
//! camera image and where to put it on the radar.

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::detection::Detection;
use crate::projector::PitchPoint;
use crate::teams::{self, TeamId};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b])
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

/// Team 0, team 1, referee.
pub const PALETTE: [Color; 3] = [
    Color::rgb(0x00, 0xBF, 0xFF),
    Color::rgb(0xFF, 0x14, 0x93),
    Color::rgb(0xFF, 0xD7, 0x00),
];
pub const BALL_COLOR: Color = Color::rgb(0xFF, 0xFF, 0xFF);
pub const UNRESOLVED_COLOR: Color = Color::rgb(0xC0, 0xC0, 0xC0);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    Player { team: TeamId },
    Goalkeeper { team: Option<TeamId> },
    Referee,
    Ball,
}

impl Role {
    /// Index into [`PALETTE`]; the ball and unresolved goalkeepers have none.
    pub fn palette_slot(&self) -> Option<u8> {
        match self {
            Role::Player { team } => Some(*team as u8),
            Role::Goalkeeper { team } => team.map(|t| t as u8),
            Role::Referee => Some(teams::referee_label()),
            Role::Ball => None,
        }
    }

    pub fn color(&self) -> Color {
        match (self, self.palette_slot()) {
            (Role::Ball, _) => BALL_COLOR,
            (_, Some(slot)) => PALETTE[slot as usize],
            (_, None) => UNRESOLVED_COLOR,
        }
    }

    #[inline]
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Role::Player { team } => Some(*team),
            Role::Goalkeeper { team } => *team,
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneEntity {
    pub role: Role,
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u32>,
    /// Position on the radar; absent when the frame had no transform.
    pub pitch: PitchPoint,
    pub label: String,
}

impl SceneEntity {
    pub fn new(role: Role, det: &Detection, pitch: PitchPoint) -> Self {
        Self {
            role,
            bbox: det.bbox,
            confidence: det.confidence,
            track_id: det.track_id,
            pitch,
            label: det.track_id.map(|id| format!("#{}", id)).unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scene {
    pub frame_index: usize,
    /// `(width, height)` of the camera frame
    pub dims: (u32, u32),
    /// Whether a camera-to-pitch transform was available this frame.
    pub projected: bool,
    /// Players, goalkeepers, referees, then the ball.
    pub entities: Vec<SceneEntity>,
}

impl Scene {
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn ball(&self) -> Option<&SceneEntity> {
        self.entities.iter().find(|e| e.role == Role::Ball)
    }

    /// Entities that have a radar position.
    pub fn radar(&self) -> impl Iterator<Item = (&SceneEntity, na::Point2<f32>)> {
        self.entities
            .iter()
            .filter_map(|e| e.pitch.map(|p| (e, p)))
    }
}

/// Builds a [`Scene`] from the per-role outputs of one frame. Parts are
/// merged in a fixed order regardless of the order they are supplied in.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    frame_index: usize,
    dims: (u32, u32),
    projected: bool,
    players: Vec<SceneEntity>,
    goalkeepers: Vec<SceneEntity>,
    referees: Vec<SceneEntity>,
    ball: Option<SceneEntity>,
}

impl SceneBuilder {
    pub fn new(frame_index: usize, dims: (u32, u32), projected: bool) -> Self {
        Self {
            frame_index,
            dims,
            projected,
            ..Default::default()
        }
    }

    pub fn players(mut self, dets: &[Detection], teams: &[TeamId], pitch: &[PitchPoint]) -> Self {
        self.players = dets
            .iter()
            .zip(teams)
            .zip(pitch)
            .map(|((d, &team), &p)| SceneEntity::new(Role::Player { team }, d, p))
            .collect();
        self
    }

    pub fn goalkeepers(mut self, dets: &[Detection], teams: &[Option<TeamId>], pitch: &[PitchPoint]) -> Self {
        self.goalkeepers = dets
            .iter()
            .zip(teams)
            .zip(pitch)
            .map(|((d, &team), &p)| SceneEntity::new(Role::Goalkeeper { team }, d, p))
            .collect();
        self
    }

    pub fn referees(mut self, dets: &[Detection], pitch: &[PitchPoint]) -> Self {
        self.referees = dets
            .iter()
            .zip(pitch)
            .map(|(d, &p)| SceneEntity::new(Role::Referee, d, p))
            .collect();
        self
    }

    pub fn ball(mut self, det: Option<&Detection>, pitch: PitchPoint) -> Self {
        self.ball = det.map(|d| SceneEntity::new(Role::Ball, d, pitch));
        self
    }

    pub fn build(self) -> Scene {
        let mut entities = self.players;
        entities.extend(self.goalkeepers);
        entities.extend(self.referees);
        entities.extend(self.ball);

        Scene {
            frame_index: self.frame_index,
            dims: self.dims,
            projected: self.projected,
            entities,
        }
    }
}

/// Maps pitch units onto a radar canvas of `canvas` pixels with `padding`
/// pixels of margin on every side.
#[derive(Debug, Clone, Copy)]
pub struct RadarProjection {
    pitch: (f32, f32),
    canvas: (u32, u32),
    padding: f32,
}

impl RadarProjection {
    pub fn new(pitch_dims: (f32, f32), canvas: (u32, u32), padding: f32) -> Self {
        Self {
            pitch: pitch_dims,
            canvas,
            padding,
        }
    }

    pub fn to_canvas(&self, p: na::Point2<f32>) -> na::Point2<f32> {
        let w = (self.canvas.0 as f32 - 2.0 * self.padding).max(1.0);
        let h = (self.canvas.1 as f32 - 2.0 * self.padding).max(1.0);

        na::Point2::new(
            self.padding + p.x / self.pitch.0 * w,
            self.padding + p.y / self.pitch.1 * h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ClassId;

    fn det(x: f32, class: ClassId, id: Option<u32>) -> Detection {
        let d = Detection::new(BBox::ltrb(x, 0.0, x + 10.0, 20.0), class, 0.9);
        match id {
            Some(id) => d.with_track_id(id),
            None => d,
        }
    }

    #[test]
    fn merge_order_and_labels() {
        let p = Some(na::Point2::new(1.0, 1.0));

        let scene = SceneBuilder::new(3, (100, 50), true)
            .ball(Some(&det(0.0, ClassId::Ball, None)), p)
            .referees(&[det(10.0, ClassId::Referee, Some(9))], &[p])
            .players(
                &[det(20.0, ClassId::Player, Some(1)), det(30.0, ClassId::Player, Some(2))],
                &[TeamId::First, TeamId::Second],
                &[p, None],
            )
            .goalkeepers(&[det(40.0, ClassId::Goalkeeper, Some(5))], &[Some(TeamId::Second)], &[p])
            .build();

        let labels: Vec<_> = scene.entities.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["#1", "#2", "#5", "#9", ""]);
        assert_eq!(scene.ball().map(|b| b.role), Some(Role::Ball));
        assert_eq!(scene.radar().count(), 4);
        assert_eq!(scene.frame_index, 3);
    }

    #[test]
    fn palette_slots() {
        assert_eq!(Role::Player { team: TeamId::First }.palette_slot(), Some(0));
        assert_eq!(Role::Goalkeeper { team: Some(TeamId::Second) }.palette_slot(), Some(1));
        assert_eq!(Role::Referee.palette_slot(), Some(2));
        assert_eq!(Role::Referee.color().hex(), "#FFD700");
        assert_eq!(Role::Goalkeeper { team: None }.color(), UNRESOLVED_COLOR);
        assert_eq!(Role::Ball.color(), BALL_COLOR);
    }

    #[test]
    fn radar_corners() {
        let r = RadarProjection::new((12000.0, 7000.0), (1220, 720), 10.0);

        assert_eq!(r.to_canvas(na::Point2::new(0.0, 0.0)), na::Point2::new(10.0, 10.0));
        assert_eq!(r.to_canvas(na::Point2::new(12000.0, 7000.0)), na::Point2::new(1210.0, 710.0));
    }

    #[test]
    fn serializes_roles_with_kind_tag() {
        let json = serde_json::to_string(&Role::Player { team: TeamId::Second }).unwrap();
        assert_eq!(json, r#"{"kind":"player","team":1}"#);
    }
}
