pub mod bbox;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod history;
pub mod homography;
pub mod job;
pub mod keypoint;
pub mod math;
pub mod pipeline;
pub mod pitch;
pub mod projector;
pub mod replay;
pub mod scene;
pub mod stabilizer;
pub mod teams;
pub mod tracker;
pub mod trajectory;
pub mod video;

pub use config::PipelineConfig;
pub use detection::{ClassId, Detection};
pub use error::Error;
pub use frame::Frame;
pub use homography::Homography;
pub use keypoint::Keypoint;
pub use pipeline::{CancellationToken, FramePipeline};
pub use scene::Scene;

use nalgebra as na;
use std::fmt;

pub trait Float:
    num_traits::FromPrimitive + na::ComplexField + Copy + fmt::Debug + PartialEq + 'static
{
}

impl<T> Float for T where
    T: num_traits::FromPrimitive + na::ComplexField + Copy + fmt::Debug + PartialEq + 'static
{
}
