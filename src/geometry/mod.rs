//! Geometry utilities: poses and tracking-runtime transformation matrices.

pub mod pose;
pub mod transform;

pub use pose::Pose;
pub use transform::{PoseError, TransformMatrix};
