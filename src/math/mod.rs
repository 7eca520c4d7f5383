//! Mathematical utilities and data structures

pub mod aabb;
pub mod obb;
pub mod pose;
pub mod ray;

pub use aabb::Aabb;
pub use obb::Obb;
pub use pose::{Pose, facing_pose, look_rotation};
pub use ray::Ray;
