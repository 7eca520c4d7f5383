//! Physical surfaces that receive grid cells

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::math::Pose;
use super::SurfaceDim;

/// A planar or volumetric region of the environment.
///
/// `extent` is measured along the container's local axes; the pose places the
/// local origin at the region's center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub extent: Vec3,
    pub dimension: SurfaceDim,
    #[serde(default)]
    pub pose: Pose,
}

impl Container {
    pub fn new(name: impl Into<String>, extent: Vec3, dimension: SurfaceDim, pose: Pose) -> Self {
        Self {
            name: name.into(),
            extent,
            dimension,
            pose,
        }
    }
}
