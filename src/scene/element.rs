//! Virtual elements awaiting placement

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, types::{UVec3, Vec3}};
use crate::math::Pose;
use crate::placement::Placement;
use crate::voxel::element_footprint;
use super::SurfaceDim;

fn unit_footprint() -> UVec3 {
    UVec3::ONE
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    /// Bounds of the element along its local axes
    pub extent: Vec3,
    pub dimension: SurfaceDim,
    /// Visibility requirement in [0, 1]
    #[serde(default)]
    pub visibility: f32,
    /// Touch requirement in [0, 1]
    #[serde(default)]
    pub touch: f32,
    #[serde(default)]
    pub utility: f32,
    /// Live pose; rewritten by placement
    #[serde(default)]
    pub pose: Pose,
    #[serde(skip)]
    source_position: Vec3,
    #[serde(skip, default = "unit_footprint")]
    footprint: UVec3,
    #[serde(skip)]
    placement: Option<Placement>,
}

impl Element {
    pub fn new(name: impl Into<String>, extent: Vec3, dimension: SurfaceDim) -> Self {
        Self {
            name: name.into(),
            extent,
            dimension,
            visibility: 0.0,
            touch: 0.0,
            utility: 0.0,
            pose: Pose::default(),
            source_position: Vec3::ZERO,
            footprint: UVec3::ONE,
            placement: None,
        }
    }

    pub fn with_requirements(mut self, visibility: f32, touch: f32, utility: f32) -> Self {
        self.visibility = visibility;
        self.touch = touch;
        self.utility = utility;
        self
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Capture the source-session position and derive the grid footprint
    pub fn capture_source(&mut self, cell_size: Vec3, buffer: f32) {
        self.source_position = self.pose.position;
        self.footprint = element_footprint(self.extent, cell_size, buffer, self.dimension);
    }

    pub fn source_position(&self) -> Vec3 {
        self.source_position
    }

    /// Footprint in cells, valid after [`Element::capture_source`]
    pub fn footprint(&self) -> UVec3 {
        self.footprint
    }

    /// Last resolved placement
    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub(crate) fn apply_placement(&mut self, placement: Placement) {
        self.pose = placement.pose;
        self.placement = Some(placement);
    }

    pub fn validate(&self) -> Result<()> {
        for (label, v) in [
            ("visibility", self.visibility),
            ("touch", self.touch),
            ("utility", self.utility),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::Config(format!(
                    "element {}: {} {} outside [0, 1]",
                    self.name, label, v
                )));
            }
        }
        if !self.extent.is_finite() || self.extent.min_element() < 0.0 {
            return Err(Error::Config(format!(
                "element {}: extent must be finite and non-negative",
                self.name
            )));
        }
        Ok(())
    }
}
