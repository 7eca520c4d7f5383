//! Physical objects already present in the environment

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, types::Vec3};
use crate::math::Aabb;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalObject {
    pub name: String,
    #[serde(default)]
    pub utility: f32,
    /// Live position
    pub position: Vec3,
    /// Bounding volume relative to `position`, used for obstruction tests
    pub bounds: Aabb,
    /// Position captured with the target session
    #[serde(skip)]
    captured_position: Vec3,
}

impl PhysicalObject {
    pub fn new(name: impl Into<String>, utility: f32, position: Vec3, bounds: Aabb) -> Self {
        Self {
            name: name.into(),
            utility,
            position,
            bounds,
            captured_position: position,
        }
    }

    /// Record the live position for the next optimizer request
    pub fn capture(&mut self) {
        self.captured_position = self.position;
    }

    pub fn captured_position(&self) -> Vec3 {
        self.captured_position
    }

    /// World-space bounds at the captured position
    pub fn world_bounds(&self) -> Aabb {
        self.bounds.translated(self.captured_position)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.utility) {
            return Err(Error::Config(format!(
                "object {}: utility {} outside [0, 1]",
                self.name, self.utility
            )));
        }
        if !self.bounds.is_valid() {
            return Err(Error::Config(format!("object {}: invalid bounds", self.name)));
        }
        Ok(())
    }
}
