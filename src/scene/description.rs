//! JSON scene files: environments, elements and the viewer's starting pose

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::math::Pose;
use super::{Element, Environment, EnvironmentLibrary};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub viewer: Pose,
    #[serde(default)]
    pub environments: Vec<Environment>,
    /// Environment to activate; the first one when absent
    #[serde(default)]
    pub active_environment: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl SceneDescription {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let scene: Self = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn validate(&self) -> Result<()> {
        for env in &self.environments {
            env.validate()?;
        }
        for element in &self.elements {
            element.validate()?;
        }
        Ok(())
    }

    /// Split into a library with the chosen environment active, plus the
    /// viewer pose and elements
    pub fn into_parts(self) -> Result<(EnvironmentLibrary, Pose, Vec<Element>)> {
        let active = self
            .active_environment
            .clone()
            .or_else(|| self.environments.first().map(|e| e.name.clone()));
        let mut library = EnvironmentLibrary::new(self.environments);
        if let Some(name) = active {
            library.activate(&name)?;
        }
        Ok((library, self.viewer, self.elements))
    }
}
