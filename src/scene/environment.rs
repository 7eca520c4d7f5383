//! Environments and the library that activates one at a time

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use super::{Container, PhysicalObject};

/// Containers and objects of one physical space
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub objects: Vec<PhysicalObject>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for object in &self.objects {
            object.validate()?;
        }
        Ok(())
    }
}

/// Named environments, at most one active
#[derive(Clone, Debug, Default)]
pub struct EnvironmentLibrary {
    environments: Vec<Environment>,
    active: Option<usize>,
}

impl EnvironmentLibrary {
    pub fn new(environments: Vec<Environment>) -> Self {
        Self {
            environments,
            active: None,
        }
    }

    /// Activate the named environment, deactivating any other
    pub fn activate(&mut self, name: &str) -> Result<&Environment> {
        let index = self
            .environments
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| Error::Config(format!("unknown environment {:?}", name)))?;
        self.active = Some(index);
        log::info!("Activated environment {}", name);
        Ok(&self.environments[index])
    }

    /// Deactivate every environment
    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&Environment> {
        self.active.map(|i| &self.environments[i])
    }
}
