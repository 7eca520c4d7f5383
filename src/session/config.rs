//! Session configuration (JSON)

use std::path::Path;

use serde::{Deserialize, Serialize};

use arplace_link::{OptimizerParams, DEFAULT_ADDR, DEFAULT_EVENT_CAPACITY};

use crate::core::{Error, Result, types::Vec3};

/// Tunables for one placement session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Grid cell extent per axis, meters
    pub cell_size: [f32; 3],
    /// Padding added to element extents before footprint sizing
    pub buffer: f32,
    /// Weights and thresholds forwarded as SET_PARAMS
    pub params: OptimizerParams,
    pub optimizer_addr: String,
    /// Capacity of the pending-completion queue
    pub event_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cell_size: [0.1; 3],
            buffer: 0.0,
            params: OptimizerParams::default(),
            optimizer_addr: DEFAULT_ADDR.to_string(),
            event_queue_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn cell_size(&self) -> Vec3 {
        Vec3::from_array(self.cell_size)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cell_size.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(Error::Config(format!(
                "cell_size must be positive, got {:?}",
                self.cell_size
            )));
        }
        if !self.buffer.is_finite() || self.buffer < 0.0 {
            return Err(Error::Config(format!("buffer must be non-negative, got {}", self.buffer)));
        }
        if self.event_queue_capacity == 0 {
            return Err(Error::Config("event_queue_capacity must be at least 1".into()));
        }
        if self.optimizer_addr.is_empty() {
            return Err(Error::Config("optimizer_addr is empty".into()));
        }
        Ok(())
    }
}
