//! Arplace - spatial reasoning engine for adaptive placement of virtual elements
//!
//! Containers are voxelized into grid cells, annotated with occlusion and
//! obstruction from the viewer's point of view, sent to an external optimizer,
//! and its discrete assignments are resolved back into element poses.

pub mod core;
pub mod math;
pub mod scene;
pub mod voxel;
pub mod analysis;
pub mod placement;
pub mod session;
