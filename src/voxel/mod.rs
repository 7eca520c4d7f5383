//! Voxel grid: cell arena and voxelizer

pub mod builder;
pub mod grid;

pub use builder::{GridBuilder, element_footprint};
pub use grid::{Cell, CellKey, VoxelGrid};
