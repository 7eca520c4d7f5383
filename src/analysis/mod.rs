//! Per-cell annotations derived from the grid before each optimizer request

pub mod obstruction;
pub mod occlusion;

pub use obstruction::{ObstructionSet, compute_obstructions};
pub use occlusion::{Occlusion, compute_occlusions};
