//! Placement: optimizer assignments back to continuous element poses

pub mod resolver;

pub use resolver::{center_indices, OptimizerAssignment, Placement, PlacementResolver};
