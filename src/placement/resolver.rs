//! Placement resolver
//!
//! An assignment names the anchor cell of an element's footprint. The pose is
//! the average over the footprint's center cells: one per odd axis, two per
//! even axis, so 1, 2, 4 or 8 cells in total.

use std::ops::RangeInclusive;

use crate::core::{Error, Result, types::{IVec3, UVec3, Vec3}};
use crate::math::{look_rotation, Pose};
use crate::scene::{Element, SurfaceDim};
use crate::voxel::VoxelGrid;

/// Anchor cell chosen for one element, by index in the sent element list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizerAssignment {
    pub element: usize,
    pub container: usize,
    pub index: IVec3,
}

impl TryFrom<arplace_link::Assignment> for OptimizerAssignment {
    type Error = Error;

    fn try_from(a: arplace_link::Assignment) -> Result<Self> {
        let element = usize::try_from(a.element)
            .map_err(|_| Error::Placement(format!("negative element id {}", a.element)))?;
        let container = usize::try_from(a.container)
            .map_err(|_| Error::Placement(format!("negative container index {}", a.container)))?;
        Ok(Self {
            element,
            container,
            index: IVec3::from_array(a.index),
        })
    }
}

/// Resolved pose for one element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub element: usize,
    pub pose: Pose,
    /// Planar placement; the element lies flat against its surface
    pub snap: bool,
    pub dimension: SurfaceDim,
}

/// Center-cell indices along one axis for a footprint of `size` anchored at `anchor`
pub fn center_indices(anchor: i32, size: u32) -> RangeInclusive<i32> {
    let half = (size / 2) as i32;
    if size % 2 == 0 {
        anchor + half - 1..=anchor + half
    } else {
        anchor + half..=anchor + half
    }
}

pub struct PlacementResolver<'a> {
    grid: &'a VoxelGrid,
    viewer: Vec3,
}

impl<'a> PlacementResolver<'a> {
    pub fn new(grid: &'a VoxelGrid, viewer: Vec3) -> Self {
        Self { grid, viewer }
    }

    /// Resolve a single footprint at an anchor
    pub fn resolve_footprint(&self, element: usize, footprint: UVec3, container: usize, anchor: IVec3) -> Result<Placement> {
        if container >= self.grid.container_count() {
            return Err(Error::Placement(format!(
                "element {} assigned to unknown container {}",
                element, container
            )));
        }

        let mut position = Vec3::ZERO;
        let mut forward = Vec3::ZERO;
        let mut up = Vec3::ZERO;
        let mut dimension = 0.0f32;
        let mut count = 0u32;

        for x in center_indices(anchor.x, footprint.x) {
            for y in center_indices(anchor.y, footprint.y) {
                for z in center_indices(anchor.z, footprint.z) {
                    let index = IVec3::new(x, y, z);
                    let cell = self.grid.cell_at(container, index).ok_or_else(|| {
                        Error::Placement(format!(
                            "element {}: center cell {} outside container {}",
                            element, index, container
                        ))
                    })?;
                    position += cell.position;
                    forward += cell.forward();
                    up += cell.up();
                    dimension += cell.dimension.as_i32() as f32;
                    count += 1;
                }
            }
        }

        let n = count as f32;
        position /= n;
        forward /= n;
        up /= n;
        let rounded = (dimension / n).round_ties_even() as i32;
        let dimension = SurfaceDim::try_from(rounded).map_err(|_| {
            Error::Placement(format!("element {}: center cells average to dimension {}", element, rounded))
        })?;

        let forward = match dimension {
            SurfaceDim::Planar => forward,
            // Volumetric placements face the viewer
            SurfaceDim::Volumetric => {
                let toward = (position - self.viewer).normalize_or_zero();
                if toward == Vec3::ZERO { forward } else { toward }
            }
        };

        Ok(Placement {
            element,
            pose: Pose::new(position, look_rotation(forward, up)),
            snap: dimension.is_planar(),
            dimension,
        })
    }

    /// Resolve every assignment against `elements`, matching by index.
    pub fn resolve(&self, elements: &[Element], assignments: &[OptimizerAssignment]) -> Result<Vec<Placement>> {
        assignments
            .iter()
            .map(|a| {
                let element = elements.get(a.element).ok_or_else(|| {
                    Error::Placement(format!(
                        "unknown element id {} ({} elements sent)",
                        a.element,
                        elements.len()
                    ))
                })?;
                self.resolve_footprint(a.element, element.footprint(), a.container, a.index)
            })
            .collect()
    }

    /// Resolve and write poses. Nothing is written unless every assignment resolves.
    pub fn apply(&self, elements: &mut [Element], assignments: &[OptimizerAssignment]) -> Result<Vec<Placement>> {
        let placements = self.resolve(elements, assignments)?;
        for placement in &placements {
            elements[placement.element].apply_placement(*placement);
            log::debug!(
                "Placed {} at {} (snap: {})",
                elements[placement.element].name,
                placement.pose.position,
                placement.snap
            );
        }
        Ok(placements)
    }
}
