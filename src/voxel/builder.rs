//! Voxelizer: containers to grid cells, and element footprints

use crate::core::{Error, Result, types::{UVec3, Vec3}};
use crate::math::{look_rotation, pose::{cell_count, centering_offset}};
use crate::scene::{Container, SurfaceDim};
use super::grid::{Cell, CellKey, VoxelGrid};

/// Element footprint in cells:
/// `max(round((extent + buffer) / cell), 1)` per axis, z = 1 for planar elements.
pub fn element_footprint(extent: Vec3, cell_size: Vec3, buffer: f32, dimension: SurfaceDim) -> UVec3 {
    let padded = extent + Vec3::splat(buffer);
    let z = match dimension {
        SurfaceDim::Planar => 1,
        SurfaceDim::Volumetric => cell_count(padded.z, cell_size.z),
    };
    UVec3::new(
        cell_count(padded.x, cell_size.x),
        cell_count(padded.y, cell_size.y),
        z,
    )
}

fn check_cell_size(cell_size: Vec3) -> Result<()> {
    if !cell_size.is_finite() || cell_size.min_element() <= 0.0 {
        return Err(Error::Geometry(format!(
            "cell size must be positive and finite, got {}",
            cell_size
        )));
    }
    Ok(())
}

/// Builds a [`VoxelGrid`] from containers at a fixed cell size
#[derive(Clone, Copy, Debug)]
pub struct GridBuilder {
    cell_size: Vec3,
}

impl GridBuilder {
    pub fn new(cell_size: Vec3) -> Result<Self> {
        check_cell_size(cell_size)?;
        Ok(Self { cell_size })
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    /// Cell counts for a container. Planar containers always get z = 1.
    pub fn container_dims(&self, container: &Container) -> Result<UVec3> {
        let extent = container.extent;
        let axes = if container.dimension.is_planar() { 2 } else { 3 };
        for axis in 0..axes {
            let e = extent[axis];
            if !e.is_finite() || e <= 0.0 {
                return Err(Error::Geometry(format!(
                    "container {} has degenerate extent {} on axis {}",
                    container.name, e, axis
                )));
            }
        }

        let z = match container.dimension {
            SurfaceDim::Planar => 1,
            SurfaceDim::Volumetric => cell_count(extent.z, self.cell_size.z),
        };
        Ok(UVec3::new(
            cell_count(extent.x, self.cell_size.x),
            cell_count(extent.y, self.cell_size.y),
            z,
        ))
    }

    pub fn build(&self, containers: &[Container]) -> Result<VoxelGrid> {
        let mut grid = VoxelGrid::new(self.cell_size);
        self.rebuild(&mut grid, containers)?;
        Ok(grid)
    }

    /// Discard every cell of `grid` and voxelize `containers` from scratch.
    ///
    /// On error the grid is left empty.
    pub fn rebuild(&self, grid: &mut VoxelGrid, containers: &[Container]) -> Result<()> {
        grid.reset(self.cell_size);

        let mut all_dims = Vec::with_capacity(containers.len());
        for container in containers {
            all_dims.push(self.container_dims(container)?);
        }

        for (c_idx, (container, dims)) in containers.iter().zip(all_dims).enumerate() {
            let offset = Vec3::new(
                centering_offset(dims.x),
                centering_offset(dims.y),
                centering_offset(dims.z),
            );
            let pose = &container.pose;
            let rotation = look_rotation(pose.forward(), pose.up());
            let cell_size = self.cell_size;
            let dimension = container.dimension;

            let cells = (0..dims.x).flat_map(move |x| {
                (0..dims.y).flat_map(move |y| {
                    (0..dims.z).map(move |z| {
                        let index = Vec3::new(x as f32, y as f32, z as f32);
                        let local = cell_size * (index - offset);
                        Cell {
                            key: CellKey::new(c_idx as u32, x, y, z),
                            position: pose.transform_point(local),
                            rotation,
                            dimension,
                        }
                    })
                })
            });
            grid.push_container(dims, cells);
            log::debug!("Voxelized container {} into {} cells", container.name, dims.x * dims.y * dims.z);
        }

        log::info!(
            "Grid rebuilt: {} containers, {} cells",
            grid.container_count(),
            grid.len()
        );
        Ok(())
    }
}
