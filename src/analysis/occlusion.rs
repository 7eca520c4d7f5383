//! Visibility analysis: which cells hide behind which, from the viewer's eye

use rayon::prelude::*;

use crate::core::types::Vec3;
use crate::math::{Obb, Ray};
use crate::voxel::{CellKey, VoxelGrid};

/// `occluded` lies farther along the viewer's line of sight through `near`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Occlusion {
    pub near: CellKey,
    pub occluded: CellKey,
}

/// Cast a ray from `viewer` through every cell center and record each other
/// cell the ray enters strictly beyond that center.
///
/// Cells are treated as oriented boxes of the grid's cell size. Output is
/// grouped by near cell in arena order. A cell whose center coincides with
/// the viewer casts no ray.
pub fn compute_occlusions(grid: &VoxelGrid, viewer: Vec3) -> Vec<Occlusion> {
    let cell_size = grid.cell_size();
    let solids: Vec<Obb> = grid.cells().iter().map(|c| c.solid(cell_size)).collect();
    let cells = grid.cells();

    let start = std::time::Instant::now();
    let per_cell: Vec<Vec<Occlusion>> = cells
        .par_iter()
        .enumerate()
        .map(|(i, cell)| {
            let Some((ray, distance)) = Ray::through(viewer, cell.position) else {
                return Vec::new();
            };
            solids
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .filter_map(|(j, solid)| match solid.ray_entry(&ray) {
                    Some(t) if t > distance => Some(Occlusion {
                        near: cell.key,
                        occluded: cells[j].key,
                    }),
                    _ => None,
                })
                .collect()
        })
        .collect();

    let occlusions: Vec<Occlusion> = per_cell.into_iter().flatten().collect();
    log::debug!(
        "Occlusion pass: {} relations over {} cells in {:.1}ms",
        occlusions.len(),
        cells.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    occlusions
}
