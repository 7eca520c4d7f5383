//! Obstruction detection: cells whose center sits inside a physical object

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::math::Aabb;
use crate::scene::PhysicalObject;
use crate::voxel::{CellKey, VoxelGrid};

/// Cells blocked by at least one physical object, in key order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObstructionSet {
    cells: BTreeSet<CellKey>,
}

impl ObstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellKey> {
        self.cells.iter()
    }

    /// Merge another set into this one
    pub fn union_with(&mut self, other: &ObstructionSet) {
        self.cells.extend(other.cells.iter().copied());
    }
}

impl FromIterator<CellKey> for ObstructionSet {
    fn from_iter<I: IntoIterator<Item = CellKey>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Pure containment: a cell is obstructed when its center lies inside some
/// object's bounding volume at its captured position (boundary inclusive).
pub fn compute_obstructions(grid: &VoxelGrid, objects: &[PhysicalObject]) -> ObstructionSet {
    let volumes: Vec<Aabb> = objects.iter().map(PhysicalObject::world_bounds).collect();
    let blocked: Vec<CellKey> = grid
        .cells()
        .par_iter()
        .filter(|cell| volumes.iter().any(|v| v.contains_point(cell.position)))
        .map(|cell| cell.key)
        .collect();

    log::debug!("Obstruction pass: {} of {} cells blocked", blocked.len(), grid.len());
    blocked.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::math::Pose;
    use crate::scene::{Container, SurfaceDim};
    use crate::voxel::GridBuilder;

    fn desk_grid() -> VoxelGrid {
        // 4 x 2 cells of 0.5m centered at (0, 1, 0): x in {-0.75, -0.25, 0.25, 0.75}
        let desk = Container::new(
            "desk",
            Vec3::new(2.0, 1.0, 0.0),
            SurfaceDim::Planar,
            Pose::new(Vec3::new(0.0, 1.0, 0.0), Default::default()),
        );
        GridBuilder::new(Vec3::splat(0.5)).unwrap().build(&[desk]).unwrap()
    }

    /// Object centered in the world box `min..max`
    fn object(name: &str, min: Vec3, max: Vec3) -> PhysicalObject {
        let local = Aabb::from_center_half_extent(Vec3::ZERO, (max - min) * 0.5);
        PhysicalObject::new(name, 0.5, (min + max) * 0.5, local)
    }

    #[test]
    fn test_center_containment() {
        let grid = desk_grid();
        let lamp = object("lamp", Vec3::new(0.5, 0.0, -0.5), Vec3::new(1.0, 2.0, 0.5));
        let set = compute_obstructions(&grid, &[lamp]);

        assert_eq!(set.len(), 2);
        assert!(set.contains(&CellKey::new(0, 3, 0, 0)));
        assert!(set.contains(&CellKey::new(0, 3, 1, 0)));
    }

    #[test]
    fn test_overlap_without_center_is_clear() {
        let grid = desk_grid();
        // Covers part of the x = 0.75 cells but not their centers
        let book = object("book", Vec3::new(0.9, 0.0, -0.5), Vec3::new(1.2, 2.0, 0.5));
        assert!(compute_obstructions(&grid, &[book]).is_empty());
    }

    #[test]
    fn test_overlapping_objects_counted_once() {
        let grid = desk_grid();
        let a = object("a", Vec3::new(-1.0, 0.0, -0.5), Vec3::new(0.0, 2.0, 0.5));
        let b = object("b", Vec3::new(-0.5, 0.0, -0.5), Vec3::new(0.5, 2.0, 0.5));
        let set = compute_obstructions(&grid, &[a, b]);
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_idempotent() {
        let grid = desk_grid();
        let objects = [object("lamp", Vec3::new(0.0, 0.0, -0.5), Vec3::new(1.0, 2.0, 0.5))];
        let first = compute_obstructions(&grid, &objects);
        let second = compute_obstructions(&grid, &objects);
        assert_eq!(first, second);

        let mut merged = first.clone();
        merged.union_with(&second);
        assert_eq!(merged, first);
    }
}
